//! portfolio-chat CLI 진입점

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // RUST_LOG도 .env에서 올 수 있으므로 로깅보다 먼저 읽는다
    let dotenv = portfolio_chat::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match dotenv {
        Ok(Some(path)) => tracing::debug!("Loaded environment from {:?}", path),
        Ok(None) => {}
        Err(e) => tracing::warn!("{:#}", e),
    }

    let cli = portfolio_chat::cli::Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(portfolio_chat::cli::run(cli))
}
