//! CLI 모듈
//!
//! portfolio-chat CLI 명령어 정의 및 구현

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::chat::ChatRequest;
use crate::config::Config;
use crate::knowledge::{load_records_from_file, KnowledgeStore, SeedOutcome};
use crate::server;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "portfolio-chat")]
#[command(version, about = "포트폴리오 Q&A 백엔드", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// HTTP 서버 실행
    Serve {
        /// 바인드 주소 (HOST 덮어쓰기)
        #[arg(long)]
        host: Option<std::net::IpAddr>,

        /// 포트 (PORT 덮어쓰기)
        #[arg(short, long)]
        port: Option<u16>,

        /// SQLite DB 경로 (KNOWLEDGE_DB 덮어쓰기)
        #[arg(long)]
        db: Option<PathBuf>,

        /// 지식 JSON 파일 (KNOWLEDGE_FILE 덮어쓰기)
        #[arg(short, long)]
        knowledge: Option<PathBuf>,

        /// DB 내용을 파일로 교체
        #[arg(long)]
        replace: bool,
    },

    /// 질문 하나를 처리하고 결과 출력
    Ask {
        /// 질문
        message: String,

        /// 지식베이스 전체를 LLM에 전달
        #[arg(short, long)]
        alternate: bool,

        /// 음성 합성 생략
        #[arg(long)]
        no_audio: bool,
    },

    /// 지식 파일로 DB 시드
    Seed {
        /// 지식 JSON 파일
        #[arg(short, long)]
        file: PathBuf,

        /// 기존 내용 교체
        #[arg(long)]
        replace: bool,

        /// SQLite DB 경로
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// 저장된 레코드 목록
    List {
        /// SQLite DB 경로
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env();

    match cli.command {
        Commands::Serve {
            host,
            port,
            db,
            knowledge,
            replace,
        } => {
            let mut config = config;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if db.is_some() {
                config.db_path = db;
            }
            if knowledge.is_some() {
                config.knowledge_file = knowledge;
            }
            config.knowledge_replace |= replace;

            server::start(&config).await
        }
        Commands::Ask {
            message,
            alternate,
            no_audio,
        } => cmd_ask(config, message, alternate, no_audio).await,
        Commands::Seed { file, replace, db } => cmd_seed(&config, file, replace, db),
        Commands::List { db } => cmd_list(&config, db),
        Commands::Status => cmd_status(&config),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 질문 명령어 (ask)
///
/// 서버와 같은 ChatService로 요청 하나를 처리합니다.
async fn cmd_ask(mut config: Config, message: String, alternate: bool, no_audio: bool) -> Result<()> {
    if message.trim().is_empty() {
        bail!("질문이 비어 있습니다");
    }

    if no_audio {
        config.tts_enabled = false;
    }

    let service = server::build_chat_service(&config);
    let response = service
        .respond(&ChatRequest {
            message,
            use_alternate_model: alternate,
        })
        .await;

    println!("{}", response.text);

    match response.audio {
        Some(ref audio) => println!("\n[OK] 오디오: {}", truncate_text(audio, 60)),
        None if service.has_synthesizer() => println!("\n[!] 오디오 생성 실패"),
        None => {}
    }

    Ok(())
}

/// 시드 명령어 (seed)
fn cmd_seed(config: &Config, file: PathBuf, replace: bool, db: Option<PathBuf>) -> Result<()> {
    let store = open_store(config, db)?;
    let records = load_records_from_file(&file)?;

    if replace {
        let count = store.replace_all(&records).context("레코드 교체 실패")?;
        println!("[OK] {} 레코드로 교체됨", count);
        return Ok(());
    }

    match store.seed_if_empty(&records).context("시드 실패")? {
        SeedOutcome::Seeded(count) => println!("[OK] {} 레코드 시드됨", count),
        SeedOutcome::AlreadyPopulated(count) => {
            println!("[!] 이미 {} 레코드가 있습니다 (--replace로 교체)", count)
        }
    }

    Ok(())
}

/// 목록 명령어 (list)
fn cmd_list(config: &Config, db: Option<PathBuf>) -> Result<()> {
    let store = open_store(config, db)?;
    let rows = store.list().context("레코드 조회 실패")?;

    if rows.is_empty() {
        println!("[!] 저장된 레코드가 없습니다.");
        return Ok(());
    }

    println!("[OK] 저장된 레코드 ({} 건):\n", rows.len());

    for row in rows {
        println!("  #{:<4} [{}]", row.id, row.record.keywords.join(", "));
        println!("        {}", truncate_text(&row.record.content, 80));
        println!("        {}", row.created_at.format("%Y-%m-%d %H:%M"));
        println!();
    }

    Ok(())
}

/// 상태 명령어 (status)
fn cmd_status(config: &Config) -> Result<()> {
    println!("portfolio-chat v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("[*] 바인드 주소: {}", config.bind_addr());
    println!("[*] 페르소나: {}", config.persona);

    if config.has_api_key() {
        println!("[OK] API 키: 설정됨 (모델: {})", config.gemini_model);
    } else {
        println!("[!] API 키: 미설정 (키워드 매칭만 사용)");
        println!("    설정: export GEMINI_API_KEY=your-key");
    }

    if config.tts_enabled {
        println!("[OK] TTS: {} ({})", config.tts_url, config.tts_voice);
    } else {
        println!("[!] TTS: 비활성화");
    }

    match config.db_path.as_ref() {
        Some(path) => match KnowledgeStore::open(path).and_then(|s| s.stats()) {
            Ok(stats) => {
                println!("[OK] DB: {}", stats.db_path.display());
                println!(
                    "     레코드: {} 건, {}",
                    stats.record_count,
                    format_bytes(stats.total_content_bytes)
                );
            }
            Err(e) => println!("[!] DB 열기 실패: {}", e),
        },
        None => println!("[!] DB: 미설정 (메모리 지식베이스 사용)"),
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn open_store(config: &Config, db: Option<PathBuf>) -> Result<KnowledgeStore> {
    let path = db
        .or_else(|| config.db_path.clone())
        .ok_or_else(|| anyhow::anyhow!("DB 경로가 없습니다. --db 또는 KNOWLEDGE_DB를 지정하세요"))?;

    KnowledgeStore::open(&path).context("KnowledgeStore 열기 실패")
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 바이트 크기 포맷팅
fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;

    if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello...");
        assert_eq!(truncate_text("hello\nworld", 20), "hello world");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from([
            "portfolio-chat",
            "serve",
            "--port",
            "8080",
            "--knowledge",
            "kb.json",
            "--replace",
        ])
        .unwrap();

        match cli.command {
            Commands::Serve {
                port,
                knowledge,
                replace,
                host,
                db,
            } => {
                assert_eq!(port, Some(8080));
                assert_eq!(knowledge, Some(PathBuf::from("kb.json")));
                assert!(replace);
                assert!(host.is_none());
                assert!(db.is_none());
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from(["portfolio-chat", "ask", "who are you", "--alternate"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ask { ref message, alternate: true, no_audio: false } if message == "who are you"
        ));
    }

    #[test]
    fn test_seed_requires_db() {
        let config = Config::from_lookup(|_| None);
        let result = open_store(&config, None);
        assert!(result.is_err());
    }
}
