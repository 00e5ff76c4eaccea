//! HTTP 서버 - Axum 기반
//!
//! - `GET /`: 생존 확인
//! - `POST /chat` (`/api/chat`): 채팅 요청 처리

mod error;
mod routes;

pub use error::ApiError;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::chat::{ChatService, ChatSettings};
use crate::config::Config;
use crate::generation::{AnswerGenerator, GeminiGenerator};
use crate::knowledge::load_knowledge;
use crate::speech::{SpeechSynthesizer, TtsClient};

/// 핸들러 공유 상태
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
}

/// 라우터 구성
///
/// `cors_origins`가 비어 있으면 모든 origin을 허용합니다.
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(routes::home))
        .route("/chat", post(routes::chat))
        .route("/api/chat", post(routes::chat))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers(Any);

    if origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let parsed: Vec<_> = origins
        .iter()
        .filter_map(|o| match o.parse::<axum::http::HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    cors.allow_origin(parsed)
}

// ============================================================================
// Service Assembly
// ============================================================================

/// 설정으로 채팅 서비스 조립
///
/// 외부 협력자 생성에 실패하면 경고만 남기고 해당 단계 없이 동작합니다.
pub fn build_chat_service(config: &Config) -> ChatService {
    let loaded = load_knowledge(&config.load_options());

    let mut service = ChatService::new(
        loaded.records,
        ChatSettings {
            persona: config.persona.clone(),
            rephrase_with_llm: config.rephrase_with_llm,
        },
    );

    if let Some(generator) = build_generator(config) {
        service = service.with_generator(generator);
    }
    if let Some(synthesizer) = build_synthesizer(config) {
        service = service.with_synthesizer(synthesizer);
    }

    service
}

fn build_generator(config: &Config) -> Option<Arc<dyn AnswerGenerator>> {
    let Some(api_key) = config.gemini_api_key.as_ref() else {
        tracing::warn!("GEMINI_API_KEY not set, answers come from the keyword matcher only");
        return None;
    };

    match GeminiGenerator::new(
        api_key.clone(),
        config.gemini_model.clone(),
        &config.gemini_base_url,
        config.http_timeout,
    ) {
        Ok(generator) => {
            tracing::info!("Using Gemini generator (model: {})", generator.model());
            Some(Arc::new(generator))
        }
        Err(e) => {
            tracing::error!("Gemini generator unavailable: {:#}", e);
            None
        }
    }
}

fn build_synthesizer(config: &Config) -> Option<Arc<dyn SpeechSynthesizer>> {
    if !config.tts_enabled {
        tracing::info!("TTS disabled");
        return None;
    }

    match TtsClient::new(config.tts_url.clone(), config.tts_voice.clone(), config.http_timeout) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::error!("TTS client unavailable: {:#}", e);
            None
        }
    }
}

// ============================================================================
// Server
// ============================================================================

/// HTTP 서버 시작
pub async fn start(config: &Config) -> Result<()> {
    let state = AppState {
        chat: Arc::new(build_chat_service(config)),
    };
    let app = build_router(state, &config.cors_origins);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
