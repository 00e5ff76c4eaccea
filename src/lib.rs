//! portfolio-chat - 포트폴리오 Q&A 백엔드
//!
//! 소규모 지식베이스에서 키워드 매칭으로 답을 찾고,
//! 필요하면 Gemini로 다듬은 뒤 TTS 음성을 붙여 반환합니다.

pub mod chat;
pub mod cli;
pub mod config;
pub mod generation;
pub mod knowledge;
pub mod server;
pub mod speech;

// Re-exports
pub use chat::{ChatRequest, ChatResponse, ChatService, ChatSettings};
pub use config::Config;
pub use generation::{AnswerGenerator, GeminiGenerator, Prompt, APOLOGY_MESSAGE};
pub use knowledge::{
    KnowledgeRecord, KnowledgeStore, MatchOutcome, ScoredCandidate, find_best_match, rank,
};
pub use server::{AppState, build_chat_service, build_router};
pub use speech::{SpeechSynthesizer, TtsClient, audio_data_uri};
