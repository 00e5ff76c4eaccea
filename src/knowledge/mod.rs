//! Knowledge 모듈 - 포트폴리오 지식베이스
//!
//! - Record: 키워드 + 콘텐츠, 기본 시드, JSON 파일 로더
//! - Store: SQLite 문서 저장소 (시드/교체/로드)
//! - Loader: 시작 시 DB/파일/시드 중 선택
//! - Matcher: 키워드 겹침 스코어링

mod record;
mod store;
mod loader;
mod matcher;

// Re-exports
pub use record::{KnowledgeRecord, default_records, load_records_from_file};
pub use store::{KnowledgeStore, SeedOutcome, StoreStats, StoredRecord};
pub use loader::{KnowledgeSource, LoadOptions, LoadedKnowledge, load_knowledge};
pub use matcher::{
    MatchOutcome, ScoredCandidate,
    fallback_message, find_best_match, rank, score_record,
    CONTENT_MATCH_BONUS, NO_MEMORY_MESSAGE,
};
