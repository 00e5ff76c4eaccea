//! 시작 시 지식베이스 로드
//!
//! DB / 파일 / 기본 시드 중 어디서 레코드를 가져올지 결정합니다.
//! 어떤 실패도 프로세스를 멈추지 않으며, 최악의 경우 빈 지식베이스로 시작합니다.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use super::record::{default_records, load_records_from_file, KnowledgeRecord};
use super::store::{KnowledgeStore, SeedOutcome};

/// 로드 옵션
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// SQLite DB 경로 (없으면 메모리 전용)
    pub db_path: Option<PathBuf>,
    /// 지식 JSON 파일
    pub knowledge_file: Option<PathBuf>,
    /// 파일 내용으로 DB를 교체할지 여부
    pub replace: bool,
}

/// 레코드 출처
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnowledgeSource {
    Database,
    File,
    BuiltIn,
    Unavailable,
}

/// 로드된 지식베이스 (읽기 전용)
#[derive(Debug, Clone)]
pub struct LoadedKnowledge {
    pub records: Arc<[KnowledgeRecord]>,
    pub source: KnowledgeSource,
}

/// 지식베이스 로드
pub fn load_knowledge(options: &LoadOptions) -> LoadedKnowledge {
    // 파일 레코드는 DB 유무와 상관없이 먼저 읽어둔다
    let file_records = options.knowledge_file.as_ref().and_then(|path| {
        match load_records_from_file(path) {
            Ok(records) => Some(records),
            Err(e) => {
                tracing::error!("Knowledge file unusable: {:#}", e);
                None
            }
        }
    });

    let Some(db_path) = options.db_path.as_ref() else {
        tracing::warn!("KNOWLEDGE_DB not set, serving knowledge from memory only");
        return match file_records {
            Some(records) => loaded(records, KnowledgeSource::File),
            None => loaded(default_records(), KnowledgeSource::BuiltIn),
        };
    };

    match load_from_database(db_path, file_records.as_deref(), options.replace) {
        Ok(records) => loaded(records, KnowledgeSource::Database),
        Err(e) => {
            tracing::error!("Knowledge database error: {:#}", e);
            match file_records {
                Some(records) => loaded(records, KnowledgeSource::File),
                None => loaded(Vec::new(), KnowledgeSource::Unavailable),
            }
        }
    }
}

fn load_from_database(
    db_path: &std::path::Path,
    file_records: Option<&[KnowledgeRecord]>,
    replace: bool,
) -> Result<Vec<KnowledgeRecord>> {
    let store = KnowledgeStore::open(db_path).context("Failed to open knowledge store")?;

    match file_records {
        Some(records) if replace => {
            store.replace_all(records)?;
        }
        Some(records) => {
            report_seed(store.seed_if_empty(records)?);
        }
        None => {
            report_seed(store.seed_if_empty(&default_records())?);
        }
    }

    store.load_all()
}

fn report_seed(outcome: SeedOutcome) {
    match outcome {
        SeedOutcome::Seeded(n) => tracing::info!("Database seeded with {} records", n),
        SeedOutcome::AlreadyPopulated(n) => tracing::debug!("Database already has {} records", n),
    }
}

fn loaded(records: Vec<KnowledgeRecord>, source: KnowledgeSource) -> LoadedKnowledge {
    tracing::info!("Knowledge base ready: {} records ({:?})", records.len(), source);
    LoadedKnowledge {
        records: records.into(),
        source,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, json: &str) -> PathBuf {
        let path = dir.path().join("knowledge.json");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(json.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_no_db_uses_builtin() {
        let loaded = load_knowledge(&LoadOptions::default());
        assert_eq!(loaded.source, KnowledgeSource::BuiltIn);
        assert_eq!(loaded.records.len(), default_records().len());
    }

    #[test]
    fn test_no_db_uses_file() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, r#"[{"keywords":["contact"],"content":"Email me"}]"#);

        let loaded = load_knowledge(&LoadOptions {
            knowledge_file: Some(file),
            ..Default::default()
        });
        assert_eq!(loaded.source, KnowledgeSource::File);
        assert_eq!(loaded.records[0].content, "Email me");
    }

    #[test]
    fn test_db_seeded_with_builtin() {
        let dir = TempDir::new().unwrap();
        let loaded = load_knowledge(&LoadOptions {
            db_path: Some(dir.path().join("kb.db")),
            ..Default::default()
        });
        assert_eq!(loaded.source, KnowledgeSource::Database);
        assert_eq!(loaded.records.len(), default_records().len());
    }

    #[test]
    fn test_db_seed_does_not_overwrite_without_replace() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("kb.db");
        let file = write_file(&dir, r#"[{"keywords":["x"],"content":"From file"}]"#);

        // 첫 로드: 기본 시드
        load_knowledge(&LoadOptions {
            db_path: Some(db_path.clone()),
            ..Default::default()
        });

        let loaded = load_knowledge(&LoadOptions {
            db_path: Some(db_path.clone()),
            knowledge_file: Some(file.clone()),
            replace: false,
        });
        assert_eq!(loaded.records.len(), default_records().len());

        let loaded = load_knowledge(&LoadOptions {
            db_path: Some(db_path),
            knowledge_file: Some(file),
            replace: true,
        });
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records[0].content, "From file");
    }

    #[test]
    fn test_db_failure_without_file_is_empty() {
        let dir = TempDir::new().unwrap();
        // 디렉토리를 DB 경로로 주면 열기에 실패한다
        let loaded = load_knowledge(&LoadOptions {
            db_path: Some(dir.path().to_path_buf()),
            ..Default::default()
        });
        assert_eq!(loaded.source, KnowledgeSource::Unavailable);
        assert!(loaded.records.is_empty());
    }
}
