//! Knowledge Store - rusqlite 기반 동기 지식 저장소
//!
//! 포트폴리오 지식 레코드를 저장하는 문서 데이터베이스입니다.
//! 시작 시 한 번 읽어서 메모리에 올리고, 요청 경로에서는 접근하지 않습니다.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags};
use serde::Serialize;

use super::record::KnowledgeRecord;

// ============================================================================
// Types
// ============================================================================

/// 저장된 레코드 (DB 메타데이터 포함)
#[derive(Debug, Clone, Serialize)]
pub struct StoredRecord {
    pub id: i64,
    pub record: KnowledgeRecord,
    pub created_at: DateTime<Utc>,
}

/// 시드 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// 빈 테이블에 레코드 삽입됨
    Seeded(usize),
    /// 이미 데이터가 있어 건너뜀
    AlreadyPopulated(usize),
}

/// 저장소 통계
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub record_count: usize,
    pub total_content_bytes: usize,
    pub db_path: PathBuf,
}

// ============================================================================
// KnowledgeStore
// ============================================================================

/// Knowledge Store - 동기 지식 저장소
pub struct KnowledgeStore {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl KnowledgeStore {
    /// 저장소 열기 (없으면 생성)
    ///
    /// # Arguments
    /// * `path` - DB 파일 경로 (없으면 생성)
    pub fn open(path: &Path) -> Result<Self> {
        // 부모 디렉토리 생성
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create database directory")?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open SQLite database")?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: path.to_path_buf(),
        };

        store.initialize()?;
        Ok(store)
    }

    /// DB 경로 반환
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// 스키마 초기화
    fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS knowledge (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                keywords TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )
        .context("Failed to create knowledge table")?;

        tracing::debug!("Knowledge store initialized at {:?}", self.db_path);
        Ok(())
    }

    /// 레코드 수
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM knowledge", [], |row| row.get(0))
            .context("Failed to count records")?;

        Ok(count as usize)
    }

    /// 레코드 일괄 삽입 (순서 유지)
    pub fn insert_many(&self, records: &[KnowledgeRecord]) -> Result<usize> {
        let mut conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        let inserted = insert_all(&tx, records)?;

        tx.commit().context("Failed to commit records")?;
        Ok(inserted)
    }

    /// 테이블이 비어 있을 때만 시드
    pub fn seed_if_empty(&self, records: &[KnowledgeRecord]) -> Result<SeedOutcome> {
        let existing = self.count()?;
        if existing > 0 {
            tracing::info!("Knowledge store already contains {} records", existing);
            return Ok(SeedOutcome::AlreadyPopulated(existing));
        }

        let inserted = self.insert_many(records)?;
        tracing::info!("Seeded knowledge store with {} records", inserted);
        Ok(SeedOutcome::Seeded(inserted))
    }

    /// 전체 교체 (단일 트랜잭션)
    pub fn replace_all(&self, records: &[KnowledgeRecord]) -> Result<usize> {
        let mut conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        tx.execute("DELETE FROM knowledge", [])
            .context("Failed to clear knowledge table")?;
        let inserted = insert_all(&tx, records)?;

        tx.commit().context("Failed to commit replacement")?;
        tracing::info!("Replaced knowledge store content with {} records", inserted);
        Ok(inserted)
    }

    /// 전체 레코드 (삽입 순서)
    pub fn load_all(&self) -> Result<Vec<KnowledgeRecord>> {
        Ok(self.list()?.into_iter().map(|r| r.record).collect())
    }

    /// 전체 레코드 + 메타데이터 (삽입 순서)
    pub fn list(&self) -> Result<Vec<StoredRecord>> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT id, keywords, content, created_at FROM knowledge ORDER BY id ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, keywords, content, created_at) = row?;
            let keywords: Vec<String> = serde_json::from_str(&keywords)
                .with_context(|| format!("Corrupt keywords column for record {}", id))?;

            records.push(StoredRecord {
                id,
                record: KnowledgeRecord { keywords, content },
                created_at: parse_datetime(created_at),
            });
        }

        Ok(records)
    }

    /// 저장소 통계
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM knowledge", [], |row| row.get(0))
            .unwrap_or(0);

        let total_size: i64 = conn
            .query_row(
                "SELECT COALESCE(SUM(LENGTH(content)), 0) FROM knowledge",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        Ok(StoreStats {
            record_count: count as usize,
            total_content_bytes: total_size as usize,
            db_path: self.db_path.clone(),
        })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn insert_all(conn: &Connection, records: &[KnowledgeRecord]) -> Result<usize> {
    let now = Utc::now().to_rfc3339();
    let mut stmt = conn
        .prepare("INSERT INTO knowledge (keywords, content, created_at) VALUES (?1, ?2, ?3)")
        .context("Failed to prepare insert")?;

    for record in records {
        let keywords = serde_json::to_string(&record.keywords)?;
        stmt.execute(params![keywords, record.content, now])
            .context("Failed to insert record")?;
    }

    Ok(records.len())
}

/// RFC3339 문자열을 DateTime<Utc>로 파싱
fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

// ============================================================================
// Tests
// ============================================================================
