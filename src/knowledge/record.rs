//! 지식 레코드 - 키워드 + 콘텐츠 한 쌍
//!
//! 기본 시드 데이터와 JSON 파일 로더를 함께 제공합니다.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// Types
// ============================================================================

/// 지식베이스 레코드
///
/// 프로세스가 살아있는 동안 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    /// 매칭 키워드 (순서 유지)
    #[serde(default)]
    pub keywords: Vec<String>,
    /// 응답 콘텐츠
    pub content: String,
}

impl KnowledgeRecord {
    pub fn new<K, S>(keywords: K, content: impl Into<String>) -> Self
    where
        K: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            content: content.into(),
        }
    }
}

// ============================================================================
// Seed Data
// ============================================================================

/// 기본 시드 데이터
///
/// DB가 비어 있고 지식 파일도 없을 때 사용됩니다.
pub fn default_records() -> Vec<KnowledgeRecord> {
    vec![
        KnowledgeRecord::new(
            ["who", "about", "juned", "bio"],
            "I am Juned, a passionate Full Stack Developer and AI Specialist based in Bengaluru, India. \
             I specialize in building immersive 3D web applications and intelligent AI solutions.",
        ),
        KnowledgeRecord::new(
            ["experience", "work", "job"],
            "I have experience as a Full Stack Web Development Intern at Edunet Foundation \
             (MERN Auction Platform) and as an AI & Robotics Master Trainer at Agilo Research.",
        ),
        KnowledgeRecord::new(
            ["ai guru j", "project"],
            "AI Guru J is my flagship project: an Intelligent 3D Virtual Python Tutor \
             using React, Three.js, and Gemini.",
        ),
        KnowledgeRecord::new(
            ["contact", "email", "phone"],
            "I prefer to be contacted via Email or LinkedIn. \
             (I do not share my phone number publicly).",
        ),
        KnowledgeRecord::new(
            ["your name", "who are you"],
            "I am Juned's AI Friend, a virtual assistant developed by him to showcase his portfolio. \
             Think of me as a living reflection of his technical expertise!",
        ),
    ]
}

// ============================================================================
// File Loader
// ============================================================================

/// JSON 파일에서 레코드 로드
///
/// 파일 형식: `[{"keywords": [...], "content": "..."}, ...]`
pub fn load_records_from_file(path: &Path) -> Result<Vec<KnowledgeRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read knowledge file: {:?}", path))?;

    let records: Vec<KnowledgeRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse knowledge file: {:?}", path))?;

    tracing::info!("Loaded {} records from {:?}", records.len(), path);
    Ok(records)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_records_not_empty() {
        let records = default_records();
        assert_eq!(records.len(), 5);
        assert!(records.iter().all(|r| !r.keywords.is_empty()));
    }

    #[test]
    fn test_load_records_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"keywords": ["contact"], "content": "Email me"}}, {{"content": "No keywords"}}]"#
        )
        .unwrap();

        let records = load_records_from_file(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], KnowledgeRecord::new(["contact"], "Email me"));
        assert!(records[1].keywords.is_empty());
    }

    #[test]
    fn test_load_records_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = load_records_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse knowledge file"));
    }

    #[test]
    fn test_load_records_missing_file() {
        let result = load_records_from_file(Path::new("/nonexistent/knowledge.json"));
        assert!(result.is_err());
    }
}
