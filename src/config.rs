//! 설정 모듈 - 환경변수 (+ `.env`) 기반
//!
//! 키가 없거나 값이 잘못되었으면 경고를 남기고 기본값을 씁니다.
//! 테스트에서 환경변수를 건드리지 않도록 `from_lookup`에 조회 함수를 주입할 수 있습니다.

use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

/// 기본 포트
pub const DEFAULT_PORT: u16 = 5001;
/// 기본 Gemini 모델
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
/// Gemini API 기본 주소
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// TTS 프록시 엔드포인트
pub const DEFAULT_TTS_URL: &str = "https://tiktok-tts.weilnet.workers.dev/api/generation";
/// TTS 음성
pub const DEFAULT_TTS_VOICE: &str = "en_us_006";
/// 기본 페르소나 이름
pub const DEFAULT_PERSONA: &str = "Juned";
/// 외부 호출 타임아웃 (초)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Config
// ============================================================================

/// 서비스 설정
#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub db_path: Option<PathBuf>,
    pub knowledge_file: Option<PathBuf>,
    pub knowledge_replace: bool,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: Url,
    pub rephrase_with_llm: bool,
    pub tts_enabled: bool,
    pub tts_url: Url,
    pub tts_voice: String,
    pub http_timeout: Duration,
    pub cors_origins: Vec<String>,
    pub persona: String,
}

impl Config {
    /// 프로세스 환경변수에서 로드
    ///
    /// `.env`는 `load_dotenv`로 미리 읽어둬야 합니다.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 조회 함수로 로드
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // 빈 문자열은 미설정으로 취급
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let db_path = get("KNOWLEDGE_DB")
            .or_else(|| get("DATABASE_URL"))
            .map(|v| PathBuf::from(strip_sqlite_scheme(&v)));

        let cors_origins = get("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            host: parse_or("HOST", get("HOST"), IpAddr::from([0, 0, 0, 0])),
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT),
            db_path,
            knowledge_file: get("KNOWLEDGE_FILE").map(PathBuf::from),
            knowledge_replace: parse_bool("KNOWLEDGE_REPLACE", get("KNOWLEDGE_REPLACE"), false),
            gemini_api_key: get("GEMINI_API_KEY").or_else(|| get("GOOGLE_AI_API_KEY")),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: parse_url("GEMINI_BASE_URL", get("GEMINI_BASE_URL"), DEFAULT_GEMINI_BASE_URL),
            rephrase_with_llm: parse_bool("REPHRASE_WITH_LLM", get("REPHRASE_WITH_LLM"), false),
            tts_enabled: parse_bool("TTS_ENABLED", get("TTS_ENABLED"), true),
            tts_url: parse_url("TTS_URL", get("TTS_URL"), DEFAULT_TTS_URL),
            tts_voice: get("TTS_VOICE").unwrap_or_else(|| DEFAULT_TTS_VOICE.to_string()),
            http_timeout: Duration::from_secs(parse_or(
                "HTTP_TIMEOUT_SECS",
                get("HTTP_TIMEOUT_SECS"),
                DEFAULT_HTTP_TIMEOUT_SECS,
            )),
            cors_origins,
            persona: get("PERSONA_NAME").unwrap_or_else(|| DEFAULT_PERSONA.to_string()),
        }
    }

    /// API 키 존재 여부
    pub fn has_api_key(&self) -> bool {
        self.gemini_api_key.is_some()
    }

    /// 바인드 주소
    pub fn bind_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::new(self.host, self.port)
    }

    /// 지식 로드 옵션
    pub fn load_options(&self) -> crate::knowledge::LoadOptions {
        crate::knowledge::LoadOptions {
            db_path: self.db_path.clone(),
            knowledge_file: self.knowledge_file.clone(),
            replace: self.knowledge_replace,
        }
    }
}

/// `.env` 파일 로드 (없으면 무시)
///
/// 이미 설정된 환경변수는 덮어쓰지 않습니다.
pub fn load_dotenv() -> Result<Option<PathBuf>> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e).context("Failed to read .env"),
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// `sqlite://` 접두사 제거
fn strip_sqlite_scheme(value: &str) -> &str {
    value
        .strip_prefix("sqlite://")
        .or_else(|| value.strip_prefix("sqlite:"))
        .unwrap_or(value)
}

/// 파싱 실패 시 경고 후 기본값
fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> T {
    let Some(value) = value else {
        return default;
    };

    value.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid {}: {:?}, using default", key, value);
        default
    })
}

fn parse_url(key: &str, value: Option<String>, default: &str) -> Url {
    if let Some(value) = value {
        match Url::parse(&value) {
            Ok(url) => return url,
            Err(e) => tracing::warn!("Invalid {}: {:?} ({}), using default", key, value, e),
        }
    }

    // 기본값은 상수 URL이므로 파싱이 실패하지 않음
    Url::parse(default).unwrap_or_else(|e| unreachable!("bad default URL {}: {}", default, e))
}

fn parse_bool(key: &str, value: Option<String>, default: bool) -> bool {
    let Some(value) = value else {
        return default;
    };

    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            tracing::warn!("Invalid {}: {:?} (expected true/false), using default", key, value);
            default
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
