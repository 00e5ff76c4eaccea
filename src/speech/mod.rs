//! 음성 합성 모듈 - TTS API 호출
//!
//! 최종 답변 텍스트를 base64 MP3로 변환합니다.
//! 합성은 항상 best-effort: 실패해도 요청 전체를 실패시키지 않습니다.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use url::Url;

/// data URI 접두사
pub const AUDIO_DATA_URI_PREFIX: &str = "data:audio/mp3;base64,";

// ============================================================================
// SpeechSynthesizer Trait
// ============================================================================

/// 음성 합성 프로바이더 트레이트
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// 텍스트를 합성하고 base64 페이로드 반환
    async fn synthesize(&self, text: &str) -> Result<String>;
}

/// base64 페이로드를 data URI로 감싸기
pub fn audio_data_uri(payload: &str) -> String {
    format!("{}{}", AUDIO_DATA_URI_PREFIX, payload)
}

/// 합성 시도 (실패 시 None)
pub async fn synthesize_best_effort(synth: &dyn SpeechSynthesizer, text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }

    match synth.synthesize(text).await {
        Ok(payload) => Some(audio_data_uri(&payload)),
        Err(e) => {
            tracing::warn!("TTS failed, responding without audio: {:#}", e);
            None
        }
    }
}

// ============================================================================
// TtsClient
// ============================================================================

/// TikTok TTS 프록시 클라이언트
///
/// 요청: `{"text": ..., "voice": ...}`, 응답: `{"data": "<base64>"}`
#[derive(Debug)]
pub struct TtsClient {
    endpoint: Url,
    voice: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    voice: &'a str,
}

#[derive(Debug, Deserialize)]
struct TtsResponse {
    data: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl TtsClient {
    /// 새 클라이언트
    pub fn new(endpoint: Url, voice: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            endpoint,
            voice: voice.into(),
            client,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for TtsClient {
    async fn synthesize(&self, text: &str) -> Result<String> {
        let request = TtsRequest {
            text,
            voice: &self.voice,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .context("Failed to send TTS request")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("TTS API error ({})", status);
        }

        let parsed: TtsResponse = response
            .json()
            .await
            .context("Failed to parse TTS response")?;

        let payload = parsed.data.filter(|d| !d.is_empty()).ok_or_else(|| {
            anyhow::anyhow!(
                "TTS returned no audio: {}",
                parsed.error.as_deref().unwrap_or("empty payload")
            )
        })?;

        // 깨진 페이로드는 브라우저에서 재생 실패하므로 여기서 걸러낸다
        STANDARD
            .decode(payload.as_bytes())
            .context("TTS payload is not valid base64")?;

        tracing::debug!("TTS produced {} base64 chars", payload.len());
        Ok(payload)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::ServerGuard) -> TtsClient {
        let url = Url::parse(&format!("{}/api/generation", server.url())).unwrap();
        TtsClient::new(url, "en_us_006", Duration::from_secs(5)).unwrap()
    }

    struct FailingSynth;

    #[async_trait]
    impl SpeechSynthesizer for FailingSynth {
        async fn synthesize(&self, _text: &str) -> Result<String> {
            anyhow::bail!("timeout")
        }
    }

    #[test]
    fn test_audio_data_uri() {
        assert_eq!(audio_data_uri("AAAA"), "data:audio/mp3;base64,AAAA");
    }

    #[tokio::test]
    async fn test_best_effort_swallows_error() {
        assert_eq!(synthesize_best_effort(&FailingSynth, "hello").await, None);
    }

    #[tokio::test]
    async fn test_synthesize_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/generation")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "text": "Email me",
                "voice": "en_us_006"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true,"data":"SUQzBAAAAAAA"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let audio = synthesize_best_effort(&client, "Email me").await;

        assert_eq!(audio.as_deref(), Some("data:audio/mp3;base64,SUQzBAAAAAAA"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_synthesize_http_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/generation")
            .with_status(500)
            .create_async()
            .await;

        let err = client_for(&server).synthesize("hi").await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_synthesize_missing_data() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/generation")
            .with_status(200)
            .with_body(r#"{"success":false,"error":"Text too long","data":null}"#)
            .create_async()
            .await;

        let err = client_for(&server).synthesize("hi").await.unwrap_err();
        assert!(err.to_string().contains("Text too long"));
    }

    #[tokio::test]
    async fn test_synthesize_invalid_base64() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/generation")
            .with_status(200)
            .with_body(r#"{"data":"not base64!!"}"#)
            .create_async()
            .await;

        let result = client_for(&server).synthesize("hi").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_blank_text_skipped() {
        // 서버 없이도 호출되지 않아야 한다
        assert_eq!(synthesize_best_effort(&FailingSynth, "   ").await, None);
    }
}
