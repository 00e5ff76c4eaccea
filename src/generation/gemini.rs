//! Gemini generateContent 클라이언트
//!
//! source: https://ai.google.dev/api/generate-content

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{AnswerGenerator, Prompt};

/// 생성 온도 (짧고 일관된 답변)
const TEMPERATURE: f32 = 0.7;

// ============================================================================
// GeminiGenerator
// ============================================================================

/// Google Gemini 텍스트 생성 구현체
#[derive(Debug)]
pub struct GeminiGenerator {
    api_key: String,
    model: String,
    endpoint: String,
    client: reqwest::Client,
}

impl GeminiGenerator {
    /// 새 생성기
    ///
    /// # Arguments
    /// * `api_key` - Google AI API 키
    /// * `model` - 모델 이름 (예: `gemini-2.5-flash`)
    /// * `base_url` - API 기본 주소
    /// * `timeout` - 요청 타임아웃
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: &Url,
        timeout: Duration,
    ) -> Result<Self> {
        let model = model.into();
        if model.trim().is_empty() {
            anyhow::bail!("Gemini model name must not be empty");
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            base_url.as_str().trim_end_matches('/'),
            model
        );

        Ok(Self {
            api_key: api_key.into(),
            model,
            endpoint,
            client,
        })
    }

    /// 모델 이름
    pub fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    #[serde(rename = "systemInstruction")]
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

/// Gemini API 에러 응답
#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    #[serde(default)]
    status: String,
}

impl GenerateResponse {
    /// 첫 후보의 텍스트 파트 결합
    fn into_text(self) -> Result<String> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            anyhow::bail!("Prompt blocked by Gemini: {}", reason);
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Gemini returned no candidates"))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            anyhow::bail!(
                "Gemini returned no text (finishReason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            );
        }

        Ok(text.to_string())
    }
}

#[async_trait]
impl AnswerGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let request = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: &prompt.system_instruction,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: &prompt.user_text,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
            },
        };

        // API 키는 URL이 아닌 헤더로 전송
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send generation request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<GeminiError>(&body) {
                anyhow::bail!(
                    "Gemini API error ({}): {}",
                    error.error.status,
                    error.error.message
                );
            }
            anyhow::bail!("Gemini API error ({}): {}", status, body);
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).context("Failed to parse generation response")?;

        let text = parsed.into_text()?;
        tracing::debug!("Gemini ({}) generated {} chars", self.model, text.len());
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

    fn generator_for(server: &mockito::ServerGuard) -> GeminiGenerator {
        let base = Url::parse(&server.url()).unwrap();
        GeminiGenerator::new("test-key", "gemini-2.5-flash", &base, Duration::from_secs(5)).unwrap()
    }

    fn prompt() -> Prompt {
        Prompt::rephrase("Juned", "how can I contact you", "Email me")
    }

    #[test]
    fn test_empty_model_rejected() {
        let base = Url::parse("https://example.com").unwrap();
        let result = GeminiGenerator::new("k", " ", &base, Duration::from_secs(1));
        assert!(result.is_err());
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let base = Url::parse("https://example.com/").unwrap();
        let generator = GeminiGenerator::new("k", "m", &base, Duration::from_secs(1)).unwrap();
        assert_eq!(
            generator.endpoint,
            "https://example.com/v1beta/models/m:generateContent"
        );
    }

    #[tokio::test]
    async fn test_generate_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::Regex(r#""role":"user""#.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"You can "},{"text":"email me."}]},"finishReason":"STOP"}]}"#,
            )
            .create_async()
            .await;

        let text = generator_for(&server).generate(&prompt()).await.unwrap();
        assert_eq!(text, "You can email me.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_quota_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(429)
            .with_body(r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#)
            .create_async()
            .await;

        let err = generator_for(&server).generate(&prompt()).await.unwrap_err();
        assert!(err.to_string().contains("RESOURCE_EXHAUSTED"));
    }

    #[tokio::test]
    async fn test_generate_safety_block() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
            .create_async()
            .await;

        let err = generator_for(&server).generate(&prompt()).await.unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn test_generate_empty_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(r#"{"candidates":[{"finishReason":"MAX_TOKENS"}]}"#)
            .create_async()
            .await;

        let err = generator_for(&server).generate(&prompt()).await.unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }
}
