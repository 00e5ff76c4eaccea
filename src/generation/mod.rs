//! 답변 생성 모듈 - Gemini generateContent 호출
//!
//! 두 가지 모드를 지원합니다:
//! - Rephrase: 매칭된 텍스트를 컨텍스트로 주고 말투만 다듬기
//! - Grounded: 지식베이스 전체를 주고 그 안에서만 답하도록 지시
//!
//! 실패(쿼터, 안전 차단, 네트워크)는 호출자에게 전파하지 않고
//! `generate_or_apologize`에서 고정 사과 문구로 대체합니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let generator = GeminiGenerator::new(api_key, "gemini-2.5-flash", base_url, timeout)?;
//! let prompt = Prompt::rephrase("Juned", "how can I contact you", "Email me");
//! let text = generate_or_apologize(&generator, &prompt).await;
//! ```

mod gemini;

pub use gemini::GeminiGenerator;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::knowledge::KnowledgeRecord;

/// 생성 실패 시 응답
pub const APOLOGY_MESSAGE: &str =
    "Sorry, I'm having trouble thinking right now. Please try again in a moment.";

// ============================================================================
// AnswerGenerator Trait
// ============================================================================

/// 텍스트 생성 프로바이더 트레이트
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// 프롬프트로 답변 생성
    async fn generate(&self, prompt: &Prompt) -> Result<String>;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Prompt
// ============================================================================

/// 생성 프롬프트
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system_instruction: String,
    pub user_text: String,
}

#[derive(Serialize)]
struct GroundingEntry<'a> {
    topics: &'a [String],
    fact: &'a str,
}

impl Prompt {
    /// Rephrase 모드: 검색된 텍스트를 대화 컨텍스트로 전달
    pub fn rephrase(persona: &str, query: &str, context: &str) -> Self {
        Self {
            system_instruction: format!(
                "You are {persona}'s AI Friend, a virtual assistant built to showcase \
                 {persona}'s portfolio. Answer questions based on the provided context."
            ),
            user_text: format!(
                "Context: {context}\n\
                 User Question: {query}\n\
                 System: Provide a concise, friendly answer (under 2 sentences) suitable for speech."
            ),
        }
    }

    /// Grounded 모드: 지식베이스 전체를 구조화된 컨텍스트로 전달
    pub fn grounded(persona: &str, query: &str, records: &[KnowledgeRecord]) -> Self {
        let entries: Vec<GroundingEntry<'_>> = records
            .iter()
            .map(|r| GroundingEntry {
                topics: &r.keywords,
                fact: &r.content,
            })
            .collect();

        // Vec<struct of &str/&[String]> 직렬화는 실패하지 않음
        let knowledge = serde_json::to_string_pretty(&entries).unwrap_or_default();

        Self {
            system_instruction: format!(
                "You are {persona}'s AI Friend, a virtual assistant built to showcase \
                 {persona}'s portfolio.\n\
                 Answer ONLY with facts from the knowledge base below. \
                 If the answer is not in the knowledge base, politely say you don't know \
                 and suggest asking about {persona}'s experience, projects, or skills.\n\
                 Keep the answer concise (under 2 sentences) and suitable for speech.\n\n\
                 Knowledge base (JSON):\n{knowledge}"
            ),
            user_text: query.to_string(),
        }
    }
}

/// 생성 실패 시 사과 문구로 대체
pub async fn generate_or_apologize(generator: &dyn AnswerGenerator, prompt: &Prompt) -> String {
    match generator.generate(prompt).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Generation failed ({}): {:#}", generator.name(), e);
            APOLOGY_MESSAGE.to_string()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
