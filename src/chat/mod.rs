//! 채팅 오케스트레이션
//!
//! 요청 → 텍스트 생성 (매처 또는 LLM) → 음성 합성 (best-effort) → 응답
//!
//! 요청 간 공유 상태는 읽기 전용 지식베이스뿐이며 잠금이 필요 없습니다.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::generation::{generate_or_apologize, AnswerGenerator, Prompt};
use crate::knowledge::{find_best_match, KnowledgeRecord};
use crate::speech::{synthesize_best_effort, SpeechSynthesizer};

// ============================================================================
// Types
// ============================================================================

/// 채팅 요청
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    pub message: String,
    /// 지식베이스 전체를 LLM에 주고 답하게 할지 여부
    #[serde(default, alias = "use_gemini_2_5")]
    pub use_alternate_model: bool,
}

/// 채팅 응답
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChatResponse {
    pub text: String,
    /// `data:audio/mp3;base64,...` (합성 실패 시 null)
    pub audio: Option<String>,
}

/// 오케스트레이션 설정
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// 폴백 문구와 프롬프트에 쓰이는 이름
    pub persona: String,
    /// 기본 요청에서도 매칭 결과를 LLM으로 다듬을지 여부
    pub rephrase_with_llm: bool,
}

// ============================================================================
// ChatService
// ============================================================================

/// 채팅 서비스
///
/// 생성기와 합성기는 선택 사항이며, 없으면 해당 단계를 건너뜁니다.
#[derive(Clone)]
pub struct ChatService {
    knowledge: Arc<[KnowledgeRecord]>,
    generator: Option<Arc<dyn AnswerGenerator>>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    settings: ChatSettings,
}

impl ChatService {
    pub fn new(knowledge: Arc<[KnowledgeRecord]>, settings: ChatSettings) -> Self {
        Self {
            knowledge,
            generator: None,
            synthesizer: None,
            settings,
        }
    }

    /// 답변 생성기 연결
    pub fn with_generator(mut self, generator: Arc<dyn AnswerGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// 음성 합성기 연결
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn knowledge(&self) -> &[KnowledgeRecord] {
        &self.knowledge
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    pub fn has_synthesizer(&self) -> bool {
        self.synthesizer.is_some()
    }

    /// 요청 처리
    ///
    /// 외부 호출 실패는 모두 내부에서 흡수되므로 항상 응답을 반환합니다.
    pub async fn respond(&self, request: &ChatRequest) -> ChatResponse {
        let text = self.produce_text(request).await;

        let audio = match &self.synthesizer {
            Some(synth) => synthesize_best_effort(synth.as_ref(), &text).await,
            None => None,
        };

        ChatResponse { text, audio }
    }

    /// 텍스트 생성 (요청 플래그로 경로 선택)
    async fn produce_text(&self, request: &ChatRequest) -> String {
        let persona = &self.settings.persona;
        let query = request.message.as_str();

        if request.use_alternate_model {
            if let Some(generator) = &self.generator {
                let prompt = Prompt::grounded(persona, query, &self.knowledge);
                return generate_or_apologize(generator.as_ref(), &prompt).await;
            }
            tracing::warn!("Alternate model requested but no generator configured, using matcher");
        }

        let outcome = find_best_match(query, &self.knowledge);
        let matched = outcome.is_found();
        let retrieved = outcome.into_text(persona);

        match &self.generator {
            Some(generator) if self.settings.rephrase_with_llm && matched => {
                let prompt = Prompt::rephrase(persona, query, &retrieved);
                generate_or_apologize(generator.as_ref(), &prompt).await
            }
            _ => retrieved,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
