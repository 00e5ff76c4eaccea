//! 키워드 매처 - 선형 키워드 겹침 스코어링
//!
//! 점수 = (소문자 쿼리에 포함된 키워드 수) + 0.5 (쿼리가 콘텐츠의 부분 문자열이면)
//!
//! 레코드 수십 개 규모이므로 인덱스 없이 전체를 스캔합니다.

use serde::Serialize;

use super::record::KnowledgeRecord;

/// 쿼리가 콘텐츠에 포함될 때 가산점
pub const CONTENT_MATCH_BONUS: f64 = 0.5;

/// 지식베이스가 비어 있을 때 응답
pub const NO_MEMORY_MESSAGE: &str = "I cannot access my memory right now.";

// ============================================================================
// Types
// ============================================================================

/// 요청 단위로 계산되는 후보
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub content: String,
    pub score: f64,
}

/// 매칭 결과
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome<'a> {
    /// 최고 점수 레코드의 콘텐츠
    Found(&'a str),
    /// 모든 레코드 점수가 0
    NoMatch,
    /// 지식베이스 없음
    EmptyKnowledge,
}

impl MatchOutcome<'_> {
    /// 응답 텍스트로 변환 (폴백 메시지 포함)
    pub fn into_text(self, persona: &str) -> String {
        match self {
            MatchOutcome::Found(content) => content.to_string(),
            MatchOutcome::NoMatch => fallback_message(persona),
            MatchOutcome::EmptyKnowledge => NO_MEMORY_MESSAGE.to_string(),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, MatchOutcome::Found(_))
    }
}

/// 매칭 실패 시 안내 문구
pub fn fallback_message(persona: &str) -> String {
    format!("I can tell you about {}'s Experience, Projects, or Skills!", persona)
}

// ============================================================================
// Scoring
// ============================================================================

/// 단일 레코드 점수
///
/// `lower_query`는 이미 소문자여야 합니다.
pub fn score_record(lower_query: &str, record: &KnowledgeRecord) -> f64 {
    let keyword_hits = record
        .keywords
        .iter()
        .filter(|kw| !kw.is_empty() && lower_query.contains(kw.to_lowercase().as_str()))
        .count();

    let mut score = keyword_hits as f64;
    if record.content.to_lowercase().contains(lower_query) {
        score += CONTENT_MATCH_BONUS;
    }
    score
}

/// 전체 레코드 점수 (내림차순, 동점은 원래 순서)
pub fn rank(query: &str, records: &[KnowledgeRecord]) -> Vec<ScoredCandidate> {
    let lower_query = query.to_lowercase();

    let mut candidates: Vec<ScoredCandidate> = records
        .iter()
        .map(|record| ScoredCandidate {
            content: record.content.clone(),
            score: score_record(&lower_query, record),
        })
        .collect();

    // sort_by는 안정 정렬
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates
}

/// 최고 점수 레코드 찾기
///
/// 동점이면 먼저 나온 레코드가 이깁니다.
pub fn find_best_match<'a>(query: &str, records: &'a [KnowledgeRecord]) -> MatchOutcome<'a> {
    if records.is_empty() {
        return MatchOutcome::EmptyKnowledge;
    }

    let lower_query = query.to_lowercase();
    let mut best: Option<(&'a KnowledgeRecord, f64)> = None;

    for record in records {
        let score = score_record(&lower_query, record);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((record, score)),
        }
    }

    match best {
        Some((record, score)) if score > 0.0 => {
            tracing::debug!("Best match score {:.1}", score);
            MatchOutcome::Found(&record.content)
        }
        _ => MatchOutcome::NoMatch,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kb() -> Vec<KnowledgeRecord> {
        vec![
            KnowledgeRecord::new(["who", "about", "bio"], "I am a developer from Bengaluru."),
            KnowledgeRecord::new(["experience", "work", "job"], "I worked as an intern."),
            KnowledgeRecord::new(["contact", "email"], "Email me"),
        ]
    }

    #[test]
    fn test_contact_example() {
        let records = vec![KnowledgeRecord::new(["contact"], "Email me")];
        let outcome = find_best_match("how can I contact you", &records);
        assert_eq!(outcome, MatchOutcome::Found("Email me"));
    }

    #[test]
    fn test_keyword_match_selects_record() {
        let records = kb();
        let outcome = find_best_match("Tell me about your work experience", &records);
        // "about" (1) vs "experience" + "work" (2)
        assert_eq!(outcome, MatchOutcome::Found("I worked as an intern."));
    }

    #[test]
    fn test_no_match_returns_fallback() {
        let records = kb();
        let outcome = find_best_match("xyzzy", &records);
        assert_eq!(outcome, MatchOutcome::NoMatch);
        assert_eq!(
            outcome.into_text("Juned"),
            "I can tell you about Juned's Experience, Projects, or Skills!"
        );
    }

    #[test]
    fn test_empty_knowledge() {
        let outcome = find_best_match("anything", &[]);
        assert_eq!(outcome, MatchOutcome::EmptyKnowledge);
        assert_eq!(outcome.into_text("Juned"), NO_MEMORY_MESSAGE);
    }

    #[test]
    fn test_tie_first_wins() {
        let records = vec![
            KnowledgeRecord::new(["project"], "First"),
            KnowledgeRecord::new(["project"], "Second"),
        ];
        assert_eq!(
            find_best_match("show me a project", &records),
            MatchOutcome::Found("First")
        );
    }

    #[test]
    fn test_content_substring_bonus() {
        let records = vec![
            KnowledgeRecord::new(Vec::<String>::new(), "Rust and TypeScript"),
            KnowledgeRecord::new(Vec::<String>::new(), "Python"),
        ];

        assert_eq!(score_record("typescript", &records[0]), 0.5);
        assert_eq!(score_record("typescript", &records[1]), 0.0);
        assert_eq!(
            find_best_match("TypeScript", &records),
            MatchOutcome::Found("Rust and TypeScript")
        );
    }

    #[test]
    fn test_keyword_case_insensitive() {
        let record = KnowledgeRecord::new(["GitHub"], "My profile");
        assert_eq!(score_record("where is your github", &record), 1.0);
    }

    #[test]
    fn test_empty_keyword_ignored() {
        let record = KnowledgeRecord::new([""], "Nothing");
        assert_eq!(score_record("hello", &record), 0.0);
    }

    #[test]
    fn test_rank_is_stable_and_descending() {
        let records = vec![
            KnowledgeRecord::new(["a"], "A"),
            KnowledgeRecord::new(["b", "c"], "BC"),
            KnowledgeRecord::new(["a"], "A2"),
        ];

        let ranked = rank("a b c", &records);
        let order: Vec<&str> = ranked.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(order, vec!["BC", "A", "A2"]);
        assert_eq!(ranked[0].score, 2.0);
    }
}
