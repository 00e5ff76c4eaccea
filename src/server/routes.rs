//! 라우트 핸들러

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use super::{ApiError, AppState};
use crate::chat::{ChatRequest, ChatResponse};

/// 생존 확인
pub async fn home() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Portfolio chat backend running" }))
}

/// 채팅 요청 처리
///
/// 처리 중 패닉은 500으로 변환됩니다.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    tracing::info!(
        "Chat request ({} chars, alternate={})",
        request.message.chars().count(),
        request.use_alternate_model
    );

    let chat = state.chat.clone();
    let response = tokio::spawn(async move { chat.respond(&request).await })
        .await
        .map_err(|e| ApiError::Internal(format!("Chat task failed: {}", e)))?;

    Ok(Json(response))
}

// ============================================================================
// Tests
// ============================================================================
