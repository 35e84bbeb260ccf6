//! Public chat endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    routing::get,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::rate_limit::rate_limit_middleware;
use super::{ApiError, ApiState, error_response, internal_error};
use crate::db::{ChatMessage, MessageRole};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<ChatMessage>,
}

/// Answer a visitor message and store both sides of the exchange
async fn send_message(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = req
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                error_response("invalid_request", "Message is required"),
            )
        })?;

    let session_id = req
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    state
        .chat_repo
        .add_message(&session_id, MessageRole::User, &message)
        .map_err(|e| internal_error(&e, "Failed to process chat message"))?;

    // Analytics are best effort
    if let Err(e) = state.analytics_repo.record(&message) {
        tracing::warn!(error = %e, "failed to record question analytics");
    }

    let reply = state.pipeline.respond_detailed(&message).await;
    tracing::info!(
        session_id = %session_id,
        resolution = ?reply.resolution,
        "chat message answered"
    );

    state
        .chat_repo
        .add_message(&session_id, MessageRole::Assistant, &reply.text)
        .map_err(|e| internal_error(&e, "Failed to process chat message"))?;

    Ok(Json(ChatResponse {
        response: reply.text,
        session_id,
    }))
}

/// Fetch a session transcript
async fn get_history(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let session_id = query
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                error_response("invalid_request", "Session ID is required"),
            )
        })?;

    let messages = state
        .chat_repo
        .list_session(&session_id)
        .map_err(|e| internal_error(&e, "Failed to retrieve messages"))?;

    Ok(Json(HistoryResponse { messages }))
}

/// Build the chat router, rate limited when a limiter is configured
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/chat", get(get_history).post(send_message))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}
