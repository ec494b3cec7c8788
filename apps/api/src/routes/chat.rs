use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::service::ChatInput;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub resume_content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
    pub intent: String,
    pub session_id: Option<String>,
}

/// POST /chat
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let reply = state
        .service
        .chat(ChatInput {
            user_id: req.user_id,
            session_id: req.session_id,
            message: req.message,
            document_content: req.resume_content,
        })
        .await?;

    Ok(Json(ChatResponse {
        success: true,
        response: reply.response,
        intent: reply.intent,
        session_id: reply.session_id,
    }))
}
