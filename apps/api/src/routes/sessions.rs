use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::state::AppState;
use crate::workflow::retention::CompactionReport;

#[derive(Debug, Deserialize)]
pub struct CompactRequest {
    pub user_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// POST /sessions/compact
/// Trims the stored thread to the configured retention caps.
pub async fn handle_compact(
    State(state): State<AppState>,
    Json(req): Json<CompactRequest>,
) -> Result<Json<CompactionReport>, AppError> {
    let report = state
        .service
        .compact_session(&req.user_id, req.session_id.as_deref())
        .await?;
    Ok(Json(report))
}
