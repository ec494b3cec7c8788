use axum::{extract::State, Json};

use crate::service::HealthReport;
use crate::state::AppState;

/// GET /health
/// Service identity plus compiler and session-store availability.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.service.health_check().await)
}
