use std::sync::Arc;

use crate::service::AssistantService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AssistantService>,
}
