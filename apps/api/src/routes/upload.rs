use std::collections::BTreeMap;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub content: String,
    pub sections: BTreeMap<String, String>,
    pub session_id: String,
}

/// POST /upload
/// Multipart form with a single `file` field (.pdf or .docx).
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("file field has no filename".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;

        let uploaded = state.service.upload_document(&filename, bytes).await?;
        return Ok(Json(UploadResponse {
            success: true,
            content: uploaded.content,
            sections: uploaded.sections,
            session_id: uploaded.session_id,
        }));
    }

    Err(AppError::Validation("Missing 'file' field".to_string()))
}
