use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub enhanced_content: String,
    #[serde(default)]
    pub filename: Option<String>,
}

/// POST /download-latex-pdf
pub async fn handle_download(
    State(state): State<AppState>,
    Json(req): Json<DownloadRequest>,
) -> Result<Response, AppError> {
    let rendered = state
        .service
        .download_rendered_document(&req.enhanced_content, req.filename.as_deref())
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&rendered.filename),
            ),
        ],
        rendered.bytes,
    )
        .into_response())
}

/// Attachment disposition with the filename quoted. Names arrive sanitized,
/// so they carry no quotes or control characters.
fn content_disposition(filename: &str) -> String {
    format!("attachment; filename=\"{filename}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_quotes_names_with_spaces() {
        assert_eq!(
            content_disposition("my resume.pdf"),
            "attachment; filename=\"my resume.pdf\""
        );
    }
}
