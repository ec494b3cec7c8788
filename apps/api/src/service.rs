//! In-process operations behind the HTTP routes: upload, chat, download,
//! health and session compaction.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::document::parser::{self, DocumentFormat};
use crate::document::render::{LatexRenderer, MarkupConverter, RenderError};
use crate::errors::AppError;
use crate::workflow::engine::{TurnRequest, WorkflowEngine};
use crate::workflow::retention::CompactionReport;
use crate::workflow::store::ThreadId;

pub const SERVICE_NAME: &str = "resume-optimization-api";
const DEFAULT_DOWNLOAD_NAME: &str = "resume";

#[derive(Debug, Clone, Serialize)]
pub struct UploadedDocument {
    pub content: String,
    pub sections: BTreeMap<String, String>,
    pub session_id: String,
}

#[derive(Debug, Clone)]
pub struct ChatInput {
    pub user_id: String,
    pub session_id: Option<String>,
    pub message: String,
    pub document_content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub intent: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub filename: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub latex_available: bool,
    pub store_available: bool,
}

pub struct AssistantService {
    engine: WorkflowEngine,
    converter: MarkupConverter,
    renderer: LatexRenderer,
}

impl AssistantService {
    pub fn new(engine: WorkflowEngine, converter: MarkupConverter, renderer: LatexRenderer) -> Self {
        Self {
            engine,
            converter,
            renderer,
        }
    }

    /// Parses an uploaded resume and issues a fresh session id.
    pub async fn upload_document(
        &self,
        filename: &str,
        bytes: Bytes,
    ) -> Result<UploadedDocument, AppError> {
        let format = DocumentFormat::from_name(filename)?;
        if bytes.is_empty() {
            return Err(AppError::Validation(format!("{filename} is empty")));
        }

        let extension = match format {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
        };
        let content = tokio::task::spawn_blocking(move || parser::parse(&bytes, extension))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("document parser task failed: {e}")))??;

        let sections = parser::extract_sections(&content);
        let session_id = Uuid::new_v4().to_string();
        info!(
            "Parsed upload {filename} ({} chars) into session {session_id}",
            content.len()
        );

        Ok(UploadedDocument {
            content,
            sections,
            session_id,
        })
    }

    pub async fn chat(&self, input: ChatInput) -> Result<ChatReply, AppError> {
        if input.user_id.trim().is_empty() {
            return Err(AppError::Validation("user_id must not be empty".to_string()));
        }
        if input.message.trim().is_empty() {
            return Err(AppError::Validation("message must not be empty".to_string()));
        }

        let outcome = self
            .engine
            .run_turn(TurnRequest {
                user_id: input.user_id,
                session_id: input.session_id.clone(),
                message: input.message,
                document_content: input.document_content,
            })
            .await?;

        Ok(ChatReply {
            response: outcome.response,
            intent: outcome.intent.to_string(),
            session_id: input.session_id,
        })
    }

    /// Converts resume text to LaTeX and compiles it to a PDF.
    pub async fn download_rendered_document(
        &self,
        content: &str,
        filename: Option<&str>,
    ) -> Result<RenderedDocument, AppError> {
        if content.trim().is_empty() {
            return Err(AppError::Validation("enhanced_content must not be empty".to_string()));
        }
        let filename = format!("{}.pdf", download_name(filename));
        info!("PDF download requested: {filename} ({} chars)", content.len());

        if !self.renderer.is_available().await {
            return Err(RenderError::CompilerMissing(self.renderer.program().to_string()).into());
        }

        let latex = self
            .converter
            .convert(content)
            .await
            .map_err(RenderError::Conversion)?;
        if !latex.compilation_notes.trim().is_empty() {
            info!("Conversion notes: {}", latex.compilation_notes.trim());
        }

        let bytes = self.renderer.render(&latex.latex_content).await?;
        Ok(RenderedDocument { filename, bytes })
    }

    pub async fn health_check(&self) -> HealthReport {
        let latex_available = self.renderer.is_available().await;
        let store_available = match self.engine.store().ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Session store health probe failed: {e}");
                false
            }
        };

        HealthReport {
            status: "healthy",
            service: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            latex_available,
            store_available,
        }
    }

    pub async fn compact_session(
        &self,
        user_id: &str,
        session_id: Option<&str>,
    ) -> Result<CompactionReport, AppError> {
        let thread_id = ThreadId::new(user_id, session_id);
        self.engine
            .compact(&thread_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No session found for {thread_id}")))
    }
}

/// Requested download name reduced to filesystem and header safe characters.
fn download_name(requested: Option<&str>) -> String {
    let cleaned: String = requested
        .unwrap_or(DEFAULT_DOWNLOAD_NAME)
        .trim()
        .trim_end_matches(".pdf")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' ' | '.'))
        .collect();
    let cleaned = cleaned.trim().trim_matches('.').to_string();
    if cleaned.is_empty() {
        DEFAULT_DOWNLOAD_NAME.to_string()
    } else {
        cleaned
    }
}
