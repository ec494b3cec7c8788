//! Resume text → LaTeX (via the backend) → PDF (via pdflatex).
//!
//! Compilation runs in a private temp directory that is removed on every
//! exit path. Up to two passes are made so cross-references resolve; a
//! failing pass is still accepted when it produced a PDF.

use std::path::Path;
use std::process::Output;

use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::llm_client::prompts::structured_system;
use crate::llm_client::{LlmError, ResponseSchema, StructuredLlm, StructuredOutput};
use crate::workflow::prompts::{fill, MARKUP_CONVERSION_PROMPT_TEMPLATE, MARKUP_ROLE};

pub const DEFAULT_PROGRAM: &str = "pdflatex";
const MAX_PASSES: u32 = 2;
const LOG_TAIL_CHARS: usize = 500;
const JOB_NAME: &str = "resume";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{0} not found; install a LaTeX distribution such as texlive")]
    CompilerMissing(String),

    #[error("render I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("LaTeX compilation failed after {passes} pass(es): {log_tail}")]
    CompileFailed { passes: u32, log_tail: String },

    #[error("markup conversion failed: {0}")]
    Conversion(#[from] LlmError),
}

// ────────────────────────────────────────────────────────────────────────────
// Markup conversion
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct LatexResponse {
    pub latex_content: String,
    #[serde(default)]
    pub template_used: String,
    #[serde(default)]
    pub compilation_notes: String,
}

impl StructuredOutput for LatexResponse {
    const SCHEMA: ResponseSchema = ResponseSchema::MarkupConversion;

    fn validate(&self) -> Result<(), String> {
        if !self.latex_content.contains(r"\begin{document}") {
            return Err("latex_content is not a complete document".to_string());
        }
        Ok(())
    }
}

pub struct MarkupConverter {
    llm: StructuredLlm,
    system: String,
}

impl MarkupConverter {
    pub fn new(llm: StructuredLlm) -> Self {
        Self {
            llm,
            system: structured_system(MARKUP_ROLE),
        }
    }

    pub async fn convert(&self, content: &str) -> Result<LatexResponse, LlmError> {
        let prompt = fill(MARKUP_CONVERSION_PROMPT_TEMPLATE, &[("enhanced_content", content)]);
        let response: LatexResponse = self.llm.complete(&self.system, &prompt).await?;
        info!(
            "Markup conversion produced {} chars (template: {})",
            response.latex_content.len(),
            response.template_used
        );
        Ok(response)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Compilation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassDecision {
    /// Run another pass.
    Continue,
    /// Read the PDF and stop.
    Accept,
    /// Stop and report the diagnostic tail.
    Fail,
}

/// Decides what follows compiler pass `pass` (1-based).
pub fn assess_pass(pass: u32, succeeded: bool, pdf_exists: bool) -> PassDecision {
    let last = pass >= MAX_PASSES;
    match (succeeded, pdf_exists) {
        (true, _) if !last => PassDecision::Continue,
        (true, true) => PassDecision::Accept,
        (false, true) => PassDecision::Accept,
        (_, false) if !last => PassDecision::Continue,
        (_, false) => PassDecision::Fail,
    }
}

#[derive(Debug, Clone)]
pub struct LatexRenderer {
    program: String,
}

impl LatexRenderer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub async fn is_available(&self) -> bool {
        match Command::new(&self.program).arg("--version").output().await {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }

    pub async fn render(&self, markup: &str) -> Result<Bytes, RenderError> {
        let dir = tempfile::tempdir()?;
        let tex = dir.path().join(format!("{JOB_NAME}.tex"));
        let pdf = dir.path().join(format!("{JOB_NAME}.pdf"));
        tokio::fs::write(&tex, markup).await?;

        for pass in 1..=MAX_PASSES {
            let output = self.run_pass(dir.path(), &tex).await?;
            let succeeded = output.status.success();
            let pdf_exists = tokio::fs::try_exists(&pdf).await.unwrap_or(false);

            if !succeeded {
                warn!(
                    "{} pass {pass} exited with {} (pdf produced: {pdf_exists})",
                    self.program, output.status
                );
            }

            match assess_pass(pass, succeeded, pdf_exists) {
                PassDecision::Continue => continue,
                PassDecision::Accept => {
                    let bytes = tokio::fs::read(&pdf).await?;
                    info!("Rendered PDF ({} bytes) after {pass} pass(es)", bytes.len());
                    return Ok(Bytes::from(bytes));
                }
                PassDecision::Fail => {
                    let log = dir.path().join(format!("{JOB_NAME}.log"));
                    return Err(RenderError::CompileFailed {
                        passes: pass,
                        log_tail: diagnostic_tail(&log, &output).await,
                    });
                }
            }
        }

        Err(RenderError::CompileFailed {
            passes: MAX_PASSES,
            log_tail: "no output produced".to_string(),
        })
    }

    async fn run_pass(&self, dir: &Path, tex: &Path) -> Result<Output, RenderError> {
        debug!("Running {} on {}", self.program, tex.display());
        Command::new(&self.program)
            .arg("-interaction=nonstopmode")
            .arg("-output-directory")
            .arg(dir)
            .arg(tex)
            .current_dir(dir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => RenderError::CompilerMissing(self.program.clone()),
                _ => RenderError::Io(e),
            })
    }
}

/// Tail of the compiler log, else of stderr, else of stdout.
async fn diagnostic_tail(log: &Path, output: &Output) -> String {
    if let Ok(bytes) = tokio::fs::read(log).await {
        return tail_chars(&String::from_utf8_lossy(&bytes), LOG_TAIL_CHARS);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let text = if !stderr.trim().is_empty() {
        stderr
    } else if !stdout.trim().is_empty() {
        stdout
    } else {
        return "Unknown LaTeX error".to_string();
    };
    tail_chars(&text, LOG_TAIL_CHARS)
}

fn tail_chars(text: &str, n: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(n)).collect()
}
