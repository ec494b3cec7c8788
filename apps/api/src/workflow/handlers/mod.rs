//! Handler agents, one per intent.
//!
//! Every handler follows the same failure policy: a backend failure inside
//! `handle` never escapes `respond`. It becomes a degraded, user-facing reply
//! carrying the failure reason, and the turn completes normally.

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::llm_client::LlmError;
use crate::workflow::state::{Context, Intent};

pub mod enhancer;
pub mod job_matcher;
pub mod researcher;
pub mod translator;

pub use enhancer::Enhancer;
pub use job_matcher::JobMatcher;
pub use researcher::CompanyResearcher;
pub use translator::Translator;

#[derive(Debug, Error)]
pub enum HandlerCompletionError {
    #[error("{0}")]
    Backend(#[from] LlmError),

    #[error("invalid output: {0}")]
    InvalidOutput(String),
}

#[derive(Debug, Clone, Copy)]
pub struct HandlerInput<'a> {
    pub document: &'a str,
    pub context: &'a Context,
    pub query: &'a str,
}

/// State changes a handler asks the engine to apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdates {
    /// Full replacement document, appended as a new version.
    pub new_document: Option<String>,
    /// Replacement context (same variant) enriched by the handler.
    pub context: Option<Context>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandlerOutcome {
    pub response: String,
    pub updates: StateUpdates,
    /// Failure reason when the reply is an apology.
    pub degraded: Option<String>,
}

impl HandlerOutcome {
    pub fn reply(response: String, updates: StateUpdates) -> Self {
        Self {
            response,
            updates,
            degraded: None,
        }
    }

    pub fn degraded(activity: &str, error: &HandlerCompletionError) -> Self {
        Self {
            response: format!(
                "I apologize, but I encountered an issue while {activity}. Error: {error}\n\n\
                Please try rephrasing your request or contact support if the issue persists."
            ),
            updates: StateUpdates::default(),
            degraded: Some(error.to_string()),
        }
    }
}

#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> &'static str;

    fn intent(&self) -> Intent;

    /// Present-participle phrase used in the apology, e.g. "enhancing your resume".
    fn activity(&self) -> &'static str;

    async fn handle(&self, input: HandlerInput<'_>) -> Result<HandlerOutcome, HandlerCompletionError>;

    /// Runs the handler under the shared fail-soft policy.
    async fn respond(&self, input: HandlerInput<'_>) -> HandlerOutcome {
        match self.handle(input).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Handler {} degraded: {e}", self.name());
                HandlerOutcome::degraded(self.activity(), &e)
            }
        }
    }
}

/// Renders a bullet list, one `• item` per line.
pub(crate) fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("• {}", i.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_reply_embeds_reason() {
        let err = HandlerCompletionError::Backend(LlmError::Timeout(std::time::Duration::from_secs(60)));
        let outcome = HandlerOutcome::degraded("enhancing your resume", &err);
        assert!(outcome.response.starts_with("I apologize"));
        assert!(outcome.response.contains("timed out after 60s"));
        assert_eq!(outcome.degraded.as_deref(), Some("LLM call timed out after 60s"));
        assert_eq!(outcome.updates, StateUpdates::default());
    }

    #[test]
    fn test_bullets_one_per_line() {
        let text = bullets(&["a".to_string(), " b ".to_string()]);
        assert_eq!(text, "• a\n• b");
    }
}
