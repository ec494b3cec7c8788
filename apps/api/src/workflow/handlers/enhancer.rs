use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::llm_client::prompts::{structured_system, FULL_DOCUMENT_INSTRUCTION};
use crate::llm_client::{ResponseSchema, StructuredLlm, StructuredOutput};
use crate::workflow::context::DEFAULT_SECTION;
use crate::workflow::handlers::{
    bullets, Handler, HandlerCompletionError, HandlerInput, HandlerOutcome, StateUpdates,
};
use crate::workflow::prompts::{fill, ENHANCEMENT_PROMPT_TEMPLATE, ENHANCEMENT_ROLE};
use crate::workflow::state::Intent;

#[derive(Debug, Clone, Deserialize)]
pub struct EnhancementResponse {
    #[serde(default)]
    pub enhanced_content: String,
    pub changes_made: Vec<String>,
    pub impact_score: u8,
    pub suggestions: Vec<String>,
}

impl StructuredOutput for EnhancementResponse {
    const SCHEMA: ResponseSchema = ResponseSchema::Enhancement;

    fn validate(&self) -> Result<(), String> {
        if self.enhanced_content.trim().is_empty() {
            return Err("missing enhanced_content".to_string());
        }
        if !(1..=10).contains(&self.impact_score) {
            return Err(format!("impact_score {} outside [1, 10]", self.impact_score));
        }
        Ok(())
    }
}

pub struct Enhancer {
    llm: StructuredLlm,
    system: String,
}

impl Enhancer {
    pub fn new(llm: StructuredLlm) -> Self {
        Self {
            llm,
            system: structured_system(ENHANCEMENT_ROLE),
        }
    }
}

#[async_trait]
impl Handler for Enhancer {
    fn name(&self) -> &'static str {
        "enhancer"
    }

    fn intent(&self) -> Intent {
        Intent::Enhancement
    }

    fn activity(&self) -> &'static str {
        "enhancing your resume"
    }

    async fn handle(&self, input: HandlerInput<'_>) -> Result<HandlerOutcome, HandlerCompletionError> {
        let target_section = input
            .context
            .as_section()
            .map(|c| c.target_section.as_str())
            .unwrap_or(DEFAULT_SECTION);

        let prompt = fill(
            ENHANCEMENT_PROMPT_TEMPLATE,
            &[
                ("resume_content", input.document),
                ("user_query", input.query),
                ("target_section", target_section),
                ("full_document_instruction", FULL_DOCUMENT_INSTRUCTION),
            ],
        );

        let response: EnhancementResponse = self.llm.complete(&self.system, &prompt).await?;

        if !(3..=5).contains(&response.changes_made.len())
            || !(4..=6).contains(&response.suggestions.len())
        {
            warn!(
                "Enhancement returned {} changes / {} suggestions (expected 3-5 / 4-6)",
                response.changes_made.len(),
                response.suggestions.len()
            );
        }

        let enhanced = response.enhanced_content.trim().to_string();
        let text = format!(
            "Enhanced Content:\n{}\n\nChanges Made:\n{}\n\nImpact Score: {}/10\n\nSuggestions:\n{}",
            enhanced,
            bullets(&response.changes_made),
            response.impact_score,
            bullets(&response.suggestions),
        );

        Ok(HandlerOutcome::reply(
            text,
            StateUpdates {
                new_document: Some(enhanced),
                context: None,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{Reply, ScriptedBackend};
    use crate::workflow::state::{Context, SectionContext};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn general() -> Context {
        Context::Enhancement(SectionContext {
            target_section: "general".into(),
        })
    }

    fn valid_reply() -> serde_json::Value {
        json!({
            "enhanced_content": "JANE DOE\nLed migration of 40 services to Kubernetes",
            "changes_made": ["Added metrics", "Stronger verbs", "Reordered skills"],
            "impact_score": 7,
            "suggestions": ["Add links", "Add certifications", "Quantify more", "Tailor keywords"]
        })
    }

    #[tokio::test]
    async fn test_enhancement_renders_all_sections() {
        let llm = ScriptedBackend::new()
            .reply(ResponseSchema::Enhancement, valid_reply())
            .into_llm();
        let ctx = general();
        let outcome = Enhancer::new(llm)
            .respond(HandlerInput {
                document: "JANE DOE\nWorked on Kubernetes",
                context: &ctx,
                query: "Please enhance my resume overall",
            })
            .await;

        assert!(outcome.response.starts_with("Enhanced Content:\nJANE DOE"));
        assert!(outcome.response.contains("Impact Score: 7/10"));
        assert!(outcome.response.contains("• Stronger verbs"));
        assert_eq!(
            outcome.updates.new_document.as_deref(),
            Some("JANE DOE\nLed migration of 40 services to Kubernetes")
        );
    }

    #[tokio::test]
    async fn test_empty_enhanced_content_degrades() {
        let mut reply = valid_reply();
        reply["enhanced_content"] = json!("  ");
        let llm = ScriptedBackend::new()
            .reply(ResponseSchema::Enhancement, reply)
            .into_llm();
        let ctx = general();
        let outcome = Enhancer::new(llm)
            .respond(HandlerInput {
                document: "doc",
                context: &ctx,
                query: "q",
            })
            .await;
        assert!(outcome.response.contains("I apologize"));
        assert!(outcome.response.contains("missing enhanced_content"));
        assert!(outcome.updates.new_document.is_none());
    }

    #[tokio::test]
    async fn test_missing_enhanced_content_field_degrades() {
        let mut reply = valid_reply();
        reply.as_object_mut().unwrap().remove("enhanced_content");
        let llm = ScriptedBackend::new()
            .reply(ResponseSchema::Enhancement, reply)
            .into_llm();
        let ctx = general();
        let outcome = Enhancer::new(llm)
            .respond(HandlerInput {
                document: "doc",
                context: &ctx,
                query: "q",
            })
            .await;
        assert!(outcome.degraded.unwrap().contains("missing enhanced_content"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_timeout_degrades_with_reason() {
        let backend = ScriptedBackend::new().reply_raw(
            ResponseSchema::Enhancement,
            Reply::Delay(Duration::from_secs(120), valid_reply().to_string()),
        );
        let llm = StructuredLlm::new(Arc::new(backend), Duration::from_secs(30));
        let ctx = general();
        let outcome = Enhancer::new(llm)
            .respond(HandlerInput {
                document: "doc",
                context: &ctx,
                query: "q",
            })
            .await;
        assert!(outcome.response.starts_with("I apologize"));
        assert!(outcome.response.contains("timed out after 30s"));
    }

    #[tokio::test]
    async fn test_prompt_uses_section_from_context() {
        let backend = Arc::new(ScriptedBackend::new().reply(ResponseSchema::Enhancement, valid_reply()));
        let llm = StructuredLlm::new(backend.clone(), Duration::from_secs(5));
        let ctx = Context::Enhancement(SectionContext {
            target_section: "skills".into(),
        });
        Enhancer::new(llm)
            .respond(HandlerInput {
                document: "doc",
                context: &ctx,
                query: "q",
            })
            .await;
        let prompt = &backend.prompts_for(ResponseSchema::Enhancement)[0];
        assert!(prompt.contains("TARGET SECTION: skills"));
        assert!(prompt.contains("COMPLETE document"));
    }

    #[tokio::test]
    async fn test_placeholder_text_in_document_is_sent_verbatim() {
        let backend = Arc::new(ScriptedBackend::new().reply(ResponseSchema::Enhancement, valid_reply()));
        let llm = StructuredLlm::new(backend.clone(), Duration::from_secs(5));
        let ctx = Context::Enhancement(SectionContext {
            target_section: "skills".into(),
        });
        Enhancer::new(llm)
            .respond(HandlerInput {
                document: "Template notes: {target_section} and {user_query}",
                context: &ctx,
                query: "q",
            })
            .await;
        let prompt = &backend.prompts_for(ResponseSchema::Enhancement)[0];
        assert!(prompt.contains("Template notes: {target_section} and {user_query}"));
        assert!(prompt.contains("TARGET SECTION: skills"));
    }
}
