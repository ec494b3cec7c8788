//! Company researcher: tailors the resume to a named company.
//!
//! Insights are optionally grounded with a web search. Once stored in the
//! context they are reused by later turns about the same company, and the
//! search is skipped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::llm_client::prompts::{structured_system, FULL_DOCUMENT_INSTRUCTION};
use crate::llm_client::search::{format_hits, SearchTool};
use crate::llm_client::{ResponseSchema, StructuredLlm, StructuredOutput};
use crate::workflow::context::DEFAULT_COMPANY;
use crate::workflow::handlers::{
    bullets, Handler, HandlerCompletionError, HandlerInput, HandlerOutcome, StateUpdates,
};
use crate::workflow::prompts::{fill, RESEARCH_PROMPT_TEMPLATE, RESEARCH_ROLE};
use crate::workflow::state::{CompanyContext, CompanyInsights, Context, Intent};

const MIN_ALIGNMENTS: usize = 4;

#[derive(Debug, Clone, Deserialize)]
pub struct ResearchResponse {
    pub company_insights: CompanyInsights,
    pub optimization_strategy: String,
    #[serde(default)]
    pub optimized_content: String,
    pub key_alignments: Vec<String>,
}

impl StructuredOutput for ResearchResponse {
    const SCHEMA: ResponseSchema = ResponseSchema::Research;

    fn validate(&self) -> Result<(), String> {
        if self.key_alignments.len() < MIN_ALIGNMENTS {
            return Err(format!(
                "key_alignments has {} items (need at least {MIN_ALIGNMENTS})",
                self.key_alignments.len()
            ));
        }
        Ok(())
    }
}

pub struct CompanyResearcher {
    llm: StructuredLlm,
    search: Option<Arc<dyn SearchTool>>,
    search_timeout: Duration,
    system: String,
}

impl CompanyResearcher {
    pub fn new(llm: StructuredLlm) -> Self {
        Self {
            llm,
            search: None,
            search_timeout: Duration::from_secs(15),
            system: structured_system(RESEARCH_ROLE),
        }
    }

    pub fn with_search(mut self, search: Arc<dyn SearchTool>, timeout: Duration) -> Self {
        self.search = Some(search);
        self.search_timeout = timeout;
        self
    }

    /// Known insights first, then a bounded web search. Search failures are
    /// logged and leave the notes empty.
    async fn research_notes(&self, company: &CompanyContext) -> String {
        if let Some(insights) = &company.insights {
            return format!(
                "Previously gathered insights for {}:\n- Culture: {}\n- Tech stack: {}\n- Values: {}\n- Hiring focus: {}",
                company.company_name,
                insights.culture,
                insights.tech_stack,
                insights.values,
                insights.hiring_focus
            );
        }

        let Some(search) = &self.search else {
            return String::new();
        };
        if company.company_name == DEFAULT_COMPANY {
            return String::new();
        }

        let query = format!(
            "{} company culture values tech stack hiring",
            company.company_name
        );
        match tokio::time::timeout(self.search_timeout, search.search(&query)).await {
            Ok(Ok(hits)) => {
                info!("Web search returned {} results for {}", hits.len(), company.company_name);
                format_hits(&hits)
            }
            Ok(Err(e)) => {
                warn!("Web search failed for {}: {e}", company.company_name);
                String::new()
            }
            Err(_) => {
                warn!(
                    "Web search for {} timed out after {}s",
                    company.company_name,
                    self.search_timeout.as_secs()
                );
                String::new()
            }
        }
    }
}

#[async_trait]
impl Handler for CompanyResearcher {
    fn name(&self) -> &'static str {
        "researcher"
    }

    fn intent(&self) -> Intent {
        Intent::CompanyResearch
    }

    fn activity(&self) -> &'static str {
        "researching the company"
    }

    async fn handle(&self, input: HandlerInput<'_>) -> Result<HandlerOutcome, HandlerCompletionError> {
        let company = input.context.as_company().cloned().unwrap_or(CompanyContext {
            company_name: DEFAULT_COMPANY.to_string(),
            insights: None,
        });

        let notes = self.research_notes(&company).await;
        let prompt = fill(
            RESEARCH_PROMPT_TEMPLATE,
            &[
                ("company_name", company.company_name.as_str()),
                ("resume_content", input.document),
                ("user_query", input.query),
                ("research_notes", notes.as_str()),
                ("full_document_instruction", FULL_DOCUMENT_INSTRUCTION),
            ],
        );

        let response: ResearchResponse = self.llm.complete(&self.system, &prompt).await?;
        Ok(render_outcome(company, response))
    }
}

fn render_outcome(company: CompanyContext, response: ResearchResponse) -> HandlerOutcome {
    let insights = &response.company_insights;
    let mut text = format!(
        "Company Insights ({}):\n• Culture: {}\n• Tech Stack: {}\n• Values: {}\n• Hiring Focus: {}\n\n\
        Optimization Strategy:\n{}\n\nKey Alignments:\n{}",
        company.company_name,
        insights.culture,
        insights.tech_stack,
        insights.values,
        insights.hiring_focus,
        response.optimization_strategy.trim(),
        bullets(&response.key_alignments),
    );

    let optimized = response.optimized_content.trim().to_string();
    let new_document = if optimized.is_empty() {
        None
    } else {
        text.push_str(&format!("\n\nOptimized Resume:\n{optimized}"));
        Some(optimized)
    };

    HandlerOutcome::reply(
        text,
        StateUpdates {
            new_document,
            context: Some(Context::CompanyResearch(CompanyContext {
                company_name: company.company_name,
                insights: Some(response.company_insights),
            })),
        },
    )
}
