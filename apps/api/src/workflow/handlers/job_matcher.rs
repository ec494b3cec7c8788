//! Job matcher: scores a resume against a job description and proposes
//! section-level replacements.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::Deserialize;

use crate::document::parser::{heading_section, INITIAL_SECTION};
use crate::llm_client::prompts::structured_system;
use crate::llm_client::{ResponseSchema, StructuredLlm, StructuredOutput};
use crate::workflow::handlers::{
    bullets, Handler, HandlerCompletionError, HandlerInput, HandlerOutcome, StateUpdates,
};
use crate::workflow::prompts::{fill, JOB_MATCHING_PROMPT_TEMPLATE, JOB_MATCHING_ROLE};
use crate::workflow::state::Intent;

#[derive(Debug, Clone, Deserialize)]
pub struct JobMatchingResponse {
    pub match_score: u32,
    pub key_strengths: Vec<String>,
    pub skill_gaps: Vec<String>,
    #[serde(default)]
    pub optimized_sections: BTreeMap<String, String>,
    pub recommendations: Vec<String>,
}

impl StructuredOutput for JobMatchingResponse {
    const SCHEMA: ResponseSchema = ResponseSchema::JobMatching;

    fn validate(&self) -> Result<(), String> {
        if self.match_score > 100 {
            return Err(format!("match_score {} outside [0, 100]", self.match_score));
        }
        Ok(())
    }
}

pub struct JobMatcher {
    llm: StructuredLlm,
    system: String,
}

impl JobMatcher {
    pub fn new(llm: StructuredLlm) -> Self {
        Self {
            llm,
            system: structured_system(JOB_MATCHING_ROLE),
        }
    }
}

#[async_trait]
impl Handler for JobMatcher {
    fn name(&self) -> &'static str {
        "job_matcher"
    }

    fn intent(&self) -> Intent {
        Intent::JobMatching
    }

    fn activity(&self) -> &'static str {
        "matching your resume to the job description"
    }

    async fn handle(&self, input: HandlerInput<'_>) -> Result<HandlerOutcome, HandlerCompletionError> {
        let job_description = input
            .context
            .as_job_match()
            .map(|c| c.job_description.as_str())
            .unwrap_or(input.query);

        let prompt = fill(
            JOB_MATCHING_PROMPT_TEMPLATE,
            &[
                ("resume_content", input.document),
                ("job_description", job_description),
                ("user_query", input.query),
            ],
        );

        let response: JobMatchingResponse = self.llm.complete(&self.system, &prompt).await?;
        Ok(render_outcome(input.document, &response))
    }
}

fn render_outcome(document: &str, response: &JobMatchingResponse) -> HandlerOutcome {
    let mut report = format!(
        "Match Score: {}%\n\nKey Strengths:\n{}\n\nSkill Gaps:\n{}",
        response.match_score,
        bullets(&response.key_strengths),
        bullets(&response.skill_gaps),
    );

    if !response.optimized_sections.is_empty() {
        report.push_str("\n\nOptimized Sections:");
        for (section, text) in &response.optimized_sections {
            report.push_str(&format!("\n[{}]\n{}", section, text.trim()));
        }
    }

    report.push_str(&format!(
        "\n\nRecommendations:\n{}",
        bullets(&response.recommendations)
    ));

    let mut updates = StateUpdates::default();
    if !response.optimized_sections.is_empty() {
        let optimized = reconstruct(document, &response.optimized_sections);
        if !same_text(&optimized, document) {
            report.push_str(&format!(
                "\n\n=== Optimized Resume ===\n{optimized}\n=== End Optimized Resume ==="
            ));
            updates.new_document = Some(optimized);
        }
    }

    HandlerOutcome::reply(report, updates)
}

/// Splices `replacements` into the document by section position. Heading
/// lines and every section without a replacement are kept as written. A
/// replaced section's body is swapped at its first occurrence; replacements
/// for sections the document lacks are appended.
pub fn reconstruct(document: &str, replacements: &BTreeMap<String, String>) -> String {
    let replacements: BTreeMap<String, &str> = replacements
        .iter()
        .map(|(name, text)| (name.trim().to_lowercase(), text.trim()))
        .filter(|(_, text)| !text.is_empty())
        .collect();
    let mut placed: BTreeSet<&str> = BTreeSet::new();
    let mut out: Vec<String> = Vec::new();
    let mut current = INITIAL_SECTION;

    for line in document.lines() {
        let heading = heading_section(line);
        if let Some(section) = heading {
            current = section;
            out.push(line.to_string());
        }

        let Some((name, text)) = replacements.get_key_value(current) else {
            if heading.is_none() {
                out.push(line.to_string());
            }
            continue;
        };
        if placed.insert(name.as_str()) {
            out.extend(text.lines().map(str::to_string));
        }
    }

    for (name, text) in &replacements {
        if !placed.contains(name.as_str()) {
            out.push(String::new());
            out.push(name.to_uppercase());
            out.extend(text.lines().map(str::to_string));
        }
    }
    out.join("\n").trim().to_string()
}

/// Line-level equality ignoring blank lines and trailing whitespace.
fn same_text(a: &str, b: &str) -> bool {
    let lines = |s: &str| -> Vec<String> {
        s.lines()
            .map(str::trim_end)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    };
    lines(a) == lines(b)
}
