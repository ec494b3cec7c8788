//! Intent classification.
//!
//! `LlmIntentClassifier` is the primary path: one structured completion
//! constrained to the intent schema. `classify_by_keywords` is the degraded
//! mode the engine falls back to when the model path fails.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::llm_client::prompts::structured_system;
use crate::llm_client::{LlmError, ResponseSchema, StructuredLlm, StructuredOutput};
use crate::workflow::context::LANGUAGE_KEYWORDS;
use crate::workflow::prompts::{fill, INTENT_PROMPT_TEMPLATE, INTENT_ROLE};
use crate::workflow::state::Intent;

/// Characters of the document included in the classification prompt.
const DOCUMENT_PREVIEW_CHARS: usize = 4000;

#[derive(Debug, Error)]
#[error("intent classification failed: {0}")]
pub struct ClassificationError(#[from] pub LlmError);

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    pub confidence: f64,
    pub reasoning: String,
}

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(
        &self,
        user_query: &str,
        document_content: &str,
    ) -> Result<Classification, ClassificationError>;
}

/// Raw structured output of the intent schema.
#[derive(Debug, Deserialize)]
pub struct IntentResponse {
    pub intent: String,
    pub confidence: f64,
    pub reasoning: String,
}

impl StructuredOutput for IntentResponse {
    const SCHEMA: ResponseSchema = ResponseSchema::Intent;

    fn validate(&self) -> Result<(), String> {
        self.intent.parse::<Intent>()?;
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!("confidence {} outside [0, 1]", self.confidence));
        }
        Ok(())
    }
}

impl TryFrom<IntentResponse> for Classification {
    type Error = LlmError;

    fn try_from(response: IntentResponse) -> Result<Self, Self::Error> {
        Ok(Classification {
            intent: response.intent.parse().map_err(LlmError::Validation)?,
            confidence: response.confidence,
            reasoning: response.reasoning,
        })
    }
}

pub struct LlmIntentClassifier {
    llm: StructuredLlm,
    system: String,
}

impl LlmIntentClassifier {
    pub fn new(llm: StructuredLlm) -> Self {
        Self {
            llm,
            system: structured_system(INTENT_ROLE),
        }
    }
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(
        &self,
        user_query: &str,
        document_content: &str,
    ) -> Result<Classification, ClassificationError> {
        let preview: String = document_content.chars().take(DOCUMENT_PREVIEW_CHARS).collect();
        let prompt = fill(
            INTENT_PROMPT_TEMPLATE,
            &[
                ("user_query", user_query),
                ("resume_content", preview.as_str()),
            ],
        );

        let response: IntentResponse = self.llm.complete(&self.system, &prompt).await?;
        Ok(Classification::try_from(response)?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Keyword heuristic
// ────────────────────────────────────────────────────────────────────────────

/// Keyword buckets in priority order.
const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (
        Intent::Translation,
        &["translate", "translation", "localize", "localise"],
    ),
    (
        Intent::JobMatching,
        &["job description", "match", "jd", "position", "requirements"],
    ),
    (
        Intent::CompanyResearch,
        &[
            "company",
            "google",
            "microsoft",
            "apple",
            "amazon",
            "meta",
            "netflix",
            "optimize for",
            "tailor for",
        ],
    ),
    (
        Intent::Enhancement,
        &["improve", "enhance", "better", "update", "fix", "polish", "rewrite"],
    ),
];

/// A word following "in", "into" or "to", matched against language names.
static LANGUAGE_TARGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:in|into|to)\s+(\w+)").expect("language target pattern is valid")
});

const KEYWORD_CONFIDENCE: f64 = 0.6;
const DEFAULT_CONFIDENCE: f64 = 0.3;

/// Deterministic keyword classification. Defaults to enhancement.
pub fn classify_by_keywords(user_query: &str) -> Classification {
    let lower = user_query.to_lowercase();
    if let Some(language) = target_language(&lower) {
        return Classification {
            intent: Intent::Translation,
            confidence: KEYWORD_CONFIDENCE,
            reasoning: format!("keyword heuristic matched target language '{language}'"),
        };
    }
    for (intent, keywords) in INTENT_KEYWORDS {
        if let Some(keyword) = keywords.iter().find(|k| lower.contains(*k)) {
            return Classification {
                intent: *intent,
                confidence: KEYWORD_CONFIDENCE,
                reasoning: format!("keyword heuristic matched '{keyword}'"),
            };
        }
    }
    Classification {
        intent: Intent::Enhancement,
        confidence: DEFAULT_CONFIDENCE,
        reasoning: "keyword heuristic found no indicator; defaulting to enhancement".to_string(),
    }
}

/// Language named right after a preposition, e.g. "in German" or "to français".
fn target_language(lower: &str) -> Option<&'static str> {
    LANGUAGE_TARGET.captures_iter(lower).find_map(|caps| {
        let word = caps.get(1)?.as_str();
        LANGUAGE_KEYWORDS
            .iter()
            .find(|(_, names)| names.contains(&word))
            .map(|(language, _)| *language)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{Reply, ScriptedBackend};
    use serde_json::json;

    const CORPUS: &[(&str, Intent)] = &[
        ("job description: Must know Python and AWS", Intent::JobMatching),
        ("How do I match this position?", Intent::JobMatching),
        ("Optimize my resume for Google", Intent::CompanyResearch),
        ("What does this company look for?", Intent::CompanyResearch),
        ("Please enhance my resume overall", Intent::Enhancement),
        ("Fix the wording in my summary", Intent::Enhancement),
        ("Translate my resume to French", Intent::Translation),
        ("Can you localize this for Germany?", Intent::Translation),
        ("Put my resume in German", Intent::Translation),
        ("Rewrite it into español please", Intent::Translation),
    ];

    #[test]
    fn test_keyword_corpus_classifies_each_intent() {
        for (query, expected) in CORPUS {
            let c = classify_by_keywords(query);
            assert_eq!(c.intent, *expected, "query: {query}");
            assert!(c.confidence > 0.0);
        }
    }

    #[test]
    fn test_language_target_needs_a_language_name() {
        assert_eq!(target_language("put my resume in german"), Some("german"));
        assert_eq!(target_language("improve my skills in python"), None);
        assert_eq!(target_language("tailor it for jobs in germany"), None);
        assert_eq!(
            classify_by_keywords("Improve my skills in Python").intent,
            Intent::Enhancement
        );
    }

    #[test]
    fn test_keyword_default_is_enhancement_with_low_confidence() {
        let c = classify_by_keywords("hello there");
        assert_eq!(c.intent, Intent::Enhancement);
        assert!(c.confidence > 0.0 && c.confidence < KEYWORD_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_llm_classifier_accepts_valid_output() {
        let llm = ScriptedBackend::new()
            .reply(
                ResponseSchema::Intent,
                json!({"intent": "translation", "confidence": 0.93, "reasoning": "asks for French"}),
            )
            .into_llm();
        let c = LlmIntentClassifier::new(llm)
            .classify("Translate my resume to French", "JANE DOE")
            .await
            .unwrap();
        assert_eq!(c.intent, Intent::Translation);
        assert!((c.confidence - 0.93).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_llm_classifier_rejects_unknown_intent() {
        let llm = ScriptedBackend::new()
            .reply(
                ResponseSchema::Intent,
                json!({"intent": "cover_letter", "confidence": 0.9, "reasoning": "x"}),
            )
            .into_llm();
        let err = LlmIntentClassifier::new(llm).classify("q", "d").await.unwrap_err();
        assert!(matches!(err.0, LlmError::Validation(_)));
    }

    #[tokio::test]
    async fn test_llm_classifier_rejects_out_of_range_confidence() {
        let llm = ScriptedBackend::new()
            .reply(
                ResponseSchema::Intent,
                json!({"intent": "enhancement", "confidence": 1.7, "reasoning": "x"}),
            )
            .into_llm();
        let err = LlmIntentClassifier::new(llm).classify("q", "d").await.unwrap_err();
        assert!(matches!(err.0, LlmError::Validation(_)));
    }

    #[tokio::test]
    async fn test_llm_classifier_surfaces_transport_failure() {
        let llm = ScriptedBackend::new()
            .reply_raw(ResponseSchema::Intent, Reply::Fail("overloaded".into()))
            .into_llm();
        let err = LlmIntentClassifier::new(llm).classify("q", "d").await.unwrap_err();
        assert!(matches!(err.0, LlmError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_llm_classifier_prompt_carries_query() {
        let backend = std::sync::Arc::new(ScriptedBackend::new().reply(
            ResponseSchema::Intent,
            json!({"intent": "enhancement", "confidence": 0.5, "reasoning": "x"}),
        ));
        let llm = StructuredLlm::new(backend.clone(), std::time::Duration::from_secs(5));
        LlmIntentClassifier::new(llm)
            .classify("Polish my summary", "JANE DOE resume")
            .await
            .unwrap();
        let prompts = backend.prompts_for(ResponseSchema::Intent);
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Polish my summary"));
        assert!(prompts[0].contains("JANE DOE resume"));
    }
}
