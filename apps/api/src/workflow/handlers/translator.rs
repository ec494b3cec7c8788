use async_trait::async_trait;
use serde::Deserialize;

use crate::llm_client::prompts::{structured_system, FULL_DOCUMENT_INSTRUCTION};
use crate::llm_client::{ResponseSchema, StructuredLlm, StructuredOutput};
use crate::workflow::context::DEFAULT_LANGUAGE;
use crate::workflow::handlers::{
    bullets, Handler, HandlerCompletionError, HandlerInput, HandlerOutcome, StateUpdates,
};
use crate::workflow::prompts::{fill, TRANSLATION_PROMPT_TEMPLATE, TRANSLATION_ROLE};
use crate::workflow::state::Intent;

/// Cultural conventions applied when translating into a language.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LanguageProfile {
    pub key: &'static str,
    pub display_name: &'static str,
    pub register: &'static str,
    pub personal_data: &'static str,
    pub keep_untranslated: &'static [&'static str],
}

const COMMON_TECH_TERMS: &[&str] = &[
    "API", "backend", "frontend", "DevOps", "CI/CD", "cloud", "machine learning", "Scrum",
];

pub const LANGUAGE_PROFILES: &[LanguageProfile] = &[
    LanguageProfile {
        key: "spanish",
        display_name: "Spanish",
        register: "formal (usted); nominal style for achievements",
        personal_data: "name, city, phone, email; a photo and date of birth are optional, omit unless present",
        keep_untranslated: COMMON_TECH_TERMS,
    },
    LanguageProfile {
        key: "french",
        display_name: "French",
        register: "formal (vous); infinitive or past participle bullet style",
        personal_data: "name, city, phone, email; omit age, marital status and photo",
        keep_untranslated: COMMON_TECH_TERMS,
    },
    LanguageProfile {
        key: "german",
        display_name: "German",
        register: "formal (Sie); factual, understated tone",
        personal_data: "Lebenslauf conventions: full address and contact details first; keep dates in MM/YYYY",
        keep_untranslated: COMMON_TECH_TERMS,
    },
    LanguageProfile {
        key: "portuguese",
        display_name: "Portuguese",
        register: "formal; third-person achievement statements",
        personal_data: "name, city, phone, email; nationality only if already present",
        keep_untranslated: COMMON_TECH_TERMS,
    },
    LanguageProfile {
        key: "italian",
        display_name: "Italian",
        register: "formal (Lei); descriptive noun phrases",
        personal_data: "name, city, phone, email; keep any data-processing consent line if present",
        keep_untranslated: COMMON_TECH_TERMS,
    },
    LanguageProfile {
        key: "dutch",
        display_name: "Dutch",
        register: "direct and concise; moderate formality",
        personal_data: "name, city, phone, email; omit date of birth unless present",
        keep_untranslated: COMMON_TECH_TERMS,
    },
    LanguageProfile {
        key: "chinese",
        display_name: "Simplified Chinese",
        register: "formal written register (书面语)",
        personal_data: "name, phone, email and city in a header block; education may precede experience",
        keep_untranslated: COMMON_TECH_TERMS,
    },
    LanguageProfile {
        key: "japanese",
        display_name: "Japanese",
        register: "polite formal register (です/ます調)",
        personal_data: "rirekisho-style header: name, contact details; dates in YYYY年MM月",
        keep_untranslated: COMMON_TECH_TERMS,
    },
];

/// Profile for `language`, falling back to the default language.
pub fn language_profile(language: &str) -> &'static LanguageProfile {
    let lookup = |key: &str| LANGUAGE_PROFILES.iter().find(|p| p.key == key);
    lookup(&language.to_lowercase())
        .or_else(|| lookup(DEFAULT_LANGUAGE))
        .unwrap_or(&LANGUAGE_PROFILES[0])
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationResponse {
    #[serde(default)]
    pub translated_content: String,
    #[serde(default)]
    pub cultural_adaptations: Vec<String>,
    #[serde(default)]
    pub untranslated_terms: Vec<String>,
}

impl StructuredOutput for TranslationResponse {
    const SCHEMA: ResponseSchema = ResponseSchema::Translation;

    fn validate(&self) -> Result<(), String> {
        if self.translated_content.trim().is_empty() {
            return Err("missing translated_content".to_string());
        }
        Ok(())
    }
}

pub struct Translator {
    llm: StructuredLlm,
    system: String,
}

impl Translator {
    pub fn new(llm: StructuredLlm) -> Self {
        Self {
            llm,
            system: structured_system(TRANSLATION_ROLE),
        }
    }
}

#[async_trait]
impl Handler for Translator {
    fn name(&self) -> &'static str {
        "translator"
    }

    fn intent(&self) -> Intent {
        Intent::Translation
    }

    fn activity(&self) -> &'static str {
        "translating your resume"
    }

    async fn handle(&self, input: HandlerInput<'_>) -> Result<HandlerOutcome, HandlerCompletionError> {
        let language = input
            .context
            .as_translation()
            .map(|c| c.target_language.as_str())
            .unwrap_or(DEFAULT_LANGUAGE);
        let profile = language_profile(language);

        let prompt = fill(
            TRANSLATION_PROMPT_TEMPLATE,
            &[
                ("language", profile.display_name),
                ("register", profile.register),
                ("personal_data", profile.personal_data),
                ("keep_terms", profile.keep_untranslated.join(", ").as_str()),
                ("resume_content", input.document),
                ("user_query", input.query),
                ("full_document_instruction", FULL_DOCUMENT_INSTRUCTION),
            ],
        );

        let response: TranslationResponse = self.llm.complete(&self.system, &prompt).await?;

        let translated = response.translated_content.trim().to_string();
        let mut text = format!("Translated Resume ({}):\n{}", profile.display_name, translated);
        if !response.cultural_adaptations.is_empty() {
            text.push_str(&format!(
                "\n\nCultural Adaptations:\n{}",
                bullets(&response.cultural_adaptations)
            ));
        }
        if !response.untranslated_terms.is_empty() {
            text.push_str(&format!(
                "\n\nKept in English: {}",
                response.untranslated_terms.join(", ")
            ));
        }

        Ok(HandlerOutcome::reply(
            text,
            StateUpdates {
                new_document: Some(translated),
                context: None,
            },
        ))
    }
}
