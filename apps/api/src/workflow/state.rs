//! Session state carried across turns of one thread.
//!
//! The message log and version history are append-only from the engine's
//! point of view. Only `RetentionPolicy::compact` (an explicit maintenance
//! call) ever removes entries.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Intent
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    JobMatching,
    Enhancement,
    CompanyResearch,
    Translation,
}

impl Intent {
    pub const ALL: [Intent; 4] = [
        Intent::JobMatching,
        Intent::Enhancement,
        Intent::CompanyResearch,
        Intent::Translation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::JobMatching => "job_matching",
            Intent::Enhancement => "enhancement",
            Intent::CompanyResearch => "company_research",
            Intent::Translation => "translation",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Intent::ALL
            .into_iter()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| format!("unknown intent '{s}'"))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Context, one variant per intent
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMatchContext {
    pub job_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionContext {
    pub target_section: String,
}

/// Research findings about a company, kept for later turns about the same company.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyInsights {
    #[serde(default)]
    pub culture: String,
    #[serde(default)]
    pub tech_stack: String,
    #[serde(default)]
    pub values: String,
    #[serde(default)]
    pub hiring_focus: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyContext {
    pub company_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<CompanyInsights>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationContext {
    pub target_language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Context {
    JobMatching(JobMatchContext),
    Enhancement(SectionContext),
    CompanyResearch(CompanyContext),
    Translation(TranslationContext),
}

impl Context {
    /// The intent this context belongs to. The pair can never disagree.
    pub fn intent(&self) -> Intent {
        match self {
            Context::JobMatching(_) => Intent::JobMatching,
            Context::Enhancement(_) => Intent::Enhancement,
            Context::CompanyResearch(_) => Intent::CompanyResearch,
            Context::Translation(_) => Intent::Translation,
        }
    }

    pub fn as_job_match(&self) -> Option<&JobMatchContext> {
        match self {
            Context::JobMatching(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_section(&self) -> Option<&SectionContext> {
        match self {
            Context::Enhancement(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_company(&self) -> Option<&CompanyContext> {
        match self {
            Context::CompanyResearch(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_translation(&self) -> Option<&TranslationContext> {
        match self {
            Context::Translation(c) => Some(c),
            _ => None,
        }
    }

    /// Fills in insights already gathered for this company in the session.
    pub fn carry_over(mut self, known: &BTreeMap<String, CompanyInsights>) -> Self {
        if let Context::CompanyResearch(current) = &mut self {
            if current.insights.is_none() {
                current.insights = known.get(&company_key(&current.company_name)).cloned();
            }
        }
        self
    }
}

/// Lookup key for the per-session insight cache.
pub fn company_key(company_name: &str) -> String {
    company_name.trim().to_lowercase()
}

// ────────────────────────────────────────────────────────────────────────────
// Messages and document versions
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    System,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            intent: None,
        }
    }

    pub fn system(content: impl Into<String>, intent: Intent) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            intent: Some(intent),
        }
    }

    pub fn assistant(content: impl Into<String>, intent: Intent) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            intent: Some(intent),
        }
    }
}

/// Who produced a document version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    User,
    Agent(Intent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub version: u32,
    pub content: String,
    pub source: VersionSource,
    pub created_at: DateTime<Utc>,
}

// ────────────────────────────────────────────────────────────────────────────
// Session state
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub messages: Vec<Message>,
    pub document_content: String,
    pub document_versions: Vec<DocumentVersion>,
    /// Current intent is `context.intent()`; storing them as one field keeps
    /// the two set together.
    pub context: Option<Context>,
    /// Research findings keyed by `company_key`, kept across turns of any intent.
    #[serde(default)]
    pub company_insights: BTreeMap<String, CompanyInsights>,
    pub last_response: String,
    pub last_query: String,
    pub turn_count: u64,
}

impl SessionState {
    pub fn current_intent(&self) -> Option<Intent> {
        self.context.as_ref().map(Context::intent)
    }

    /// Records the incoming query. A supplied document that differs from the
    /// current one becomes the working document and a new `User` version.
    pub fn begin_turn(&mut self, query: &str, document: Option<&str>) {
        self.turn_count += 1;
        self.last_query = query.to_string();
        self.messages.push(Message::user(query));

        if let Some(document) = document.filter(|d| !d.trim().is_empty()) {
            if document != self.document_content {
                self.push_version(document.to_string(), VersionSource::User);
            }
        }
    }

    /// Stores the context and remembers any company insights it carries.
    pub fn set_context(&mut self, context: Context) {
        if let Context::CompanyResearch(CompanyContext {
            company_name,
            insights: Some(insights),
        }) = &context
        {
            self.company_insights
                .insert(company_key(company_name), insights.clone());
        }
        self.context = Some(context);
    }

    /// Appends a version and makes it the working document.
    pub fn push_version(&mut self, content: String, source: VersionSource) {
        let version = self
            .document_versions
            .last()
            .map(|v| v.version + 1)
            .unwrap_or(1);
        self.document_content = content.clone();
        self.document_versions.push(DocumentVersion {
            version,
            content,
            source,
            created_at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_labels_round_trip_through_from_str() {
        for intent in Intent::ALL {
            assert_eq!(intent.as_str().parse::<Intent>().unwrap(), intent);
        }
        assert!("summarize".parse::<Intent>().is_err());
    }

    #[test]
    fn test_context_variant_determines_intent() {
        let ctx = Context::Translation(TranslationContext {
            target_language: "french".into(),
        });
        assert_eq!(ctx.intent(), Intent::Translation);
        assert!(ctx.as_translation().is_some());
        assert!(ctx.as_company().is_none());
    }

    #[test]
    fn test_context_serializes_with_intent_tag() {
        let ctx = Context::Enhancement(SectionContext {
            target_section: "skills".into(),
        });
        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(value["intent"], "enhancement");
        assert_eq!(value["target_section"], "skills");
    }

    fn google_insights() -> Context {
        Context::CompanyResearch(CompanyContext {
            company_name: "Google".into(),
            insights: Some(CompanyInsights {
                culture: "data-driven".into(),
                ..Default::default()
            }),
        })
    }

    fn research(company: &str) -> Context {
        Context::CompanyResearch(CompanyContext {
            company_name: company.into(),
            insights: None,
        })
    }

    #[test]
    fn test_carry_over_reuses_insights_for_same_company() {
        let mut state = SessionState::default();
        state.set_context(google_insights());
        let next = research("google").carry_over(&state.company_insights);
        assert_eq!(next.as_company().unwrap().insights.as_ref().unwrap().culture, "data-driven");
    }

    #[test]
    fn test_carry_over_ignores_other_company() {
        let mut state = SessionState::default();
        state.set_context(google_insights());
        let next = research("Amazon").carry_over(&state.company_insights);
        assert!(next.as_company().unwrap().insights.is_none());
    }

    #[test]
    fn test_insights_survive_a_turn_of_another_intent() {
        let mut state = SessionState::default();
        state.set_context(google_insights());
        state.set_context(Context::Enhancement(SectionContext {
            target_section: "skills".into(),
        }));

        assert_eq!(state.current_intent(), Some(Intent::Enhancement));
        let next = research("Google").carry_over(&state.company_insights);
        assert!(next.as_company().unwrap().insights.is_some());
    }

    #[test]
    fn test_state_without_insight_cache_still_deserializes() {
        let mut value = serde_json::to_value(SessionState::default()).unwrap();
        value.as_object_mut().unwrap().remove("company_insights");
        let state: SessionState = serde_json::from_value(value).unwrap();
        assert!(state.company_insights.is_empty());
    }

    #[test]
    fn test_begin_turn_records_query_and_first_document() {
        let mut state = SessionState::default();
        state.begin_turn("improve my skills", Some("JANE DOE\nSkills: Rust"));
        assert_eq!(state.turn_count, 1);
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].role, Role::User);
        assert_eq!(state.document_versions.len(), 1);
        assert_eq!(state.document_versions[0].source, VersionSource::User);
        assert_eq!(state.document_content, "JANE DOE\nSkills: Rust");
    }

    #[test]
    fn test_begin_turn_skips_unchanged_or_empty_document() {
        let mut state = SessionState::default();
        state.begin_turn("q1", Some("doc"));
        state.begin_turn("q2", Some("doc"));
        state.begin_turn("q3", Some("   "));
        state.begin_turn("q4", None);
        assert_eq!(state.document_versions.len(), 1);
        assert_eq!(state.messages.len(), 4);
    }

    #[test]
    fn test_push_version_numbers_sequentially() {
        let mut state = SessionState::default();
        state.push_version("v1".into(), VersionSource::User);
        state.push_version("v2".into(), VersionSource::Agent(Intent::Enhancement));
        assert_eq!(state.document_versions[1].version, 2);
        assert_eq!(state.document_content, "v2");
    }
}
