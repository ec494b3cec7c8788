//! Context extraction: pure, deterministic mapping from (intent, query) to a
//! typed `Context`. No I/O, never fails.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::workflow::state::{
    CompanyContext, Context, Intent, JobMatchContext, SectionContext, TranslationContext,
};

pub const DEFAULT_SECTION: &str = "general";
pub const DEFAULT_COMPANY: &str = "Unknown Company";
pub const DEFAULT_LANGUAGE: &str = "spanish";

/// Section keyword buckets, checked in order. First match wins.
pub const SECTION_KEYWORDS: &[(&str, &[&str])] = &[
    ("experience", &["experience", "work history", "employment", "job"]),
    ("skills", &["skills", "technical skills", "competencies"]),
    ("education", &["education", "academic", "degree", "university"]),
    ("summary", &["summary", "objective", "profile", "about"]),
    ("projects", &["projects", "portfolio", "work samples"]),
];

/// Language indicators in priority order.
pub const LANGUAGE_KEYWORDS: &[(&str, &[&str])] = &[
    ("spanish", &["spanish", "español", "espanol", "castellano"]),
    ("french", &["french", "français", "francais"]),
    ("german", &["german", "deutsch"]),
    ("portuguese", &["portuguese", "português", "portugues", "brazilian"]),
    ("italian", &["italian", "italiano"]),
    ("dutch", &["dutch", "nederlands"]),
    ("chinese", &["chinese", "mandarin", "中文"]),
    ("japanese", &["japanese", "日本語"]),
];

const JOB_DESCRIPTION_MARKERS: &[&str] = &["job description:", "requirements:"];

/// Preposition (any case) followed by a capitalized word.
static COMPANY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?i:for|at|with)\s+([A-Z][a-zA-Z]+)").expect("company pattern is valid")
});

pub fn extract(intent: Intent, query: &str) -> Context {
    match intent {
        Intent::Enhancement => Context::Enhancement(SectionContext {
            target_section: extract_target_section(query).to_string(),
        }),
        Intent::JobMatching => Context::JobMatching(JobMatchContext {
            job_description: extract_job_description(query),
        }),
        Intent::CompanyResearch => Context::CompanyResearch(CompanyContext {
            company_name: extract_company_name(query),
            insights: None,
        }),
        Intent::Translation => Context::Translation(TranslationContext {
            target_language: extract_target_language(query).to_string(),
        }),
    }
}

pub fn extract_target_section(query: &str) -> &'static str {
    first_bucket(SECTION_KEYWORDS, query).unwrap_or(DEFAULT_SECTION)
}

/// Text after the last colon when the query carries an explicit marker,
/// otherwise the whole query.
pub fn extract_job_description(query: &str) -> String {
    let lower = query.to_lowercase();
    let has_marker = JOB_DESCRIPTION_MARKERS.iter().any(|m| lower.contains(m));
    match query.rsplit_once(':') {
        Some((_, tail)) if has_marker => tail.trim().to_string(),
        _ => query.trim().to_string(),
    }
}

pub fn extract_company_name(query: &str) -> String {
    COMPANY_PATTERN
        .captures(query)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_COMPANY.to_string())
}

pub fn extract_target_language(query: &str) -> &'static str {
    first_bucket(LANGUAGE_KEYWORDS, query).unwrap_or(DEFAULT_LANGUAGE)
}

fn first_bucket(buckets: &[(&'static str, &[&str])], query: &str) -> Option<&'static str> {
    let lower = query.to_lowercase();
    buckets
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enhancement_without_section_keyword_is_general() {
        let ctx = extract(Intent::Enhancement, "Please enhance my resume overall");
        assert_eq!(ctx.as_section().unwrap().target_section, "general");
    }

    #[test]
    fn test_enhancement_first_matching_bucket_wins() {
        // "experience" is checked before "skills"
        assert_eq!(
            extract_target_section("Improve the skills and experience parts"),
            "experience"
        );
        assert_eq!(extract_target_section("Polish my technical skills"), "skills");
        assert_eq!(extract_target_section("Rewrite my university details"), "education");
        assert_eq!(extract_target_section("Tighten my profile"), "summary");
        assert_eq!(extract_target_section("Showcase my portfolio"), "projects");
    }

    #[test]
    fn test_job_description_marker_takes_text_after_last_colon() {
        let ctx = extract(Intent::JobMatching, "job description: Must know Python and AWS");
        assert_eq!(ctx.as_job_match().unwrap().job_description, "Must know Python and AWS");

        assert_eq!(
            extract_job_description("Match me. Requirements: Go: Kubernetes experience"),
            "Kubernetes experience"
        );
    }

    #[test]
    fn test_job_description_marker_is_case_insensitive() {
        assert_eq!(
            extract_job_description("JOB DESCRIPTION:   Rust, Tokio  "),
            "Rust, Tokio"
        );
    }

    #[test]
    fn test_job_description_without_marker_uses_whole_query() {
        let query = "How well do I match a senior backend role?";
        assert_eq!(extract_job_description(query), query);
        // a colon alone does not trigger extraction
        assert_eq!(extract_job_description("Role: staff engineer"), "Role: staff engineer");
    }

    #[test]
    fn test_company_name_after_preposition() {
        let ctx = extract(Intent::CompanyResearch, "Optimize my resume for Google");
        assert_eq!(ctx.as_company().unwrap().company_name, "Google");
        assert_eq!(extract_company_name("I want to work AT Microsoft"), "Microsoft");
        assert_eq!(extract_company_name("Interviewing with Stripe next week"), "Stripe");
    }

    #[test]
    fn test_company_name_requires_capitalized_word() {
        assert_eq!(extract_company_name("tailor it for the role"), DEFAULT_COMPANY);
        assert_eq!(extract_company_name("Tailor it for the Amazon role"), DEFAULT_COMPANY);
    }

    #[test]
    fn test_company_default_when_no_match() {
        let ctx = extract(Intent::CompanyResearch, "research companies please");
        assert_eq!(ctx.as_company().unwrap().company_name, "Unknown Company");
    }

    #[test]
    fn test_language_detection_and_priority() {
        let ctx = extract(Intent::Translation, "Translate my resume to French");
        assert_eq!(ctx.as_translation().unwrap().target_language, "french");
        assert_eq!(extract_target_language("auf Deutsch bitte"), "german");
        // spanish outranks french
        assert_eq!(extract_target_language("French or Spanish, whichever"), "spanish");
        assert_eq!(extract_target_language("translate it to 日本語"), "japanese");
    }

    #[test]
    fn test_language_defaults_to_spanish() {
        assert_eq!(extract_target_language("Translate my resume"), "spanish");
    }

    #[test]
    fn test_extract_is_deterministic() {
        let queries = [
            "Optimize my resume for Google",
            "job description: Must know Python and AWS",
            "Translate my resume to French",
            "Please enhance my resume overall",
        ];
        for intent in Intent::ALL {
            for q in queries {
                assert_eq!(extract(intent, q), extract(intent, q));
                assert_eq!(extract(intent, q).intent(), intent);
            }
        }
    }
}
