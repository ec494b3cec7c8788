use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::document::render::DEFAULT_PROGRAM;
use crate::llm_client::search::DEFAULT_TAVILY_BASE;
use crate::llm_client::DEFAULT_API_BASE;
use crate::workflow::engine::ClassificationFallback;
use crate::workflow::retention::RetentionPolicy;

const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:3001",
    "http://localhost:3002",
];

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub anthropic_base_url: String,
    /// Enables web search for company research when set.
    pub tavily_api_key: Option<String>,
    pub tavily_base_url: String,
    pub llm_timeout: Duration,
    pub search_timeout: Duration,
    pub latex_program: String,
    pub classification_fallback: ClassificationFallback,
    pub retention: RetentionPolicy,
    pub cors_origins: Vec<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            anthropic_base_url: env_or("ANTHROPIC_BASE_URL", DEFAULT_API_BASE),
            tavily_api_key: optional_env("TAVILY_API_KEY"),
            tavily_base_url: env_or("TAVILY_BASE_URL", DEFAULT_TAVILY_BASE),
            llm_timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", 60)?),
            search_timeout: Duration::from_secs(parse_env("SEARCH_TIMEOUT_SECS", 15)?),
            latex_program: env_or("LATEX_PROGRAM", DEFAULT_PROGRAM),
            classification_fallback: env_or("CLASSIFICATION_FALLBACK", "heuristic")
                .parse()
                .map_err(|e: String| anyhow!(e))
                .context("CLASSIFICATION_FALLBACK is invalid")?,
            retention: RetentionPolicy {
                max_messages: parse_env("MAX_SESSION_MESSAGES", 200)?,
                max_versions: parse_env("MAX_DOCUMENT_VERSIONS", 50)?,
            },
            cors_origins: parse_origins(optional_env("CORS_ORIGINS").as_deref()),
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

fn parse_origins(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect(),
        None => DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
    }
}
