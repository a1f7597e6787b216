use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::embeddings::DEFAULT_EMBEDDING_MODEL;
use crate::routing::RouterPolicy;

const DEFAULT_EMBEDDING_BASE_URL: &str = "https://api.openai.com/v1";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub embedding_api_key: Option<String>,
    pub embedding_base_url: String,
    pub embedding_model: String,
    pub data_dir: PathBuf,
    pub resume_dir: PathBuf,
    /// Applies to both text generation and embedding calls.
    pub upstream_timeout_secs: u64,
    pub ingest_on_startup: bool,
    pub router_policy: RouterPolicy,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let data_dir = PathBuf::from(optional_env("DATA_DIR").unwrap_or_else(|| "./data".into()));
        let resume_dir = optional_env("RESUME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("resumes"));

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            embedding_api_key: optional_env("EMBEDDING_API_KEY"),
            embedding_base_url: optional_env("EMBEDDING_BASE_URL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_BASE_URL.to_string()),
            embedding_model: optional_env("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            data_dir,
            resume_dir,
            upstream_timeout_secs: parse_env("UPSTREAM_TIMEOUT_SECS", 300)?,
            ingest_on_startup: parse_bool_env("INGEST_ON_STARTUP", true)?,
            router_policy: RouterPolicy {
                honor_new_job_search: parse_bool_env("ROUTER_HONOR_NEW_JOB_SEARCH", true)?,
                discussion_requires_results: parse_bool_env(
                    "ROUTER_DISCUSSION_REQUIRES_RESULTS",
                    false,
                )?,
            },
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn parse_bool_env(key: &str, default: bool) -> Result<bool> {
    match optional_env(key) {
        Some(raw) => parse_bool(&raw)
            .with_context(|| format!("{key} must be a boolean (true/false/1/0), got '{raw}'")),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
