use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_ANALYSIS_MODEL: &str = "gpt-4";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub analysis_model: String,
    pub chat_model: String,
    pub analysis_max_tokens: u32,
    pub chat_max_tokens: u32,
    pub chat_max_attempts: u32,
    pub chat_retry_backoff: Duration,
    pub request_timeout: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let chat_max_attempts: u32 = parse_env("CHAT_MAX_ATTEMPTS", 3)?;
        if chat_max_attempts == 0 {
            anyhow::bail!("CHAT_MAX_ATTEMPTS must be at least 1");
        }

        Ok(Config {
            openai_api_key: require_env("OPENAI_API_KEY")?,
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            analysis_model: std::env::var("ANALYSIS_MODEL")
                .unwrap_or_else(|_| DEFAULT_ANALYSIS_MODEL.to_string()),
            chat_model: std::env::var("CHAT_MODEL")
                .unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string()),
            analysis_max_tokens: parse_env("ANALYSIS_MAX_TOKENS", 1500)?,
            chat_max_tokens: parse_env("CHAT_MAX_TOKENS", 150)?,
            chat_max_attempts,
            chat_retry_backoff: Duration::from_secs(parse_env("CHAT_RETRY_BACKOFF_SECS", 2)?),
            request_timeout: Duration::from_secs(parse_env("REQUEST_TIMEOUT_SECS", 120)?),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_value(key, std::env::var(key).ok(), default)
}

fn parse_value<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
