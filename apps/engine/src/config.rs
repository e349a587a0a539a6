use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Panics at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Last-resort provider and the designated provider in non-optimized mode.
    pub openai_api_key: String,
    /// Free-tier primary + cheap same-vendor fallback. Optional.
    pub gemini_api_key: Option<String>,
    /// Second independent low-cost provider. Optional.
    pub groq_api_key: Option<String>,
    /// When false, the fallback chain is bypassed for the designated provider.
    pub cost_optimized: bool,
    /// Rolling daily request budget for the free-tier primary.
    pub gemini_daily_free_quota: u32,
    /// Forced-eviction cap on live sessions.
    pub max_sessions: usize,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            openai_api_key: require_env("OPENAI_API_KEY")?,
            gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
            groq_api_key: std::env::var("GROQ_API_KEY").ok(),
            cost_optimized: std::env::var("COST_OPTIMIZED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            gemini_daily_free_quota: std::env::var("GEMINI_DAILY_FREE_QUOTA")
                .unwrap_or_else(|_| "1500".to_string())
                .parse::<u32>()
                .context("GEMINI_DAILY_FREE_QUOTA must be a non-negative integer")?,
            max_sessions: std::env::var("MAX_SESSIONS")
                .unwrap_or_else(|_| "500".to_string())
                .parse::<usize>()
                .context("MAX_SESSIONS must be a positive integer")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
