use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::TalentRaidError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // External job service
    pub apify_api_token: String,
    pub apify_poll_interval: Duration,
    pub apify_run_timeout: Duration,

    // Enrichment
    pub openai_api_key: String,
    pub openai_model: String,
    pub enrichment_concurrency: usize,

    // Search
    pub scrape_max_attempts: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, TalentRaidError> {
        Ok(Self {
            apify_api_token: required_env("APIFY_API_TOKEN")?,
            apify_poll_interval: Duration::from_millis(parsed_env("APIFY_POLL_INTERVAL_MS", 1000)?),
            apify_run_timeout: Duration::from_secs(parsed_env("APIFY_RUN_TIMEOUT_SECS", 300)?),
            openai_api_key: required_env("OPENAI_API_KEY")?,
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            enrichment_concurrency: parsed_env("ENRICHMENT_CONCURRENCY", 5)?,
            scrape_max_attempts: parsed_env("SCRAPE_MAX_ATTEMPTS", 10)?,
        })
    }

    /// Log the effective configuration with secrets masked.
    pub fn log_redacted(&self) {
        info!(
            apify_api_token = redact(&self.apify_api_token),
            apify_poll_interval_ms = self.apify_poll_interval.as_millis() as u64,
            apify_run_timeout_secs = self.apify_run_timeout.as_secs(),
            openai_api_key = redact(&self.openai_api_key),
            openai_model = self.openai_model.as_str(),
            enrichment_concurrency = self.enrichment_concurrency,
            scrape_max_attempts = self.scrape_max_attempts,
            "Loaded configuration"
        );
    }
}

fn required_env(key: &str) -> Result<String, TalentRaidError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(TalentRaidError::Config(format!(
            "{key} environment variable is required"
        ))),
    }
}

fn parsed_env<T: FromStr>(key: &str, default: T) -> Result<T, TalentRaidError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| TalentRaidError::Config(format!("{key} must be a number, got {raw:?}"))),
        Err(_) => Ok(default),
    }
}

fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}
