use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Apify actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "statusMessage")]
    pub status_message: Option<String>,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: Option<String>,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Coarse lifecycle of a run as far as a poller cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    InProgress,
    Succeeded,
    Failed,
}

impl RunData {
    pub fn phase(&self) -> RunPhase {
        match self.status.as_str() {
            "SUCCEEDED" => RunPhase::Succeeded,
            "FAILED" | "ABORTED" | "TIMED-OUT" | "TIMED_OUT" => RunPhase::Failed,
            _ => RunPhase::InProgress,
        }
    }
}

/// How long and how often to poll a run before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_polls: u32,
}

impl PollPolicy {
    /// Poll every `interval` with a ceiling of 1.5x the polls needed to cover `timeout`.
    pub fn from_timeout(timeout: Duration, interval: Duration) -> Self {
        let interval_ms = interval.as_millis().max(1);
        let base = timeout.as_millis().div_ceil(interval_ms);
        let max_polls = (base.saturating_mul(3) / 2).clamp(1, u32::MAX as u128) as u32;
        Self {
            interval,
            max_polls,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_timeout(Duration::from_secs(300), Duration::from_secs(1))
    }
}

/// Dataset items come back either as a bare array or wrapped in `{ "items": [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum DatasetPayload {
    Items(Vec<serde_json::Value>),
    Wrapped {
        #[serde(default)]
        items: Vec<serde_json::Value>,
    },
}

impl DatasetPayload {
    pub(crate) fn into_items(self) -> Vec<serde_json::Value> {
        match self {
            DatasetPayload::Items(items) => items,
            DatasetPayload::Wrapped { items } => items,
        }
    }
}

// --- Google search scraper ---

/// Input for the apify/google-search-scraper actor.
#[derive(Debug, Clone, Serialize)]
pub struct GoogleSearchInput {
    /// Newline-separated queries; a single dork in practice.
    pub queries: String,
    #[serde(rename = "resultsPerPage")]
    pub results_per_page: u32,
    #[serde(rename = "maxPagesPerQuery")]
    pub max_pages_per_query: u32,
    #[serde(rename = "languageCode")]
    pub language_code: String,
    #[serde(rename = "mobileResults")]
    pub mobile_results: bool,
    #[serde(rename = "includeUnfilteredResults")]
    pub include_unfiltered_results: bool,
    #[serde(rename = "saveHtml")]
    pub save_html: bool,
    #[serde(rename = "saveHtmlToKeyValueStore")]
    pub save_html_to_key_value_store: bool,
}

impl GoogleSearchInput {
    pub fn new(query: impl Into<String>, results_per_page: u32) -> Self {
        Self {
            queries: query.into(),
            results_per_page,
            max_pages_per_query: 1,
            language_code: "es".to_string(),
            mobile_results: false,
            include_unfiltered_results: false,
            save_html: false,
            save_html_to_key_value_store: false,
        }
    }
}

// --- Web scraper ---

/// A start URL entry for web scraper input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartUrl {
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProxyConfiguration {
    #[serde(rename = "useApifyProxy")]
    pub use_apify_proxy: bool,
}

/// Declarative extraction: every element matching `item_selector` yields one
/// record whose fields are read from the given sub-selectors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionRules {
    #[serde(rename = "itemSelector")]
    pub item_selector: String,
    /// Output field name → CSS selector (`@attr` suffix reads an attribute).
    pub fields: BTreeMap<String, String>,
    #[serde(rename = "maxItems")]
    pub max_items: u32,
}

impl ExtractionRules {
    pub fn new(item_selector: impl Into<String>, max_items: u32) -> Self {
        Self {
            item_selector: item_selector.into(),
            fields: BTreeMap::new(),
            max_items,
        }
    }

    pub fn field(mut self, name: &str, selector: &str) -> Self {
        self.fields.insert(name.to_string(), selector.to_string());
        self
    }
}

/// Input for the apify/web-scraper actor.
#[derive(Debug, Clone, Serialize)]
pub struct WebScraperInput {
    #[serde(rename = "startUrls")]
    pub start_urls: Vec<StartUrl>,
    #[serde(rename = "maxResultsPerStartUrl")]
    pub max_results_per_start_url: u32,
    #[serde(rename = "maxResults")]
    pub max_results: u32,
    #[serde(rename = "extractionRules")]
    pub extraction_rules: ExtractionRules,
    #[serde(rename = "proxyConfiguration")]
    pub proxy_configuration: ProxyConfiguration,
}

impl WebScraperInput {
    pub fn new(url: impl Into<String>, max_results: u32, rules: ExtractionRules) -> Self {
        Self {
            start_urls: vec![StartUrl { url: url.into() }],
            max_results_per_start_url: max_results,
            max_results,
            extraction_rules: rules,
            proxy_configuration: ProxyConfiguration {
                use_apify_proxy: true,
            },
        }
    }
}
