// Per-marketplace adapters: query variations, job construction, and parsing
// of raw dataset items into candidates.
//
// Raw items are schema-unstable. Ingestion first classifies each item
// (error marker, wrapped page-function output, or a direct record), then each
// platform reads one typed record from it with an explicit field priority.

pub mod fiverr;
pub mod linkedin;
pub mod upwork;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use apify_client::{GoogleSearchInput, WebScraperInput};
use talentraid_common::{Platform, ScrapedCandidate};

pub use fiverr::FiverrAdapter;
pub use linkedin::LinkedInAdapter;
pub use upwork::UpworkAdapter;

/// Shortest name accepted from a raw item.
const MIN_NAME_CHARS: usize = 2;

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// Structured input for one external job. Serializes as the actor's own input.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ActorInput {
    GoogleSearch(GoogleSearchInput),
    WebScraper(WebScraperInput),
}

/// One scraping round's request to the job service.
#[derive(Debug, Clone)]
pub struct ScrapeJob {
    pub platform: Platform,
    pub query: String,
    pub actor_id: &'static str,
    pub input: ActorInput,
    /// Most candidates this round should contribute.
    pub result_hint: usize,
}

// ---------------------------------------------------------------------------
// Adapter trait
// ---------------------------------------------------------------------------

pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Fixed list of query mutations for `keyword`, broadest first.
    fn query_variations(&self, keyword: &str) -> Vec<String>;

    fn build_job(&self, query: &str, result_hint: usize) -> ScrapeJob;

    /// Turn raw dataset items into well-formed candidates. Never fails;
    /// unusable items are dropped.
    fn parse(&self, raw: Vec<Value>) -> Vec<ScrapedCandidate>;

    /// Variation for a 1-based attempt, saturating on the last one.
    fn query_for_attempt(&self, keyword: &str, attempt: u32) -> String {
        let variations = self.query_variations(keyword);
        let index = (attempt.max(1) as usize - 1).min(variations.len().saturating_sub(1));
        variations
            .get(index)
            .cloned()
            .unwrap_or_else(|| keyword.to_string())
    }
}

pub fn adapter_for(platform: Platform) -> Box<dyn PlatformAdapter> {
    match platform {
        Platform::Upwork => Box::new(UpworkAdapter),
        Platform::Fiverr => Box::new(FiverrAdapter),
        Platform::LinkedIn => Box::new(LinkedInAdapter),
    }
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

pub(crate) type Record = Map<String, Value>;

/// Shape of one raw dataset item.
#[derive(Debug)]
pub(crate) enum RawItem {
    /// The executor reported a failure for this page.
    Error(String),
    /// Page-function output wrapping zero or more records.
    Wrapped(Vec<Record>),
    Direct(Record),
    Unusable,
}

impl RawItem {
    pub(crate) fn classify(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return RawItem::Unusable;
        };
        match map.get("#error") {
            None | Some(Value::Null) | Some(Value::Bool(false)) => {}
            Some(Value::String(message)) => return RawItem::Error(message.clone()),
            Some(other) => return RawItem::Error(other.to_string()),
        }
        match map.remove("pageFunctionResult") {
            Some(Value::Array(items)) => RawItem::Wrapped(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(record) => Some(record),
                        _ => None,
                    })
                    .collect(),
            ),
            Some(Value::Object(record)) => RawItem::Wrapped(vec![record]),
            Some(_) => RawItem::Wrapped(Vec::new()),
            None => RawItem::Direct(map),
        }
    }
}

/// Classify every raw item and flatten wrappers into one record list.
pub(crate) fn flatten_items(platform: Platform, raw: Vec<Value>) -> Vec<Record> {
    let mut records = Vec::with_capacity(raw.len());
    let mut errors = 0usize;
    for value in raw {
        match RawItem::classify(value) {
            RawItem::Direct(record) => records.push(record),
            RawItem::Wrapped(inner) => records.extend(inner),
            RawItem::Error(message) => {
                errors += 1;
                debug!(platform = %platform, error = message.as_str(), "Skipping errored item");
            }
            RawItem::Unusable => {}
        }
    }
    if errors > 0 {
        debug!(platform = %platform, errors, records = records.len(), "Flattened raw items");
    }
    records
}

/// Read-only view over a record with first-present-key lookups.
pub(crate) struct Fields<'a>(pub(crate) &'a Record);

impl<'a> Fields<'a> {
    /// First non-null value among `keys`.
    pub(crate) fn value(&self, keys: &[&str]) -> Option<&'a Value> {
        keys.iter()
            .filter_map(|key| self.0.get(*key))
            .find(|v| !v.is_null())
    }

    /// First non-blank string (numbers are stringified) among `keys`.
    pub(crate) fn text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().filter_map(|key| self.0.get(*key)).find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// First list among `keys`. Arrays may hold strings or `{name}` objects;
    /// a bare string is split on commas.
    pub(crate) fn list(&self, keys: &[&str]) -> Vec<String> {
        let Some(value) = self.value(keys) else {
            return Vec::new();
        };
        let items: Vec<String> = match value {
            Value::Array(items) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(obj) => obj
                        .get("name")
                        .or_else(|| obj.get("title"))
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    _ => None,
                })
                .collect(),
            Value::String(s) => s.split(',').map(str::to_string).collect(),
            _ => Vec::new(),
        };
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(-)?(\d+(?:\.\d+)?)\s*(?:([kKmM])\b)?").unwrap());

/// Best-effort numeric read: JSON numbers as-is, strings by their first number
/// (`"$1,200/hr"` → 1200, `"2.5k"` → 2500). Negative or non-finite → None.
pub fn parse_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let cleaned = s.replace(',', "");
            let caps = NUMBER.captures(&cleaned)?;
            if caps.get(1).is_some() {
                return None;
            }
            let base: f64 = caps.get(2)?.as_str().parse().ok()?;
            let scale = match caps.get(3).map(|m| m.as_str()) {
                Some("k") | Some("K") => 1_000.0,
                Some("m") | Some("M") => 1_000_000.0,
                _ => 1.0,
            };
            base * scale
        }
        _ => return None,
    };
    (number.is_finite() && number >= 0.0).then_some(number)
}

/// Hourly rate, 0 when unparsable.
pub fn parse_rate(value: Option<&Value>) -> f64 {
    parse_number(value).unwrap_or(0.0)
}

/// Success percentage clamped to 0..=100, 0 when unparsable.
pub fn parse_success_rate(value: Option<&Value>) -> f64 {
    parse_number(value).map(|n| n.min(100.0)).unwrap_or(0.0)
}

pub fn parse_count(value: Option<&Value>) -> Option<u32> {
    parse_number(value).map(|n| n.floor().min(u32::MAX as f64) as u32)
}

// ---------------------------------------------------------------------------
// URLs and acceptance
// ---------------------------------------------------------------------------

/// Resolve protocol-relative and root-relative paths against the platform origin.
pub(crate) fn resolve_profile_url(platform: Platform, raw: &str) -> String {
    let raw = raw.trim();
    if let Some(rest) = raw.strip_prefix("//") {
        format!("https://{rest}")
    } else if raw.starts_with('/') {
        format!("{}{raw}", platform.origin())
    } else {
        raw.to_string()
    }
}

/// Last non-empty path segment, without Upwork's `~` marker.
pub(crate) fn username_from_url(url: &str) -> String {
    let Ok(parsed) = url::Url::parse(url) else {
        return String::new();
    };
    parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|s| s.trim_start_matches('~').to_string())
        .unwrap_or_default()
}

/// Structural gate: a usable name and a profile URL on the claimed platform.
pub(crate) fn accept(candidate: ScrapedCandidate) -> Option<ScrapedCandidate> {
    let named = candidate.name.trim().chars().count() >= MIN_NAME_CHARS;
    let located = !candidate.profile_url.is_empty() && candidate.is_well_formed();
    (named && located).then_some(candidate)
}

pub(crate) fn search_url(base: &str, param: &str, query: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!("{base}?{param}={encoded}")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn classify_distinguishes_item_shapes() {
        assert!(matches!(
            RawItem::classify(json!({"#error": true, "url": "x"})),
            RawItem::Error(_)
        ));
        assert!(matches!(
            RawItem::classify(json!({"#error": false, "name": "Ana"})),
            RawItem::Direct(_)
        ));
        match RawItem::classify(json!({"pageFunctionResult": [{"name": "A"}, 3, {"name": "B"}]})) {
            RawItem::Wrapped(records) => assert_eq!(records.len(), 2),
            other => panic!("expected wrapped, got {other:?}"),
        }
        match RawItem::classify(json!({"pageFunctionResult": {"name": "A"}})) {
            RawItem::Wrapped(records) => assert_eq!(records.len(), 1),
            other => panic!("expected wrapped, got {other:?}"),
        }
        assert!(matches!(RawItem::classify(json!("nope")), RawItem::Unusable));
    }

    #[test]
    fn flatten_drops_errors_and_unwraps() {
        let records = flatten_items(
            Platform::Fiverr,
            vec![
                json!({"name": "Direct"}),
                json!({"#error": "blocked"}),
                json!({"pageFunctionResult": [{"name": "W1"}, {"name": "W2"}]}),
                json!(null),
            ],
        );
        let names: Vec<&str> = records
            .iter()
            .filter_map(|r| r.get("name").and_then(Value::as_str))
            .collect();
        assert_eq!(names, vec!["Direct", "W1", "W2"]);
    }

    #[test]
    fn fields_honor_key_priority() {
        let record = json!({"seller": "fallback", "name": "  ", "user": null, "skills": "Dart, Flutter ,"});
        let Value::Object(map) = record else { unreachable!() };
        let fields = Fields(&map);
        assert_eq!(fields.text(&["name", "user", "seller"]).as_deref(), Some("fallback"));
        assert_eq!(fields.list(&["skills"]), vec!["Dart", "Flutter"]);
        assert!(fields.text(&["missing"]).is_none());
    }

    #[test]
    fn numeric_coercion_defaults_to_zero() {
        assert_eq!(parse_rate(Some(&json!("$45.00/hr"))), 45.0);
        assert_eq!(parse_rate(Some(&json!("US$1,200"))), 1200.0);
        assert_eq!(parse_rate(Some(&json!(30))), 30.0);
        assert_eq!(parse_rate(Some(&json!("ask me"))), 0.0);
        assert_eq!(parse_rate(Some(&json!(-5))), 0.0);
        assert_eq!(parse_rate(Some(&json!("-5"))), 0.0);
        assert_eq!(parse_rate(Some(&json!("$-45.00/hr"))), 0.0);
        assert_eq!(parse_count(Some(&json!("-3k"))), None);
        assert_eq!(parse_count(Some(&json!("10-20 jobs"))), Some(10));
        assert_eq!(parse_rate(None), 0.0);
        assert_eq!(parse_success_rate(Some(&json!("98% Job Success"))), 98.0);
        assert_eq!(parse_success_rate(Some(&json!(250))), 100.0);
        assert_eq!(parse_count(Some(&json!("3k reviews"))), Some(3000));
        assert_eq!(parse_count(Some(&json!("12 months"))), Some(12));
        assert_eq!(parse_count(Some(&json!({}))), None);
    }

    #[test]
    fn profile_urls_resolve_against_origin() {
        assert_eq!(
            resolve_profile_url(Platform::Fiverr, "/anaperez?source=gig_cards"),
            "https://www.fiverr.com/anaperez?source=gig_cards"
        );
        assert_eq!(
            resolve_profile_url(Platform::LinkedIn, "//www.linkedin.com/in/jane"),
            "https://www.linkedin.com/in/jane"
        );
        assert_eq!(
            username_from_url("https://www.upwork.com/freelancers/~01abc/"),
            "01abc"
        );
        assert_eq!(username_from_url("not a url"), "");
    }

    #[test]
    fn attempts_saturate_on_last_variation() {
        let adapter = adapter_for(Platform::LinkedIn);
        let variations = adapter.query_variations("Flutter");
        assert_eq!(adapter.query_for_attempt("Flutter", 1), variations[0]);
        assert_eq!(adapter.query_for_attempt("Flutter", 2), variations[1]);
        assert_eq!(
            adapter.query_for_attempt("Flutter", 40),
            variations[variations.len() - 1]
        );
    }
}
