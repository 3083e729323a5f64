// Upwork profiles are found through site-restricted web search. Each dataset
// item is a results page whose organic hits carry the profile URL, a
// "Name - Title - Upwork" heading, and a snippet with rate and job success.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use apify_client::{GoogleSearchInput, GOOGLE_SEARCH_SCRAPER};
use talentraid_common::{Platform, ScrapedCandidate};

use super::{
    accept, flatten_items, parse_rate, parse_success_rate, username_from_url, ActorInput, Fields,
    PlatformAdapter, Record, ScrapeJob,
};

const SITE_FILTER: &str = "site:upwork.com/freelancers OR site:upwork.com/o/profiles";
const PROFILE_PATHS: [&str; 2] = ["/freelancers/", "/o/profiles/"];
const MAX_RESULTS_PER_PAGE: usize = 100;

static HOURLY_RATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\$\s*([0-9][0-9,]*(?:\.[0-9]+)?)\s*/\s*(?:hr|hour)").unwrap());
static JOB_SUCCESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9]{1,3})%\s*Job\s*Success").unwrap());

const BADGES: [&str; 3] = ["Top Rated Plus", "Top Rated", "Rising Talent"];

pub struct UpworkAdapter;

/// One organic search hit.
#[derive(Debug, Clone, PartialEq)]
struct UpworkSearchHit {
    url: String,
    heading: String,
    snippet: String,
}

impl UpworkSearchHit {
    fn from_record(record: &Record) -> Option<Self> {
        let fields = Fields(record);
        Some(Self {
            url: fields.text(&["url", "link"])?,
            heading: fields.text(&["title"])?,
            snippet: fields.text(&["description", "snippet"]).unwrap_or_default(),
        })
    }

    fn is_profile(&self) -> bool {
        Platform::Upwork.owns_url(&self.url) && PROFILE_PATHS.iter().any(|p| self.url.contains(p))
    }

    fn into_candidate(self) -> Option<ScrapedCandidate> {
        if !self.is_profile() {
            return None;
        }
        let heading = self.heading.trim_end_matches("| Upwork").trim();
        let mut parts = heading.split(" - ").map(str::trim);
        let name = parts.next().filter(|_| heading.contains(" - "))?.to_string();
        let title = parts.next().filter(|t| !t.eq_ignore_ascii_case("upwork")).unwrap_or_default();

        let rate = HOURLY_RATE
            .captures(&self.snippet)
            .map(|c| Value::String(c[1].to_string()));
        let success = JOB_SUCCESS
            .captures(&self.snippet)
            .map(|c| Value::String(c[1].to_string()));
        let badges: Vec<String> = BADGES
            .iter()
            .find(|b| self.snippet.contains(*b))
            .map(|b| vec![b.to_string()])
            .unwrap_or_default();

        accept(
            ScrapedCandidate::builder()
                .name(name)
                .platform(Platform::Upwork)
                .platform_username(username_from_url(&self.url))
                .profile_url(self.url.clone())
                .title(title)
                .hourly_rate(parse_rate(rate.as_ref()))
                .job_success_rate(parse_success_rate(success.as_ref()))
                .bio(self.snippet)
                .badges(badges)
                .build(),
        )
    }
}

/// Organic hits from a results page, or the record itself when it already is a hit.
fn hits(record: &Record) -> Vec<UpworkSearchHit> {
    match record.get("organicResults") {
        Some(Value::Array(results)) => results
            .iter()
            .filter_map(Value::as_object)
            .filter_map(UpworkSearchHit::from_record)
            .collect(),
        _ => UpworkSearchHit::from_record(record).into_iter().collect(),
    }
}

impl PlatformAdapter for UpworkAdapter {
    fn platform(&self) -> Platform {
        Platform::Upwork
    }

    fn query_variations(&self, keyword: &str) -> Vec<String> {
        let k = keyword.trim();
        [
            format!(r#""{k}" "Spanish""#),
            format!(r#""{k}" "top rated" "Spanish""#),
            format!(r#"{k} "100% Job Success" Español"#),
            format!("{k} freelance remote Spanish"),
            format!("{k} expert OR senior Español"),
        ]
        .into_iter()
        .map(|q| format!("{SITE_FILTER} {q}"))
        .collect()
    }

    fn build_job(&self, query: &str, result_hint: usize) -> ScrapeJob {
        let per_page = result_hint.clamp(10, MAX_RESULTS_PER_PAGE) as u32;
        ScrapeJob {
            platform: Platform::Upwork,
            query: query.to_string(),
            actor_id: GOOGLE_SEARCH_SCRAPER,
            input: ActorInput::GoogleSearch(GoogleSearchInput::new(query, per_page)),
            result_hint,
        }
    }

    fn parse(&self, raw: Vec<Value>) -> Vec<ScrapedCandidate> {
        flatten_items(Platform::Upwork, raw)
            .iter()
            .flat_map(hits)
            .filter_map(UpworkSearchHit::into_candidate)
            .collect()
    }
}
