// LinkedIn people search. Profiles carry no rate or job-success data, so both
// stay at 0 and scoring treats them as neutral.

use serde_json::Value;

use apify_client::{ExtractionRules, WebScraperInput, WEB_SCRAPER};
use talentraid_common::{Platform, ScrapedCandidate};

use super::{
    accept, flatten_items, resolve_profile_url, search_url, username_from_url, ActorInput, Fields,
    PlatformAdapter, Record, ScrapeJob,
};

const SEARCH_PAGE: &str = "https://www.linkedin.com/search/results/people/";
const MAX_ITEMS: usize = 100;
/// Placeholder shown for profiles outside the viewer's network.
const HIDDEN_MEMBER: &str = "LinkedIn Member";

pub struct LinkedInAdapter;

#[derive(Debug, Clone, PartialEq)]
struct LinkedInProfile {
    name: String,
    profile_url: String,
    headline: String,
    location: Option<String>,
    summary: String,
    skills: Vec<String>,
}

impl LinkedInProfile {
    fn from_record(record: &Record) -> Option<Self> {
        let fields = Fields(record);
        let headline = fields.text(&["title", "jobTitle", "headline"]).unwrap_or_default();
        Some(Self {
            name: fields.text(&["name", "fullName", "user"])?,
            profile_url: fields.text(&["profileUrl", "url", "link"])?,
            summary: fields
                .text(&["bio", "summary", "about"])
                .unwrap_or_else(|| headline.clone()),
            headline,
            location: fields.text(&["country", "location"]),
            skills: fields.list(&["skills"]),
        })
    }

    fn into_candidate(self) -> Option<ScrapedCandidate> {
        // Result cards render "Jane Doe\nView Jane Doe's profile".
        let name = self.name.lines().next().unwrap_or_default().trim().to_string();
        if name.eq_ignore_ascii_case(HIDDEN_MEMBER) {
            return None;
        }
        let profile_url = resolve_profile_url(Platform::LinkedIn, &self.profile_url);
        if !profile_url.contains("/in/") {
            return None;
        }

        accept(
            ScrapedCandidate::builder()
                .name(name)
                .platform(Platform::LinkedIn)
                .platform_username(username_from_url(&profile_url))
                .profile_url(profile_url)
                .title(self.headline)
                .country(self.location.unwrap_or_else(|| "Unknown".to_string()))
                .bio(self.summary)
                .skills(self.skills)
                .build(),
        )
    }
}

fn extraction_rules(max_items: u32) -> ExtractionRules {
    ExtractionRules::new("li.reusable-search__result-container", max_items)
        .field("name", ".entity-result__title-text a span[aria-hidden='true']")
        .field("profileUrl", ".entity-result__title-text a@href")
        .field("headline", ".entity-result__primary-subtitle")
        .field("location", ".entity-result__secondary-subtitle")
        .field("summary", ".entity-result__summary")
}

impl PlatformAdapter for LinkedInAdapter {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    fn query_variations(&self, keyword: &str) -> Vec<String> {
        let k = keyword.trim();
        vec![
            format!("{k} Spanish"),
            format!("{k} Español skill:{k}"),
            format!("{k} title:{k} Spanish"),
            format!("{k} location:Remote Español"),
            format!("{k} experience:5+ Spanish"),
        ]
    }

    fn build_job(&self, query: &str, result_hint: usize) -> ScrapeJob {
        let max_items = result_hint.clamp(1, MAX_ITEMS) as u32;
        let input = WebScraperInput::new(
            search_url(SEARCH_PAGE, "keywords", query),
            max_items,
            extraction_rules(max_items),
        );
        ScrapeJob {
            platform: Platform::LinkedIn,
            query: query.to_string(),
            actor_id: WEB_SCRAPER,
            input: ActorInput::WebScraper(input),
            result_hint,
        }
    }

    fn parse(&self, raw: Vec<Value>) -> Vec<ScrapedCandidate> {
        flatten_items(Platform::LinkedIn, raw)
            .iter()
            .filter_map(LinkedInProfile::from_record)
            .filter_map(LinkedInProfile::into_candidate)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_people_results() {
        let raw = vec![json!({"pageFunctionResult": [
            {
                "fullName": "Sofía Navarro\nView Sofía Navarro's profile",
                "url": "/in/sofia-navarro/",
                "headline": "Mobile Lead · Flutter",
                "location": "Madrid, Spain"
            },
            {
                "name": "LinkedIn Member",
                "url": "https://www.linkedin.com/in/hidden"
            },
            {
                "name": "Acme Corp",
                "url": "https://www.linkedin.com/company/acme"
            }
        ]})];

        let candidates = LinkedInAdapter.parse(raw);
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.name, "Sofía Navarro");
        assert_eq!(c.profile_url, "https://www.linkedin.com/in/sofia-navarro/");
        assert_eq!(c.platform_username, "sofia-navarro");
        assert_eq!(c.title, "Mobile Lead · Flutter");
        assert_eq!(c.country, "Madrid, Spain");
        assert_eq!(c.bio, "Mobile Lead · Flutter");
        assert_eq!(c.hourly_rate, 0.0);
    }

    #[test]
    fn job_uses_people_search() {
        let job = LinkedInAdapter.build_job("Flutter Spanish", 100);
        let input = serde_json::to_value(&job.input).unwrap();
        assert_eq!(
            input["startUrls"][0]["url"],
            "https://www.linkedin.com/search/results/people/?keywords=Flutter+Spanish"
        );
        assert_eq!(input["maxResults"], 100);
    }
}
