// Fiverr sellers are read off the marketplace's gig search page with
// declarative extraction rules, one record per gig card.

use serde_json::Value;

use apify_client::{ExtractionRules, WebScraperInput, WEB_SCRAPER};
use talentraid_common::{Platform, ScrapedCandidate};

use super::{
    accept, flatten_items, parse_count, parse_number, parse_rate, resolve_profile_url, search_url,
    username_from_url, ActorInput, Fields, PlatformAdapter, Record, ScrapeJob,
};

const SEARCH_PAGE: &str = "https://www.fiverr.com/search/gigs";
const MAX_ITEMS: usize = 100;
/// Ratings at or below this are star ratings rather than percentages.
const STAR_SCALE: f64 = 5.0;

pub struct FiverrAdapter;

/// A seller as extracted from one gig card.
#[derive(Debug, Clone, PartialEq)]
struct FiverrSeller {
    name: String,
    username: Option<String>,
    profile_url: Option<String>,
    title: String,
    country: Option<String>,
    rate: Option<Value>,
    rating: Option<Value>,
    reviews: Option<Value>,
    level: Option<String>,
    badges: Vec<String>,
    skills: Vec<String>,
    certifications: Vec<String>,
    description: String,
}

impl FiverrSeller {
    fn from_record(record: &Record) -> Option<Self> {
        let fields = Fields(record);
        Some(Self {
            name: fields.text(&["name", "sellerName", "seller", "username"])?,
            username: fields.text(&["username", "seller"]),
            profile_url: fields.text(&["profileUrl", "url", "link"]),
            title: fields.text(&["title", "service", "gigTitle"]).unwrap_or_default(),
            country: fields.text(&["country", "location"]),
            rate: fields.value(&["rate", "price", "startingPrice"]).cloned(),
            rating: fields.value(&["rating", "ratingScore"]).cloned(),
            reviews: fields.value(&["reviews", "reviewsCount", "ratingCount"]).cloned(),
            level: fields.text(&["level", "sellerLevel"]),
            badges: fields.list(&["badges"]),
            skills: fields.list(&["skills", "tags"]),
            certifications: fields.list(&["certifications"]),
            description: fields.text(&["description", "bio"]).unwrap_or_default(),
        })
    }

    fn into_candidate(self) -> Option<ScrapedCandidate> {
        let profile_url = match (&self.profile_url, &self.username) {
            (Some(url), _) => resolve_profile_url(Platform::Fiverr, url),
            (None, Some(username)) => format!("{}/{username}", Platform::Fiverr.origin()),
            (None, None) => return None,
        };
        let username = self
            .username
            .clone()
            .unwrap_or_else(|| username_from_url(&profile_url));

        let mut badges = self.badges;
        if let Some(level) = self.level {
            if !badges.contains(&level) {
                badges.push(level);
            }
        }

        let mut candidate = ScrapedCandidate::builder()
            .name(self.name)
            .platform(Platform::Fiverr)
            .platform_username(username)
            .profile_url(profile_url)
            .title(self.title)
            .country(self.country.unwrap_or_else(|| "Unknown".to_string()))
            .hourly_rate(parse_rate(self.rate.as_ref()))
            .job_success_rate(rating_to_percent(self.rating.as_ref()))
            .certifications(self.certifications)
            .bio(self.description)
            .skills(self.skills)
            .badges(badges)
            .build();
        candidate.total_jobs = parse_count(self.reviews.as_ref());
        accept(candidate)
    }
}

/// Star ratings (0..=5) scale to a percentage; larger values are taken as one already.
fn rating_to_percent(value: Option<&Value>) -> f64 {
    match parse_number(value) {
        Some(stars) if stars <= STAR_SCALE => stars / STAR_SCALE * 100.0,
        Some(percent) => percent.min(100.0),
        None => 0.0,
    }
}

fn extraction_rules(max_items: u32) -> ExtractionRules {
    ExtractionRules::new("[data-testid='gig-card'], .gig-card-layout", max_items)
        .field("name", "[data-testid='seller-name'], .seller-name")
        .field("profileUrl", "a[href*='/'][data-testid='seller-link']@href")
        .field("title", "h3, [data-testid='gig-title']")
        .field("rate", "[data-testid='gig-price'], .price")
        .field("rating", "[data-testid='rating-score'], .rating-score")
        .field("reviews", "[data-testid='rating-count'], .rating-count")
        .field("level", "[data-testid='seller-level'], .level")
        .field("country", "[data-testid='seller-country']")
}

impl PlatformAdapter for FiverrAdapter {
    fn platform(&self) -> Platform {
        Platform::Fiverr
    }

    fn query_variations(&self, keyword: &str) -> Vec<String> {
        let k = keyword.trim();
        vec![
            format!(r#""{k}" Spanish"#),
            format!(r#""{k}" "top rated" Spanish"#),
            format!("{k} seller Español"),
            format!("{k} portfolio Spanish"),
            format!("{k} studio Español"),
        ]
    }

    fn build_job(&self, query: &str, result_hint: usize) -> ScrapeJob {
        let max_items = result_hint.clamp(1, MAX_ITEMS) as u32;
        let input = WebScraperInput::new(
            search_url(SEARCH_PAGE, "query", query),
            max_items,
            extraction_rules(max_items),
        );
        ScrapeJob {
            platform: Platform::Fiverr,
            query: query.to_string(),
            actor_id: WEB_SCRAPER,
            input: ActorInput::WebScraper(input),
            result_hint,
        }
    }

    fn parse(&self, raw: Vec<Value>) -> Vec<ScrapedCandidate> {
        flatten_items(Platform::Fiverr, raw)
            .iter()
            .filter_map(FiverrSeller::from_record)
            .filter_map(FiverrSeller::into_candidate)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn job_targets_gig_search() {
        let job = FiverrAdapter.build_job(r#""flutter" Spanish"#, 6);
        assert_eq!(job.actor_id, WEB_SCRAPER);
        let input = serde_json::to_value(&job.input).unwrap();
        assert_eq!(
            input["startUrls"][0]["url"],
            "https://www.fiverr.com/search/gigs?query=%22flutter%22+Spanish"
        );
        assert_eq!(input["maxResults"], 6);
        assert!(input["extractionRules"]["fields"]["name"].is_string());
    }

    #[test]
    fn parses_with_field_fallbacks() {
        let raw = vec![
            json!({"pageFunctionResult": [{
                "seller": "andresdev",
                "link": "/andresdev?source=gig_cards",
                "service": "I will build your Flutter app",
                "price": "From $85",
                "rating": "4.9",
                "reviews": "(1k+)",
                "level": "Level 2",
                "badges": ["Pro"]
            }]}),
            json!({"#error": true}),
            json!({"name": "", "url": "https://www.fiverr.com/nobody"}),
            json!({"name": "Elsewhere", "url": "https://www.upwork.com/freelancers/~1"}),
        ];

        let candidates = FiverrAdapter.parse(raw);
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.name, "andresdev");
        assert_eq!(c.platform_username, "andresdev");
        assert_eq!(c.profile_url, "https://www.fiverr.com/andresdev?source=gig_cards");
        assert_eq!(c.title, "I will build your Flutter app");
        assert_eq!(c.hourly_rate, 85.0);
        assert!((c.job_success_rate - 98.0).abs() < 1e-9);
        assert_eq!(c.total_jobs, Some(1000));
        assert_eq!(c.badges, vec!["Pro", "Level 2"]);
    }

    #[test]
    fn username_alone_builds_profile_url() {
        let raw = vec![json!({"name": "Camila Torres", "username": "camitorres"})];
        let candidates = FiverrAdapter.parse(raw);
        assert_eq!(candidates[0].profile_url, "https://www.fiverr.com/camitorres");
    }

    #[test]
    fn percentage_ratings_pass_through() {
        assert_eq!(rating_to_percent(Some(&json!(5))), 100.0);
        assert_eq!(rating_to_percent(Some(&json!("96%"))), 96.0);
        assert_eq!(rating_to_percent(Some(&json!("n/a"))), 0.0);
        assert_eq!(rating_to_percent(None), 0.0);
    }
}
