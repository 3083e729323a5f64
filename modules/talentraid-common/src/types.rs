use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use uuid::Uuid;

// --- Platforms ---

/// A talent marketplace the pipeline can source candidates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Upwork,
    Fiverr,
    LinkedIn,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Upwork, Platform::Fiverr, Platform::LinkedIn];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Upwork => "Upwork",
            Platform::Fiverr => "Fiverr",
            Platform::LinkedIn => "LinkedIn",
        }
    }

    /// Registrable domain that every profile URL on this platform lives under.
    pub fn domain(&self) -> &'static str {
        match self {
            Platform::Upwork => "upwork.com",
            Platform::Fiverr => "fiverr.com",
            Platform::LinkedIn => "linkedin.com",
        }
    }

    /// Origin used to resolve relative profile paths.
    pub fn origin(&self) -> &'static str {
        match self {
            Platform::Upwork => "https://www.upwork.com",
            Platform::Fiverr => "https://www.fiverr.com",
            Platform::LinkedIn => "https://www.linkedin.com",
        }
    }

    /// Result cap used when the filter does not set one.
    pub fn default_max_results(&self) -> usize {
        match self {
            Platform::Upwork => 50,
            Platform::Fiverr => 40,
            Platform::LinkedIn => 50,
        }
    }

    /// True if `url` is an absolute http(s) URL on this platform's domain or a subdomain of it.
    pub fn owns_url(&self, url: &str) -> bool {
        let Ok(parsed) = url::Url::parse(url.trim()) else {
            return false;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        let domain = self.domain();
        host == domain || host.ends_with(&format!(".{domain}"))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upwork" => Ok(Platform::Upwork),
            "fiverr" => Ok(Platform::Fiverr),
            "linkedin" => Ok(Platform::LinkedIn),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

// --- Candidates ---

/// A freelancer profile as scraped from a marketplace, before enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedCandidate {
    #[builder(default = Uuid::new_v4().to_string(), setter(into))]
    pub id: String,
    #[builder(setter(into))]
    pub name: String,
    pub platform: Platform,
    #[builder(default, setter(into))]
    pub platform_username: String,
    #[builder(default, setter(into))]
    pub profile_url: String,
    #[builder(default, setter(into))]
    pub title: String,
    #[builder(default = "Unknown".to_string(), setter(into))]
    pub country: String,
    /// Currency-less hourly rate; 0 when unknown.
    #[builder(default)]
    pub hourly_rate: f64,
    /// Job success percentage in 0..=100; 0 when unknown.
    #[builder(default)]
    pub job_success_rate: f64,
    #[builder(default)]
    pub certifications: Vec<String>,
    #[builder(default, setter(into))]
    pub bio: String,
    #[builder(default = Utc::now())]
    pub scraped_at: DateTime<Utc>,
    #[builder(default, setter(strip_option))]
    pub talent_score: Option<u8>,
    #[builder(default)]
    pub skills: Vec<String>,
    #[builder(default)]
    pub badges: Vec<String>,
    #[builder(default, setter(strip_option))]
    pub years_experience: Option<f64>,
    #[builder(default, setter(strip_option))]
    pub total_earnings: Option<f64>,
    #[builder(default, setter(strip_option))]
    pub total_jobs: Option<u32>,
    #[builder(default, setter(strip_option))]
    pub total_hours: Option<f64>,
    #[builder(default, setter(into, strip_option))]
    pub email: Option<String>,
}

impl ScrapedCandidate {
    /// Name is present and the profile URL, if any, lives on the claimed platform.
    pub fn is_well_formed(&self) -> bool {
        !self.name.trim().is_empty()
            && (self.profile_url.is_empty() || self.platform.owns_url(&self.profile_url))
    }

    pub fn score_or_zero(&self) -> u8 {
        self.talent_score.unwrap_or(0)
    }
}

/// Upper bound on discovered emails kept per candidate.
pub const MAX_EMAILS: usize = 5;

/// A scraped candidate plus what the enrichment collaborator found out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedCandidate {
    #[serde(flatten)]
    pub candidate: ScrapedCandidate,
    pub linked_in_url: Option<String>,
    pub emails: Vec<String>,
    pub photo_validated: bool,
    /// Identity-confidence in [0, 1].
    pub identity_confidence: f64,
    pub psychological_profile: Option<String>,
    pub business_moment: Option<String>,
    pub sales_angle: Option<String>,
    pub bottleneck: Option<String>,
}

impl EnrichedCandidate {
    /// Pass-through record carrying no discovered data.
    pub fn minimal(candidate: ScrapedCandidate, identity_confidence: f64) -> Self {
        Self {
            candidate,
            linked_in_url: None,
            emails: Vec::new(),
            photo_validated: false,
            identity_confidence: identity_confidence.clamp(0.0, 1.0),
            psychological_profile: None,
            business_moment: None,
            sales_angle: None,
            bottleneck: None,
        }
    }

    /// Replace the email list: trimmed, lowercased, deduplicated in order, capped at [`MAX_EMAILS`].
    pub fn with_emails(mut self, emails: impl IntoIterator<Item = String>) -> Self {
        let mut kept: Vec<String> = Vec::new();
        for email in emails {
            let email = email.trim().to_lowercase();
            if email.is_empty() || kept.contains(&email) {
                continue;
            }
            kept.push(email);
            if kept.len() == MAX_EMAILS {
                break;
            }
        }
        self.emails = kept;
        self
    }
}

// --- Search request ---

/// What to look for and where.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrapingFilter {
    #[builder(default, setter(into))]
    pub keyword: String,
    #[builder(default, setter(strip_option))]
    pub min_hourly_rate: Option<f64>,
    #[builder(default, setter(strip_option))]
    pub min_job_success_rate: Option<f64>,
    #[builder(default)]
    pub certifications: Vec<String>,
    #[builder(default)]
    pub platforms: Vec<Platform>,
    #[builder(default)]
    pub skills: Vec<String>,
    #[builder(default, setter(strip_option))]
    pub max_results: Option<usize>,
    /// Profiles the calling campaign already holds; skipped while scraping.
    #[builder(default)]
    pub existing_profile_urls: Vec<String>,
    #[builder(default)]
    pub existing_emails: Vec<String>,
}

impl ScrapingFilter {
    /// Number of unique candidates to collect on `platform`.
    pub fn target_for(&self, platform: Platform) -> usize {
        self.max_results
            .unwrap_or_else(|| platform.default_max_results())
    }
}

// --- Raids ---

/// Lifecycle of a raid. Serialized with the exact human-readable labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaidStatus {
    #[serde(rename = "Phase 1: Scraping")]
    Scraping,
    #[serde(rename = "Phase 2: Enrichment")]
    Enrichment,
    #[serde(rename = "Ready to Export")]
    ReadyToExport,
}

impl RaidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RaidStatus::Scraping => "Phase 1: Scraping",
            RaidStatus::Enrichment => "Phase 2: Enrichment",
            RaidStatus::ReadyToExport => "Ready to Export",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RaidStatus::ReadyToExport)
    }
}

impl fmt::Display for RaidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaidStats {
    pub total_scraped: usize,
    pub total_enriched: usize,
    pub total_contacted: usize,
}

/// One sourcing campaign run, from scraping through enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Raid {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub status: RaidStatus,
    pub scraped_candidates: Vec<ScrapedCandidate>,
    pub enriched_candidates: Vec<EnrichedCandidate>,
    pub scraping_progress: Progress,
    pub enrichment_progress: Progress,
    pub stats: RaidStats,
}

impl Raid {
    /// A fresh raid entering the scraping phase with empty lists and zeroed counters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
            status: RaidStatus::Scraping,
            scraped_candidates: Vec::new(),
            enriched_candidates: Vec::new(),
            scraping_progress: Progress::default(),
            enrichment_progress: Progress::default(),
            stats: RaidStats::default(),
        }
    }
}
