// Buffer-fill search loop.
//
// Each platform is scraped in rounds with a different query variation per
// round until the target count of unique candidates is reached or attempts run
// out. Round failures are logged and absorbed; they only reduce the yield.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use tracing::{info, warn};

use talentraid_common::{Platform, ScrapedCandidate, ScrapingFilter};

use crate::dedup::{normalize_url, DedupIndex};
use crate::platforms::{adapter_for, PlatformAdapter, ScrapeJob};
use crate::scoring;
use crate::traits::JobRunner;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// What one platform's search produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeOutcome {
    pub platform: Platform,
    /// Unique candidates, best score first, never more than the target.
    pub candidates: Vec<ScrapedCandidate>,
    pub attempts: u32,
    pub failed_rounds: u32,
}

impl ScrapeOutcome {
    /// At least one round reached the job service and came back.
    pub fn had_successful_round(&self) -> bool {
        self.attempts > self.failed_rounds
    }

    /// Rounds ran and every one of them failed. A search that ran no rounds
    /// (zero target or zero attempts) has not failed.
    pub fn all_rounds_failed(&self) -> bool {
        self.attempts > 0 && self.failed_rounds == self.attempts
    }
}

pub struct SearchService {
    runner: Arc<dyn JobRunner>,
    dedup: Arc<Mutex<DedupIndex>>,
}

/// Identity keys already claimed during one `scrape` call, plus the caller's exclusions.
struct SkipSet {
    urls: HashSet<String>,
    usernames: HashSet<String>,
    emails: HashSet<String>,
}

impl SkipSet {
    fn from_filter(filter: &ScrapingFilter) -> Self {
        Self {
            urls: filter
                .existing_profile_urls
                .iter()
                .map(|u| normalize_url(u))
                .filter(|u| !u.is_empty())
                .collect(),
            usernames: HashSet::new(),
            emails: filter
                .existing_emails
                .iter()
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    fn contains(&self, candidate: &ScrapedCandidate) -> bool {
        let url = normalize_url(&candidate.profile_url);
        let username = candidate.platform_username.trim().to_lowercase();
        let email = candidate
            .email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .unwrap_or_default();
        (!url.is_empty() && self.urls.contains(&url))
            || (!username.is_empty() && self.usernames.contains(&username))
            || (!email.is_empty() && self.emails.contains(&email))
    }

    fn claim(&mut self, candidate: &ScrapedCandidate) {
        let url = normalize_url(&candidate.profile_url);
        if !url.is_empty() {
            self.urls.insert(url);
        }
        let username = candidate.platform_username.trim().to_lowercase();
        if !username.is_empty() {
            self.usernames.insert(username);
        }
    }
}

impl SearchService {
    pub fn new(runner: Arc<dyn JobRunner>, dedup: Arc<Mutex<DedupIndex>>) -> Self {
        Self { runner, dedup }
    }

    pub(crate) fn runner(&self) -> &Arc<dyn JobRunner> {
        &self.runner
    }

    /// Collect up to `filter.target_for(platform)` unique candidates in at most
    /// `max_attempts` rounds.
    pub async fn scrape(&self, platform: Platform, filter: &ScrapingFilter, max_attempts: u32) -> ScrapeOutcome {
        let adapter = adapter_for(platform);
        let target = filter.target_for(platform);
        let mut skip = SkipSet::from_filter(filter);
        let mut buffer: Vec<ScrapedCandidate> = Vec::new();
        let mut attempts = 0u32;
        let mut failed_rounds = 0u32;

        info!(platform = %platform, keyword = filter.keyword.as_str(), target, max_attempts, "Starting platform search");

        while buffer.len() < target && attempts < max_attempts {
            attempts += 1;
            let query = adapter.query_for_attempt(&filter.keyword, attempts);
            let job = adapter.build_job(&query, (target - buffer.len()).saturating_mul(2));

            let round = match self.run_round(adapter.as_ref(), &job).await {
                Ok(round) => round,
                Err(e) => {
                    failed_rounds += 1;
                    warn!(platform = %platform, attempt = attempts, error = %e, "Scraping round failed");
                    continue;
                }
            };
            let parsed = round.len();
            let admitted = self.admit(round, &mut skip, &mut buffer, target);
            info!(
                platform = %platform,
                attempt = attempts,
                query = query.as_str(),
                parsed,
                admitted,
                buffered = buffer.len(),
                target,
                "Scraping round complete"
            );
        }

        buffer.truncate(target);
        scoring::sort_by_score(&mut buffer);

        if buffer.len() < target {
            info!(platform = %platform, found = buffer.len(), target, attempts, "Search ended below target");
        }

        ScrapeOutcome {
            platform,
            candidates: buffer,
            attempts,
            failed_rounds,
        }
    }

    /// Run one job and return its parsed, scored candidates.
    async fn run_round(&self, adapter: &dyn PlatformAdapter, job: &ScrapeJob) -> Result<Vec<ScrapedCandidate>> {
        let raw = self.runner.run(job).await?;
        let mut candidates = adapter.parse(raw);
        candidates.truncate(job.result_hint);

        let transient = ScrapingFilter::default();
        for candidate in &mut candidates {
            candidate.talent_score = Some(scoring::score(candidate, &transient).total);
        }
        Ok(candidates)
    }

    /// Move fresh candidates into the buffer and the shared index. Returns how many were admitted.
    fn admit(
        &self,
        round: Vec<ScrapedCandidate>,
        skip: &mut SkipSet,
        buffer: &mut Vec<ScrapedCandidate>,
        target: usize,
    ) -> usize {
        let mut dedup = self.dedup.lock().unwrap_or_else(PoisonError::into_inner);
        let mut admitted = 0;
        for candidate in round {
            if buffer.len() >= target {
                break;
            }
            if skip.contains(&candidate) || dedup.is_duplicate(&candidate) {
                continue;
            }
            dedup.register_candidate(&candidate);
            skip.claim(&candidate);
            buffer.push(candidate);
            admitted += 1;
        }
        admitted
    }
}
