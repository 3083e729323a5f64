// Raid lifecycle: Phase 1: Scraping → Phase 2: Enrichment → Ready to Export.
//
// RaidService is constructed once by the application and owns every raid in
// the process. At most one phase operation runs per raid at a time; a second
// caller gets `RaidError::Busy` instead of racing the first.
//
// A phase that fails returns the raid untouched so the caller can retry.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use talentraid_common::{Platform, Raid, RaidStatus, ScrapedCandidate, ScrapingFilter};

use crate::scoring;
use crate::search::{SearchService, DEFAULT_MAX_ATTEMPTS};
use crate::traits::CandidateEnricher;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RaidError {
    #[error("raid {0} not found")]
    NotFound(Uuid),

    #[error("raid {0} already has an operation in flight")]
    Busy(Uuid),
}

/// Reachability of both external collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub job_service: bool,
    pub enrichment: bool,
}

impl ConnectionStatus {
    pub fn all_ok(&self) -> bool {
        self.job_service && self.enrichment
    }
}

pub struct RaidService {
    raids: RwLock<HashMap<Uuid, Raid>>,
    in_flight: Mutex<HashSet<Uuid>>,
    search: SearchService,
    enricher: Arc<dyn CandidateEnricher>,
    max_attempts: u32,
}

/// Marks a raid busy for as long as it lives.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<Uuid>>,
    raid_id: Uuid,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.raid_id);
    }
}

impl RaidService {
    pub fn new(search: SearchService, enricher: Arc<dyn CandidateEnricher>) -> Self {
        Self {
            raids: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
            search,
            enricher,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Create a raid in Phase 1 with empty lists and zeroed counters.
    pub fn start_raid(&self, name: &str, filter: &ScrapingFilter) -> Raid {
        let raid = Raid::new(name);
        info!(
            raid_id = %raid.id,
            name,
            keyword = filter.keyword.as_str(),
            platforms = ?filter.platforms,
            "Raid started"
        );
        self.store(&raid);
        raid
    }

    pub fn get_raid(&self, raid_id: Uuid) -> Option<Raid> {
        self.raids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&raid_id)
            .cloned()
    }

    /// Every raid, oldest first.
    pub fn all_raids(&self) -> Vec<Raid> {
        let mut raids: Vec<Raid> = self
            .raids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        raids.sort_by_key(|r| r.created_at);
        raids
    }

    /// Phase 1. Scrape every requested platform in order, merge, sort by score
    /// and move to Phase 2. When every round on every platform failed the raid
    /// is returned unchanged; platforms that ran no rounds do not count as failed.
    pub async fn execute_scraping(&self, raid_id: Uuid, filter: &ScrapingFilter) -> Result<Raid, RaidError> {
        let _guard = self.begin(raid_id)?;
        let mut raid = self.get_raid(raid_id).ok_or(RaidError::NotFound(raid_id))?;
        if raid.status != RaidStatus::Scraping {
            warn!(raid_id = %raid_id, status = %raid.status, "Scraping requested outside Phase 1, ignoring");
            return Ok(raid);
        }

        let platforms = requested_platforms(filter);
        info!(raid_id = %raid_id, platforms = ?platforms, "Raid scraping phase started");

        let mut all_candidates: Vec<ScrapedCandidate> = Vec::new();
        let mut every_platform_failed = true;
        for platform in &platforms {
            let outcome = self.search.scrape(*platform, filter, self.max_attempts).await;
            every_platform_failed &= outcome.all_rounds_failed();
            info!(
                raid_id = %raid_id,
                platform = %platform,
                found = outcome.candidates.len(),
                attempts = outcome.attempts,
                failed_rounds = outcome.failed_rounds,
                "Platform scraping finished"
            );
            all_candidates.extend(outcome.candidates);
        }

        if every_platform_failed {
            warn!(raid_id = %raid_id, "Every scraping round failed, raid left in Phase 1");
            return Ok(raid);
        }

        scoring::sort_by_score(&mut all_candidates);
        let total = all_candidates.len();
        raid.scraping_progress.total = total;
        raid.scraping_progress.completed = total;
        raid.scraping_progress.failed = 0;
        raid.stats.total_scraped = total;
        raid.scraped_candidates = all_candidates;
        raid.status = RaidStatus::Enrichment;
        self.store(&raid);

        info!(raid_id = %raid_id, total, "Raid scraping phase complete");
        Ok(raid)
    }

    /// Phase 2. Hand the whole scraped batch to the enricher and finish the raid.
    /// An enricher error leaves the raid in Phase 2.
    pub async fn execute_enrichment(&self, raid_id: Uuid) -> Result<Raid, RaidError> {
        let _guard = self.begin(raid_id)?;
        let mut raid = self.get_raid(raid_id).ok_or(RaidError::NotFound(raid_id))?;
        if raid.status != RaidStatus::Enrichment {
            warn!(raid_id = %raid_id, status = %raid.status, "Enrichment requested outside Phase 2, ignoring");
            return Ok(raid);
        }

        let total = raid.scraped_candidates.len();
        info!(raid_id = %raid_id, total, "Raid enrichment phase started");

        let enriched = match self.enricher.enrich_batch(&raid.scraped_candidates).await {
            Ok(enriched) => enriched,
            Err(e) => {
                warn!(raid_id = %raid_id, error = %e, "Enrichment failed, raid left in Phase 2");
                return Ok(raid);
            }
        };

        let completed = enriched.len();
        raid.enrichment_progress.total = total;
        raid.enrichment_progress.completed = completed;
        raid.enrichment_progress.failed = total.saturating_sub(completed);
        raid.stats.total_enriched = completed;
        raid.enriched_candidates = enriched;
        raid.status = RaidStatus::ReadyToExport;
        self.store(&raid);

        info!(raid_id = %raid_id, enriched = completed, failed = raid.enrichment_progress.failed, "Raid ready to export");
        Ok(raid)
    }

    pub async fn validate_connections(&self) -> ConnectionStatus {
        let (job_service, enrichment) =
            tokio::join!(self.search.runner().is_reachable(), self.enricher.is_reachable());
        let status = ConnectionStatus {
            job_service,
            enrichment,
        };
        info!(job_service, enrichment, "Validated external connections");
        status
    }

    fn begin(&self, raid_id: Uuid) -> Result<InFlight<'_>, RaidError> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(raid_id) {
            return Err(RaidError::Busy(raid_id));
        }
        Ok(InFlight {
            set: &self.in_flight,
            raid_id,
        })
    }

    fn store(&self, raid: &Raid) {
        self.raids
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(raid.id, raid.clone());
    }
}

/// Platforms in filter order without repeats; every platform when none is named.
fn requested_platforms(filter: &ScrapingFilter) -> Vec<Platform> {
    if filter.platforms.is_empty() {
        return Platform::ALL.to_vec();
    }
    let mut seen = HashSet::new();
    filter
        .platforms
        .iter()
        .copied()
        .filter(|p| seen.insert(*p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platforms_keep_order_without_repeats() {
        let filter = ScrapingFilter::builder()
            .platforms(vec![Platform::LinkedIn, Platform::Upwork, Platform::LinkedIn])
            .build();
        assert_eq!(requested_platforms(&filter), vec![Platform::LinkedIn, Platform::Upwork]);
        assert_eq!(requested_platforms(&ScrapingFilter::default()), Platform::ALL.to_vec());
    }
}
