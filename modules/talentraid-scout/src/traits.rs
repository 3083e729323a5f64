// Trait boundaries for the sourcing pipeline.
//
// JobRunner hides the external scraping job service; CandidateEnricher hides
// the AI enrichment service. Tests swap both for the mocks in `testing`.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use apify_client::{ApifyClient, PollPolicy};
use talentraid_common::{EnrichedCandidate, ScrapedCandidate};

use crate::platforms::ScrapeJob;

// ---------------------------------------------------------------------------
// JobRunner
// ---------------------------------------------------------------------------

#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Submit the job, wait for it to finish, and return its raw dataset items.
    /// An `Err` means this round failed; callers move on to the next one.
    async fn run(&self, job: &ScrapeJob) -> Result<Vec<Value>>;

    /// Whether the service accepts our credentials.
    async fn is_reachable(&self) -> bool;
}

/// Runs jobs as Apify actor runs.
pub struct ApifyRunner {
    client: ApifyClient,
    policy: PollPolicy,
}

impl ApifyRunner {
    pub fn new(client: ApifyClient, policy: PollPolicy) -> Self {
        Self { client, policy }
    }
}

#[async_trait]
impl JobRunner for ApifyRunner {
    async fn run(&self, job: &ScrapeJob) -> Result<Vec<Value>> {
        match self.client.run_actor(job.actor_id, &job.input, self.policy).await {
            Ok(items) => Ok(items),
            Err(e) if e.is_run_outcome() => {
                tracing::warn!(platform = %job.platform, query = %job.query, error = %e, "Actor run did not succeed");
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn is_reachable(&self) -> bool {
        self.client.validate_token().await
    }
}

// ---------------------------------------------------------------------------
// CandidateEnricher
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CandidateEnricher: Send + Sync {
    /// Enrich a batch. Output order follows input order; a candidate the
    /// enricher could not handle may be missing from the output.
    async fn enrich_batch(&self, candidates: &[ScrapedCandidate]) -> Result<Vec<EnrichedCandidate>>;

    async fn is_reachable(&self) -> bool;
}
