// Test mocks for the sourcing pipeline.
//
// Two mocks matching the two trait boundaries:
// - ScriptedRunner (JobRunner) — per-platform queue of scripted rounds
// - MockEnricher (CandidateEnricher) — deterministic pass-through enrichment
//
// Plus helpers for building raw dataset items and candidates.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use talentraid_common::{EnrichedCandidate, Platform, ScrapedCandidate};

use crate::platforms::ScrapeJob;
use crate::traits::{CandidateEnricher, JobRunner};

// ---------------------------------------------------------------------------
// ScriptedRunner
// ---------------------------------------------------------------------------

enum ScriptedRound {
    Items(Vec<Value>),
    Failure(String),
}

/// Replays scripted rounds in order, per platform. Once a platform's script is
/// exhausted every further round returns an empty dataset.
/// Builder pattern: `.on_round()`, `.on_failure()`, `.failing()`.
pub struct ScriptedRunner {
    rounds: Mutex<HashMap<Platform, VecDeque<ScriptedRound>>>,
    jobs: Mutex<Vec<ScrapeJob>>,
    fail_everything: bool,
    reachable: bool,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            rounds: Mutex::new(HashMap::new()),
            jobs: Mutex::new(Vec::new()),
            fail_everything: false,
            reachable: true,
        }
    }

    /// Every round on every platform fails.
    pub fn failing() -> Self {
        Self {
            fail_everything: true,
            reachable: false,
            ..Self::new()
        }
    }

    pub fn on_round(mut self, platform: Platform, items: Vec<Value>) -> Self {
        self.push(platform, ScriptedRound::Items(items));
        self
    }

    pub fn on_failure(mut self, platform: Platform, message: &str) -> Self {
        self.push(platform, ScriptedRound::Failure(message.to_string()));
        self
    }

    fn push(&mut self, platform: Platform, round: ScriptedRound) {
        self.rounds
            .get_mut()
            .unwrap()
            .entry(platform)
            .or_default()
            .push_back(round);
    }

    /// Jobs received so far, in order.
    pub fn jobs(&self) -> Vec<ScrapeJob> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn rounds_for(&self, platform: Platform) -> usize {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.platform == platform)
            .count()
    }
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobRunner for ScriptedRunner {
    async fn run(&self, job: &ScrapeJob) -> Result<Vec<Value>> {
        self.jobs.lock().unwrap().push(job.clone());
        if self.fail_everything {
            bail!("job service unavailable");
        }
        let next = self
            .rounds
            .lock()
            .unwrap()
            .get_mut(&job.platform)
            .and_then(VecDeque::pop_front);
        match next {
            Some(ScriptedRound::Items(items)) => Ok(items),
            Some(ScriptedRound::Failure(message)) => bail!(message),
            None => Ok(Vec::new()),
        }
    }

    async fn is_reachable(&self) -> bool {
        self.reachable
    }
}

// ---------------------------------------------------------------------------
// MockEnricher
// ---------------------------------------------------------------------------

/// Enriches every candidate with a fixed confidence and one email derived
/// from its username. Builder pattern: `.skipping()`, `.failing()`.
pub struct MockEnricher {
    skipped: HashSet<String>,
    fail: bool,
    batches: Mutex<Vec<usize>>,
}

pub const MOCK_CONFIDENCE: f64 = 0.9;

impl MockEnricher {
    pub fn new() -> Self {
        Self {
            skipped: HashSet::new(),
            fail: false,
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Leave the named candidate out of the output.
    pub fn skipping(mut self, name: &str) -> Self {
        self.skipped.insert(name.to_string());
        self
    }

    /// Sizes of the batches received so far.
    pub fn batches(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }
}

impl Default for MockEnricher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CandidateEnricher for MockEnricher {
    async fn enrich_batch(&self, candidates: &[ScrapedCandidate]) -> Result<Vec<EnrichedCandidate>> {
        self.batches.lock().unwrap().push(candidates.len());
        if self.fail {
            bail!("enrichment service unavailable");
        }
        Ok(candidates
            .iter()
            .filter(|c| !self.skipped.contains(&c.name))
            .map(|c| {
                let email = format!("{}@example.com", c.platform_username);
                EnrichedCandidate::minimal(c.clone(), MOCK_CONFIDENCE).with_emails([email])
            })
            .collect())
    }

    async fn is_reachable(&self) -> bool {
        !self.fail
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A raw Fiverr dataset item for a seller with a 4.8 rating and a $40 rate.
pub fn fiverr_item(name: &str, username: &str) -> Value {
    json!({
        "name": name,
        "username": username,
        "url": format!("https://www.fiverr.com/{username}"),
        "title": "I will build your Flutter app",
        "price": "$40",
        "rating": 4.8,
    })
}

/// A raw Fiverr item whose name is missing; parsing drops it.
pub fn nameless_fiverr_item(username: &str) -> Value {
    json!({
        "name": "",
        "url": format!("https://www.fiverr.com/{username}"),
    })
}

pub fn candidate(name: &str, platform: Platform, profile_url: &str) -> ScrapedCandidate {
    ScrapedCandidate::builder()
        .name(name)
        .platform(platform)
        .profile_url(profile_url)
        .build()
}
