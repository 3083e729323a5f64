// Talent scoring: a deterministic 0..=100 score from six bounded components.
//
// `score_at` is the pure core; `score` evaluates freshness against the wall clock.

use chrono::{DateTime, Utc};
use serde::Serialize;

use talentraid_common::{ScrapedCandidate, ScrapingFilter};

const SUCCESS_RATE_CAP: f64 = 40.0;
const EXPERIENCE_CAP: f64 = 30.0;
const SKILLS_CAP: f64 = 20.0;

/// Badge vocabulary that earns the relevance bonus. Matched as substrings.
const BADGE_VOCABULARY: [&str; 7] = [
    "top rated",
    "pro",
    "verified",
    "certified",
    "preferred",
    "award",
    "rising",
];

/// Per-component contribution to a talent score.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringBreakdown {
    pub success_rate: f64,
    pub experience: f64,
    pub skills_match: f64,
    pub rate_relevance: f64,
    pub recency_bonus: f64,
    pub relevance_bonus: f64,
}

impl ScoringBreakdown {
    pub fn sum(&self) -> f64 {
        self.success_rate
            + self.experience
            + self.skills_match
            + self.rate_relevance
            + self.recency_bonus
            + self.relevance_bonus
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TalentScore {
    pub total: u8,
    pub breakdown: ScoringBreakdown,
}

/// Score against the current time.
pub fn score(candidate: &ScrapedCandidate, filter: &ScrapingFilter) -> TalentScore {
    score_at(candidate, filter, Utc::now())
}

/// Score with an explicit "now" so freshness is reproducible.
pub fn score_at(candidate: &ScrapedCandidate, filter: &ScrapingFilter, now: DateTime<Utc>) -> TalentScore {
    let breakdown = ScoringBreakdown {
        success_rate: success_rate_points(candidate.job_success_rate),
        experience: experience_points(candidate),
        skills_match: skills_points(&candidate.skills, &filter.skills),
        rate_relevance: rate_points(candidate.hourly_rate),
        recency_bonus: recency_points(candidate.scraped_at, now),
        relevance_bonus: badge_points(&candidate.badges),
    };
    let total = breakdown.sum().round().clamp(0.0, 100.0) as u8;
    TalentScore { total, breakdown }
}

/// Keep candidates whose stored score is at least `min_score`. Unscored candidates count as 0.
pub fn filter_by_score(candidates: Vec<ScrapedCandidate>, min_score: u8) -> Vec<ScrapedCandidate> {
    candidates
        .into_iter()
        .filter(|c| c.score_or_zero() >= min_score)
        .collect()
}

/// Stable sort, best first.
pub fn sort_by_score(candidates: &mut [ScrapedCandidate]) {
    candidates.sort_by(|a, b| b.score_or_zero().cmp(&a.score_or_zero()));
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

fn finite_non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn success_rate_points(job_success_rate: f64) -> f64 {
    (finite_non_negative(job_success_rate) * 0.4).min(SUCCESS_RATE_CAP)
}

fn experience_points(candidate: &ScrapedCandidate) -> f64 {
    let jobs = candidate
        .total_jobs
        .filter(|&n| n > 0)
        .map(|n| (n as f64 / 4.0).min(25.0))
        .unwrap_or(0.0);
    let hours = candidate
        .total_hours
        .map(finite_non_negative)
        .map(|h| (h / 500.0).min(10.0))
        .unwrap_or(0.0);
    let years = candidate
        .years_experience
        .map(finite_non_negative)
        .map(|y| y.min(5.0))
        .unwrap_or(0.0);
    (jobs + hours + years).min(EXPERIENCE_CAP)
}

fn skills_points(candidate_skills: &[String], wanted: &[String]) -> f64 {
    let wanted: Vec<String> = wanted
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if wanted.is_empty() {
        return 10.0;
    }

    let have: Vec<String> = candidate_skills
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if have.is_empty() {
        return 0.0;
    }

    let matched = wanted
        .iter()
        .filter(|w| have.iter().any(|h| h.contains(w.as_str()) || w.contains(h.as_str())))
        .count();
    (matched as f64 / wanted.len() as f64 * SKILLS_CAP).round()
}

fn rate_points(hourly_rate: f64) -> f64 {
    let rate = finite_non_negative(hourly_rate);
    if rate == 0.0 {
        2.5
    } else if (25.0..=150.0).contains(&rate) {
        5.0
    } else if (15.0..=200.0).contains(&rate) {
        4.0
    } else if (10.0..=300.0).contains(&rate) {
        2.5
    } else {
        1.0
    }
}

fn recency_points(scraped_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_days = (now - scraped_at).num_seconds() as f64 / 86_400.0;
    if age_days <= 7.0 {
        3.0
    } else if age_days <= 30.0 {
        2.0
    } else if age_days <= 90.0 {
        1.0
    } else {
        0.0
    }
}

fn badge_points(badges: &[String]) -> f64 {
    let earned = badges.iter().any(|badge| {
        let badge = badge.to_lowercase();
        BADGE_VOCABULARY.iter().any(|term| badge.contains(term))
    });
    if earned {
        2.0
    } else {
        0.0
    }
}
