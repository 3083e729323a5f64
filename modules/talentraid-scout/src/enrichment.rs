// Default enrichment collaborator: one chat completion per candidate.
//
// Failures never escape a batch. A candidate whose call fails or whose reply
// cannot be read comes back as a minimal record instead.

use std::sync::LazyLock;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use ai_client::{extract_json_object, truncate_to_char_boundary, OpenAi};
use talentraid_common::{EnrichedCandidate, Platform, ScrapedCandidate};

use crate::platforms::parse_number;
use crate::traits::CandidateEnricher;

const SYSTEM_PROMPT: &str = "You are a data enrichment specialist. Extract and infer professional \
information from freelancer profiles. Always respond with valid JSON.";

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 500;
const MAX_BIO_BYTES: usize = 2_000;

/// Confidence when the model answered but the reply was not usable JSON.
const UNREADABLE_REPLY_CONFIDENCE: f64 = 0.5;
/// Confidence when the call itself failed.
const FAILED_CALL_CONFIDENCE: f64 = 0.4;

/// Addresses on these domains are marketplace relays, not contact emails.
const MARKETPLACE_EMAIL_DOMAINS: [&str; 2] = ["upwork.com", "fiverr.com"];

static EMAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

pub struct OpenAiEnricher {
    ai: OpenAi,
    concurrency: usize,
}

impl OpenAiEnricher {
    pub fn new(ai: OpenAi, concurrency: usize) -> Self {
        Self {
            ai,
            concurrency: concurrency.max(1),
        }
    }

    async fn enrich_one(&self, candidate: ScrapedCandidate) -> EnrichedCandidate {
        let prompt = build_prompt(&candidate);
        let reply = match self
            .ai
            .chat_completion(SYSTEM_PROMPT, prompt, TEMPERATURE, MAX_TOKENS)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(candidate = candidate.name.as_str(), error = %e, "Enrichment call failed");
                return EnrichedCandidate::minimal(candidate, FAILED_CALL_CONFIDENCE);
            }
        };

        match serde_json::from_str::<EnrichmentReply>(extract_json_object(&reply)) {
            Ok(parsed) => merge(candidate, parsed),
            Err(e) => {
                warn!(candidate = candidate.name.as_str(), error = %e, "Unreadable enrichment reply");
                EnrichedCandidate::minimal(candidate, UNREADABLE_REPLY_CONFIDENCE)
            }
        }
    }
}

#[async_trait]
impl CandidateEnricher for OpenAiEnricher {
    async fn enrich_batch(&self, candidates: &[ScrapedCandidate]) -> Result<Vec<EnrichedCandidate>> {
        info!(count = candidates.len(), concurrency = self.concurrency, model = self.ai.model(), "Enriching candidates");
        let enriched: Vec<EnrichedCandidate> = stream::iter(candidates.iter().cloned())
            .map(|candidate| self.enrich_one(candidate))
            .buffered(self.concurrency)
            .collect()
            .await;
        Ok(enriched)
    }

    async fn is_reachable(&self) -> bool {
        self.ai.is_reachable().await
    }
}

/// What the model is asked to return. Every field is optional; models drift.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct EnrichmentReply {
    linked_in_url: Option<String>,
    business_emails: Option<Vec<String>>,
    personal_emails: Option<Vec<String>>,
    photo_validated: Option<bool>,
    confidence_score: Option<f64>,
    skills: Option<Vec<String>>,
    experience: Option<Value>,
    psychological_profile: Option<String>,
    business_moment: Option<String>,
    sales_angle: Option<String>,
    bottleneck: Option<String>,
}

fn merge(mut candidate: ScrapedCandidate, reply: EnrichmentReply) -> EnrichedCandidate {
    if let Some(skills) = reply.skills.filter(|s| !s.is_empty()) {
        candidate.skills = skills;
    }
    if let Some(years) = parse_number(reply.experience.as_ref()) {
        candidate.years_experience = Some(years);
    }

    let emails = reply
        .business_emails
        .into_iter()
        .flatten()
        .chain(reply.personal_emails.into_iter().flatten())
        .filter(|e| is_contact_email(e));

    let confidence = reply
        .confidence_score
        .filter(|c| c.is_finite())
        .unwrap_or(UNREADABLE_REPLY_CONFIDENCE);

    let mut enriched = EnrichedCandidate::minimal(candidate, confidence).with_emails(emails);
    enriched.linked_in_url = reply
        .linked_in_url
        .map(|u| u.trim().to_string())
        .filter(|u| Platform::LinkedIn.owns_url(u));
    enriched.photo_validated = reply.photo_validated.unwrap_or(false);
    enriched.psychological_profile = non_blank(reply.psychological_profile);
    enriched.business_moment = non_blank(reply.business_moment);
    enriched.sales_angle = non_blank(reply.sales_angle);
    enriched.bottleneck = non_blank(reply.bottleneck);
    enriched
}

fn is_contact_email(email: &str) -> bool {
    let email = email.trim().to_lowercase();
    EMAIL.is_match(&email)
        && !MARKETPLACE_EMAIL_DOMAINS
            .iter()
            .any(|domain| email.contains(domain))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "null")
}

fn build_prompt(candidate: &ScrapedCandidate) -> String {
    let certifications = if candidate.certifications.is_empty() {
        "None".to_string()
    } else {
        candidate.certifications.join(", ")
    };
    format!(
        r#"Analyze this freelancer profile and extract structured information.
Write every free-text field in Spanish.

Profile Name: {name}
Platform: {platform}
Username: {username}
Title: {title}
Job Success Rate: {success}%
Hourly Rate: ${rate}
Country: {country}
Certifications: {certifications}
Bio: {bio}

Provide:
1. Probable LinkedIn profile URL (null if unknown)
2. Plausible business and personal emails
3. Whether the profile looks legitimate (photoValidated)
4. Identity confidence between 0 and 1
5. Core skills based on title and certifications
6. Estimated years of experience
7. psychologicalProfile: working mindset as shown by bio and title
8. businessMoment: career stage (starting, scaling, established expert)
9. salesAngle: most persuasive angle to pitch a collaboration
10. bottleneck: main current challenge

Respond ONLY with JSON, no markdown:
{{
  "linkedInUrl": "string or null",
  "businessEmails": ["..."],
  "personalEmails": ["..."],
  "photoValidated": false,
  "confidenceScore": 0.0,
  "skills": ["..."],
  "experience": "N years or null",
  "psychologicalProfile": "string",
  "businessMoment": "string",
  "salesAngle": "string",
  "bottleneck": "string"
}}"#,
        name = candidate.name,
        platform = candidate.platform,
        username = candidate.platform_username,
        title = candidate.title,
        success = candidate.job_success_rate,
        rate = candidate.hourly_rate,
        country = candidate.country,
        certifications = certifications,
        bio = truncate_to_char_boundary(&candidate.bio, MAX_BIO_BYTES),
    )
}
