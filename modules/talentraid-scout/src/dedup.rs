// Duplicate detection across scraping rounds.
//
// Identity keys in priority order: profile URL, username, email, then a fuzzy
// pass over normalized names. Empty keys are never indexed or matched.
//
// The index is plain state with no interior locking; share it as
// `Arc<Mutex<DedupIndex>>` and never hold the guard across an `.await`.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use talentraid_common::ScrapedCandidate;

/// Same-bucket similarity at or above which two names are the same person.
pub const BUCKET_SIMILARITY: f64 = 0.85;
/// Cross-bucket similarity threshold for the global scan.
pub const GLOBAL_SIMILARITY: f64 = 0.90;

const NAME_KEY_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DedupStats {
    pub urls: usize,
    pub usernames: usize,
    pub emails: usize,
    pub names: usize,
}

#[derive(Debug, Default)]
pub struct DedupIndex {
    urls: HashSet<String>,
    usernames: HashSet<String>,
    emails: HashSet<String>,
    /// Normalized name → original spellings seen under it.
    names: HashMap<String, Vec<String>>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_duplicate(&self, candidate: &ScrapedCandidate) -> bool {
        if let Some(url) = url_key(&candidate.profile_url) {
            if self.urls.contains(&url) {
                debug!(url = url.as_str(), "Duplicate by profile URL");
                return true;
            }
        }
        if let Some(username) = lower_key(&candidate.platform_username) {
            if self.usernames.contains(&username) {
                debug!(username = username.as_str(), "Duplicate by username");
                return true;
            }
        }
        if let Some(email) = candidate.email.as_deref().and_then(lower_key) {
            if self.emails.contains(&email) {
                debug!("Duplicate by email");
                return true;
            }
        }
        self.is_fuzzy_duplicate(&candidate.name)
    }

    fn is_fuzzy_duplicate(&self, name: &str) -> bool {
        let key = normalize_name(name);
        if key.is_empty() {
            return false;
        }

        if let Some(variants) = self.names.get(&key) {
            if let Some(hit) = variants
                .iter()
                .find(|v| name_similarity(name, v) >= BUCKET_SIMILARITY)
            {
                debug!(name, matched = hit.as_str(), "Fuzzy duplicate in bucket");
                return true;
            }
        }

        if let Some(hit) = self
            .names
            .values()
            .flatten()
            .find(|v| name_similarity(name, v) >= GLOBAL_SIMILARITY)
        {
            debug!(name, matched = hit.as_str(), "Fuzzy duplicate across buckets");
            return true;
        }
        false
    }

    /// Insert every non-empty identity key of `candidate`.
    pub fn register_candidate(&mut self, candidate: &ScrapedCandidate) {
        if let Some(url) = url_key(&candidate.profile_url) {
            self.urls.insert(url);
        }
        if let Some(username) = lower_key(&candidate.platform_username) {
            self.usernames.insert(username);
        }
        if let Some(email) = candidate.email.as_deref().and_then(lower_key) {
            self.emails.insert(email);
        }
        let key = normalize_name(&candidate.name);
        if !key.is_empty() {
            let variants = self.names.entry(key).or_default();
            let original = candidate.name.trim().to_string();
            if !variants.contains(&original) {
                variants.push(original);
            }
        }
    }

    pub fn register_candidates<'a>(&mut self, candidates: impl IntoIterator<Item = &'a ScrapedCandidate>) {
        for candidate in candidates {
            self.register_candidate(candidate);
        }
    }

    /// Drop candidates already known to the index. Does not register anything.
    pub fn filter_duplicates(&self, candidates: Vec<ScrapedCandidate>) -> Vec<ScrapedCandidate> {
        candidates
            .into_iter()
            .filter(|c| !self.is_duplicate(c))
            .collect()
    }

    pub fn stats(&self) -> DedupStats {
        DedupStats {
            urls: self.urls.len(),
            usernames: self.usernames.len(),
            emails: self.emails.len(),
            names: self.names.len(),
        }
    }

    pub fn clear(&mut self) {
        self.urls.clear();
        self.usernames.clear();
        self.emails.clear();
        self.names.clear();
    }
}

/// Keep the first occurrence per identity key. Independent of any index.
pub fn deduplicate_array(candidates: Vec<ScrapedCandidate>) -> Vec<ScrapedCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(identity_key(c)))
        .collect()
}

fn identity_key(candidate: &ScrapedCandidate) -> String {
    if let Some(url) = url_key(&candidate.profile_url) {
        return format!("url:{url}");
    }
    if let Some(username) = lower_key(&candidate.platform_username) {
        return format!("user:{username}");
    }
    if let Some(email) = candidate.email.as_deref().and_then(lower_key) {
        return format!("email:{email}");
    }
    format!("name:{}", normalize_name(&candidate.name))
}

fn lower_key(raw: &str) -> Option<String> {
    let key = raw.trim().to_lowercase();
    (!key.is_empty()).then_some(key)
}

fn url_key(raw: &str) -> Option<String> {
    let key = normalize_url(raw);
    (!key.is_empty()).then_some(key)
}

/// Host without `www.` plus path, lowercased, one trailing slash removed.
/// Unparsable input falls back to the trimmed, lowercased string.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let normalized = match url::Url::parse(trimmed) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default();
            let host = host.strip_prefix("www.").unwrap_or(host);
            format!("{host}{}", parsed.path()).to_lowercase()
        }
        Err(_) => trimmed.to_lowercase(),
    };
    match normalized.strip_suffix('/') {
        Some(stripped) => stripped.to_string(),
        None => normalized,
    }
}

/// Lowercase, keep letters/digits/underscore/whitespace, collapse whitespace, cap at 50 chars.
pub fn normalize_name(name: &str) -> String {
    let kept: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(NAME_KEY_MAX_CHARS)
        .collect()
}

/// `1 - levenshtein / longer_length`, case-insensitive, over chars.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - strsim::levenshtein(&a, &b) as f64 / longest as f64
}
