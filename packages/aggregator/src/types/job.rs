//! Canonical job posting and its identity keys.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::source::{Source, WorkType};

/// Canonical de-duplication key for a posting.
///
/// Hex SHA-256, so keys from different derivations share one namespace
/// and can live in the same seen-set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Key for a posting the board identifies itself.
    pub fn from_external_id(source: Source, external_id: &str) -> Self {
        Self::digest(&["ext", source.as_str(), external_id.trim()])
    }

    /// Key from normalized (title, company, location), optionally scoped to a board.
    ///
    /// Exact match on the normalized text only. This approximates identity:
    /// two genuinely distinct postings with the same title, company and
    /// location collapse, while any wording difference keeps them apart.
    pub fn from_content(
        title: &str,
        company: &str,
        location: &str,
        source: Option<Source>,
    ) -> Self {
        let title = normalize_for_hash(title);
        let company = normalize_for_hash(company);
        let location = normalize_for_hash(location);
        match source {
            Some(source) => Self::digest(&["content", source.as_str(), &title, &company, &location]),
            None => Self::digest(&["content", &title, &company, &location]),
        }
    }

    /// Rebuild a key previously produced by [`IdentityKey::as_str`].
    pub fn from_stored(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn digest(parts: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                hasher.update([0x1f]);
            }
            hasher.update(part.as_bytes());
        }
        Self(format!("{:x}", hasher.finalize()))
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase, drop punctuation, collapse whitespace.
fn normalize_for_hash(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Where a job's posting time came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostingTimeOrigin {
    /// Board reported it
    Reported,
    /// Board omitted it (or it was unparseable); fetch time used instead
    FetchTime,
    /// Board reported a time too far in the future; clamped to fetch time
    ClampedFuture,
}

/// One job posting in canonical form.
///
/// Built fresh by the normalizer on every fetch cycle; never mutated in
/// place except for its quality score, which only the scorer assigns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Primary identity: (source, external id) when known, else content hash with source
    pub identity_key: IdentityKey,

    /// Source-free content hash, used to catch the same posting across boards
    pub content_key: IdentityKey,

    pub source: Source,
    pub external_id: Option<String>,

    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,

    /// Annualized, `salary_min <= salary_max` when both are present
    pub salary_min: Option<u64>,
    pub salary_max: Option<u64>,

    pub posting_time: DateTime<Utc>,
    pub posting_time_origin: PostingTimeOrigin,
    pub fetched_at: DateTime<Utc>,

    /// Plain text, HTML stripped and length bounded
    pub description_excerpt: Option<String>,

    pub work_type: Option<WorkType>,

    pub(crate) quality_score: f64,
}

impl Job {
    /// Score in `[0, 100]`; zero until the scorer has run.
    pub fn quality_score(&self) -> f64 {
        self.quality_score
    }

    pub fn has_salary(&self) -> bool {
        self.salary_min.is_some() || self.salary_max.is_some()
    }

    /// Text searched by keyword criteria.
    pub fn searchable_text(&self) -> String {
        match &self.description_excerpt {
            Some(desc) => format!("{} {}", self.title, desc),
            None => self.title.clone(),
        }
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary::from(self)
    }
}

/// What a search caller sees for each job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub posted_at: DateTime<Utc>,
    pub quality_score: f64,
    pub source: Source,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            title: job.title.clone(),
            company: job.company.clone(),
            location: job.location.clone(),
            url: job.url.clone(),
            posted_at: job.posting_time,
            quality_score: job.quality_score,
            source: job.source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_key_ignores_case_and_punctuation() {
        let a = IdentityKey::from_content("Senior Rust Engineer", "Acme, Inc.", "Toronto, ON", None);
        let b = IdentityKey::from_content("senior  rust engineer", "ACME Inc", "Toronto ON", None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_content_key_is_exact_not_fuzzy() {
        let a = IdentityKey::from_content("Rust Engineer", "Acme", "Toronto", None);
        let b = IdentityKey::from_content("Rust Engineer II", "Acme", "Toronto", None);
        assert_ne!(a, b);
    }

    #[test]
    fn test_source_scoping_changes_key() {
        let scoped = IdentityKey::from_content("Dev", "Acme", "Remote", Some(Source::Indeed));
        let unscoped = IdentityKey::from_content("Dev", "Acme", "Remote", None);
        let other = IdentityKey::from_content("Dev", "Acme", "Remote", Some(Source::LinkedIn));
        assert_ne!(scoped, unscoped);
        assert_ne!(scoped, other);
    }

    #[test]
    fn test_field_boundaries_do_not_collide() {
        let a = IdentityKey::from_content("ab", "c", "d", None);
        let b = IdentityKey::from_content("a", "bc", "d", None);
        assert_ne!(a, b);
    }

    #[test]
    fn test_external_id_key_trims() {
        assert_eq!(
            IdentityKey::from_external_id(Source::LinkedIn, " 123 "),
            IdentityKey::from_external_id(Source::LinkedIn, "123")
        );
        assert_eq!(
            IdentityKey::from_external_id(Source::LinkedIn, "123").as_str().len(),
            64
        );
    }
}
