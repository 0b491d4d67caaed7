//! Configuration types for the pipeline and the scorer.

use std::collections::BTreeMap;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::source::Source;

/// Longest seen-set retention honoured: ten years.
pub const MAX_SEEN_RETENTION_DAYS: i64 = 3_650;

/// Largest tolerated future skew: one day.
const MAX_CLOCK_SKEW_SECS: i64 = 86_400;

/// Configuration for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound on each source fetch. A timeout fails that source only.
    ///
    /// Default: 30 seconds.
    pub fetch_timeout: StdDuration,

    /// How far in the future a reported posting time may be before it is
    /// clamped to fetch time.
    ///
    /// Default: 300 seconds.
    pub clock_skew_secs: i64,

    /// Description excerpt length, in characters.
    ///
    /// Default: 500.
    pub description_max_chars: usize,

    /// Seen-set entries older than this may be pruned. Pruned postings can
    /// be surfaced again if a board re-lists them.
    ///
    /// Clamped to `1..=MAX_SEEN_RETENTION_DAYS` when applied.
    ///
    /// Default: 30 days.
    pub seen_retention_days: i64,

    pub scoring: ScoringConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: StdDuration::from_secs(30),
            clock_skew_secs: 300,
            description_max_chars: 500,
            seen_retention_days: 30,
            scoring: ScoringConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetch_timeout(mut self, timeout: StdDuration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_clock_skew_secs(mut self, secs: i64) -> Self {
        self.clock_skew_secs = secs;
        self
    }

    pub fn with_description_max_chars(mut self, chars: usize) -> Self {
        self.description_max_chars = chars;
        self
    }

    pub fn with_seen_retention_days(mut self, days: i64) -> Self {
        self.seen_retention_days = days;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn clock_skew(&self) -> Duration {
        Duration::try_seconds(self.clock_skew_secs.clamp(0, MAX_CLOCK_SKEW_SECS))
            .unwrap_or_else(Duration::zero)
    }

    pub fn seen_retention(&self) -> Duration {
        Duration::try_days(self.seen_retention_days.clamp(1, MAX_SEEN_RETENTION_DAYS))
            .unwrap_or_else(|| Duration::days(1))
    }

    /// Seen entries older than this, as of `now`, may be pruned.
    pub fn seen_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.seen_retention())
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Weights for the additive quality score.
///
/// Every signal is independent; the sum is clamped to `[0, 100]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Awarded when any salary figure is known
    pub salary_weight: f64,

    /// Awarded in full for a description of at least `description_min_chars`
    pub description_weight: f64,
    pub description_min_chars: usize,

    /// Awarded in full at age zero, halving every `recency_half_life_hours`
    pub recency_weight: f64,
    pub recency_half_life_hours: f64,

    /// Multiplied by the per-source trust factor (0.0 to 1.0)
    pub source_weight: f64,
    pub source_trust: BTreeMap<Source, f64>,

    /// Per high-value keyword found in title or description, up to the cap
    pub keyword_bonus: f64,
    pub keyword_bonus_cap: f64,
    pub high_value_keywords: Vec<String>,

    /// Awarded when the company name contains one of `preferred_companies`
    pub company_bonus: f64,
    pub preferred_companies: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            salary_weight: 15.0,
            description_weight: 15.0,
            description_min_chars: 100,
            recency_weight: 30.0,
            recency_half_life_hours: 6.0,
            source_weight: 20.0,
            source_trust: BTreeMap::from([
                (Source::LinkedIn, 1.0),
                (Source::Indeed, 0.85),
                (Source::Glassdoor, 0.75),
                (Source::ZipRecruiter, 0.7),
            ]),
            keyword_bonus: 5.0,
            keyword_bonus_cap: 15.0,
            high_value_keywords: [
                "senior", "lead", "principal", "staff", "rust", "python", "java", "typescript",
                "kubernetes", "aws",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            company_bonus: 10.0,
            preferred_companies: [
                "google", "microsoft", "amazon", "apple", "meta", "netflix", "uber", "airbnb",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl ScoringConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the high-value keyword list.
    pub fn with_high_value_keywords(
        mut self,
        keywords: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.high_value_keywords = keywords.into_iter().map(|k| k.into()).collect();
        self
    }

    /// Replace the preferred company list.
    pub fn with_preferred_companies(
        mut self,
        companies: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.preferred_companies = companies.into_iter().map(|c| c.into()).collect();
        self
    }

    pub fn with_source_trust(mut self, source: Source, trust: f64) -> Self {
        self.source_trust.insert(source, trust.clamp(0.0, 1.0));
        self
    }

    pub fn with_recency_half_life_hours(mut self, hours: f64) -> Self {
        self.recency_half_life_hours = hours;
        self
    }

    /// Trust factor for a board; unknown boards get half trust.
    pub fn trust(&self, source: Source) -> f64 {
        self.source_trust.get(&source).copied().unwrap_or(0.5)
    }
}
