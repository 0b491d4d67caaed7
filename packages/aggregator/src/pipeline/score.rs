//! Quality scorer.
//!
//! Additive over independent signals, clamped to `[0, 100]`:
//!
//! | signal                | default max |
//! |-----------------------|-------------|
//! | salary present        | 15          |
//! | description           | 15          |
//! | recency (decaying)    | 30          |
//! | source trust          | 20          |
//! | high-value keywords   | 15          |
//! | preferred company     | 10          |

use chrono::{DateTime, Utc};

use crate::types::config::ScoringConfig;
use crate::types::job::Job;

/// Assigns quality scores. The only writer of [`Job::quality_score`].
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    config: ScoringConfig,
}

impl Scorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score `job` as of `now` and store the result on it.
    pub fn apply(&self, job: &mut Job, now: DateTime<Utc>) {
        job.quality_score = score(job, now, &self.config);
    }
}

/// Deterministic score of `job` as of `now`.
///
/// Only the recency term depends on `posting_time`, and it never increases
/// with age, so a more recent posting never scores lower than an otherwise
/// identical older one.
pub fn score(job: &Job, now: DateTime<Utc>, config: &ScoringConfig) -> f64 {
    let total = salary_signal(job, config)
        + description_signal(job, config)
        + recency_signal(job, now, config)
        + source_signal(job, config)
        + keyword_signal(job, config)
        + company_signal(job, config);

    if total.is_nan() {
        return 0.0;
    }
    total.clamp(0.0, 100.0)
}

fn salary_signal(job: &Job, config: &ScoringConfig) -> f64 {
    if job.has_salary() {
        config.salary_weight
    } else {
        0.0
    }
}

fn description_signal(job: &Job, config: &ScoringConfig) -> f64 {
    let len = job
        .description_excerpt
        .as_deref()
        .map(|d| d.chars().count())
        .unwrap_or(0);
    if len == 0 || config.description_min_chars == 0 {
        return if len > 0 { config.description_weight } else { 0.0 };
    }
    let ratio = (len as f64 / config.description_min_chars as f64).min(1.0);
    config.description_weight * ratio
}

fn recency_signal(job: &Job, now: DateTime<Utc>, config: &ScoringConfig) -> f64 {
    let age_hours = ((now - job.posting_time).num_seconds().max(0)) as f64 / 3600.0;
    if config.recency_half_life_hours <= 0.0 {
        return if age_hours == 0.0 { config.recency_weight } else { 0.0 };
    }
    config.recency_weight * 0.5_f64.powf(age_hours / config.recency_half_life_hours)
}

fn source_signal(job: &Job, config: &ScoringConfig) -> f64 {
    config.source_weight * config.trust(job.source)
}

fn keyword_signal(job: &Job, config: &ScoringConfig) -> f64 {
    let text = job.searchable_text().to_lowercase();
    let hits = config
        .high_value_keywords
        .iter()
        .filter(|k| !k.trim().is_empty() && text.contains(&k.to_lowercase()))
        .count();
    (hits as f64 * config.keyword_bonus).min(config.keyword_bonus_cap)
}

fn company_signal(job: &Job, config: &ScoringConfig) -> f64 {
    let company = job.company.to_lowercase();
    let preferred = config
        .preferred_companies
        .iter()
        .any(|c| !c.trim().is_empty() && company.contains(&c.to_lowercase()));
    if preferred {
        config.company_bonus
    } else {
        0.0
    }
}
