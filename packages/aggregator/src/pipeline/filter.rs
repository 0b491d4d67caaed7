//! Recency and criteria filter.
//!
//! Missing salary or work type never disqualifies a job; boards omit them
//! too often. Exclusions always win over inclusions, and titles carrying a
//! scam marker are dropped before either is consulted.

use chrono::{DateTime, Duration, Utc};

use crate::pipeline::location::location_matches;
use crate::types::criteria::SearchCriteria;
use crate::types::job::Job;

/// Posting times further ahead of `now` than this cannot be judged for recency.
const MAX_FUTURE_SKEW_SECS: i64 = 300;

/// Why a job failed its criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TooOld,
    UnverifiablePostingTime,
    /// Title carries a scam marker
    Suspicious,
    Excluded,
    NoKeywordMatch,
    Location,
    SalaryTooLow,
    SalaryTooHigh,
    WorkType,
}

/// True when `job` satisfies every constraint in `criteria` at `now`.
pub fn matches(job: &Job, criteria: &SearchCriteria, now: DateTime<Utc>) -> bool {
    evaluate(job, criteria, now).is_ok()
}

/// Like [`matches`], but reports the first failed constraint.
pub fn evaluate(job: &Job, criteria: &SearchCriteria, now: DateTime<Utc>) -> Result<(), Rejection> {
    check_recency(job, criteria, now)?;

    let title = job.title.to_lowercase();
    if criteria.blocked_title_terms.iter().any(|term| term.matches(&title)) {
        return Err(Rejection::Suspicious);
    }

    let text = job.searchable_text().to_lowercase();
    if criteria.exclude_keywords.iter().any(|term| term.matches(&text)) {
        return Err(Rejection::Excluded);
    }
    if !criteria.keywords.is_empty() && !criteria.keywords.iter().any(|term| term.matches(&text)) {
        return Err(Rejection::NoKeywordMatch);
    }

    if !location_matches(&job.location, &criteria.locations) {
        return Err(Rejection::Location);
    }

    if let (Some(min), Some(job_max)) = (criteria.min_salary, job.salary_max) {
        if job_max < min {
            return Err(Rejection::SalaryTooLow);
        }
    }
    if let (Some(max), Some(job_min)) = (criteria.max_salary, job.salary_min) {
        if job_min > max {
            return Err(Rejection::SalaryTooHigh);
        }
    }

    if let (Some(wanted), Some(actual)) = (criteria.work_type, job.work_type) {
        if wanted != actual {
            return Err(Rejection::WorkType);
        }
    }

    Ok(())
}

fn check_recency(job: &Job, criteria: &SearchCriteria, now: DateTime<Utc>) -> Result<(), Rejection> {
    let age = now - job.posting_time;
    if age < -Duration::seconds(MAX_FUTURE_SKEW_SECS) {
        return Err(Rejection::UnverifiablePostingTime);
    }
    if age > criteria.max_age.duration() {
        return Err(Rejection::TooOld);
    }
    Ok(())
}
