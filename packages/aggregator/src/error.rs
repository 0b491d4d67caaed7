//! Typed errors for the aggregation pipeline.
//!
//! Each family maps to one recovery policy:
//! - [`FetchError`]: per source, recovered by the pipeline (zero results from that source)
//! - [`NormalizationError`]: per record, recovered by dropping the record
//! - [`CriteriaError`]: caller mistake, surfaced before any fetch
//! - [`DedupStateError`]: seen-set storage failure, fails the run

use std::time::Duration;

use thiserror::Error;

use crate::types::source::Source;

/// Errors that fail a whole pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Search criteria were rejected before any fetch
    #[error("invalid search criteria: {0}")]
    Criteria(#[from] CriteriaError),

    /// Seen-set could not be read or written
    #[error("dedup state unavailable: {0}")]
    DedupState(#[from] DedupStateError),

    /// Run was abandoned before its results were committed
    #[error("run cancelled")]
    Cancelled,
}

/// Errors raised by a single source fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Board answered with a non-success status
    #[error("{board} returned HTTP {status}: {message}")]
    Status {
        board: Source,
        status: u16,
        message: String,
    },

    /// Board asked us to back off
    #[error("{0} rate limited the request")]
    RateLimited(Source),

    /// Fetch did not complete in time
    #[error("{board} timed out after {after:?}")]
    Timeout { board: Source, after: Duration },

    /// Response body could not be interpreted
    #[error("malformed response from {board}: {reason}")]
    Malformed { board: Source, reason: String },

    /// No fetcher is configured for the requested board
    #[error("no fetcher configured for {0}")]
    Unsupported(Source),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Http(Box::new(e))
    }
}

/// Errors raised while mapping one raw record to a [`Job`](crate::Job).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    /// A required field is absent or blank
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    /// Posting URL is not an absolute http(s) locator
    #[error("invalid posting url: {url}")]
    InvalidUrl { url: String },
}

/// Errors in caller-supplied search criteria.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CriteriaError {
    #[error("min salary {min} exceeds max salary {max}")]
    SalaryRange { min: u64, max: u64 },

    #[error("invalid time window code: {0}")]
    InvalidTimeWindow(String),

    #[error("max age must be positive")]
    NonPositiveMaxAge,

    #[error("max age of {0}s exceeds the 30 day limit")]
    MaxAgeTooLong(u64),

    #[error("per-source result cap must be at least 1")]
    ZeroResultCap,

    #[error("blank keyword entry")]
    BlankKeyword,

    #[error("unbalanced quote in keyword entry: {0}")]
    UnbalancedQuote(String),

    #[error("min quality score {0} outside 0..=100")]
    QualityOutOfRange(u8),

    #[error("no sources requested")]
    NoSources,

    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("unknown work type: {0}")]
    UnknownWorkType(String),
}

/// Errors reading or writing the seen-set.
#[derive(Debug, Error)]
pub enum DedupStateError {
    /// Storage backend failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A stored timestamp or key could not be decoded
    #[error("corrupt seen-set entry: {0}")]
    Corrupt(String),
}

#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for DedupStateError {
    fn from(e: sqlx::Error) -> Self {
        DedupStateError::Storage(Box::new(e))
    }
}

/// Result type alias for pipeline runs.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for seen-set operations.
pub type DedupResult<T> = std::result::Result<T, DedupStateError>;
