//! Job Posting Aggregation Library
//!
//! Pulls postings from several job boards, maps them onto one canonical
//! [`Job`] shape, and returns only the new, criteria-matching,
//! quality-ranked ones for each recipient.
//!
//! # Design
//!
//! - Boards plug in behind [`SourceFetcher`]; the pipeline never branches on a board
//! - A failing board costs its own results only, never the run
//! - Filtering, scoring and dedup are pure over a per-run batch
//! - The seen-set is the only state that survives between runs, and it is
//!   written before any job is reported as new
//!
//! # Usage
//!
//! ```rust,ignore
//! use job_aggregator::{Aggregator, LinkedInFetcher, MemorySeenStore, RecipientId, SearchCriteria, TimeWindow};
//! use tokio_util::sync::CancellationToken;
//!
//! let aggregator = Aggregator::new(Arc::new(MemorySeenStore::new()))
//!     .with_fetcher(Arc::new(LinkedInFetcher::new()?));
//!
//! let criteria = SearchCriteria::new(TimeWindow::ONE_HOUR)
//!     .with_keywords(["rust developer", "\"platform engineer\""])?
//!     .with_exclude_keywords(["junior"])?
//!     .with_locations(["Toronto, ON", "Remote"]);
//!
//! let report = aggregator
//!     .run_for(&RecipientId::new("alice"), &criteria, &CancellationToken::new())
//!     .await?;
//! for job in report.summaries() {
//!     println!("{:5.1}  {} at {}", job.quality_score, job.title, job.company);
//! }
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (SourceFetcher, SeenStore)
//! - [`types`] - Jobs, criteria, seen-sets and configuration
//! - [`pipeline`] - Normalize, filter, score, dedupe, and the run orchestration
//! - [`stores`] - Seen-set storage (MemorySeenStore, SqliteSeenStore)
//! - [`fetchers`] - Board fetchers (LinkedInFetcher, ApifyFetcher)
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod fetchers;
pub mod pipeline;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{
    CriteriaError, DedupStateError, FetchError, NormalizationError, PipelineError, Result,
};
pub use traits::{FetchQuery, RawRecord, SeenStore, SourceFetcher};
pub use types::{
    config::{PipelineConfig, ScoringConfig, MAX_SEEN_RETENTION_DAYS},
    criteria::{KeywordTerm, SearchCriteria, SearchRequest, TimeWindow},
    job::{IdentityKey, Job, JobSummary, PostingTimeOrigin},
    seen::{RecipientId, SeenEntry, SeenSet},
    source::{Source, WorkType},
};

// Re-export pipeline components
pub use pipeline::{
    dedupe, evaluate, matches, normalize, score, Aggregator, DedupOutcome, Normalizer, Pipeline,
    Rejection, RunOutcome, RunReport, RunStats, Scorer, SourceFailure,
};

// Re-export stores
pub use stores::MemorySeenStore;

#[cfg(feature = "sqlite")]
pub use stores::SqliteSeenStore;

// Re-export fetchers
pub use fetchers::{ApifyFetcher, LinkedInFetcher};
