//! Aggregation pipeline - the core of the library.
//!
//! Stages, in run order:
//! - Fetch (concurrent, one per requested source, each timeout-bounded)
//! - Normalize raw records into [`Job`](crate::Job)s
//! - Filter by recency and criteria
//! - Score
//! - Rank (score, then recency, then identity key)
//! - Dedupe within the batch and against the recipient's seen-set

pub mod aggregator;
pub mod dedup;
pub mod filter;
pub mod location;
pub mod normalize;
pub mod run;
pub mod score;

pub use aggregator::Aggregator;
pub use dedup::{dedupe, DedupOutcome};
pub use filter::{evaluate, matches, Rejection};
pub use location::{location_matches, LocationProfile};
pub use normalize::{clean_text, normalize, parse_salary_text, Normalizer};
pub use run::{rank, Pipeline, RunOutcome, RunReport, RunStats, SourceBatch, SourceFailure};
pub use score::{score, Scorer};
