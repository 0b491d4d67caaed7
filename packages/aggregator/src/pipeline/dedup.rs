//! Deduplicator - suppress postings already known.
//!
//! Two phases over a score-ordered batch:
//! 1. Intra-batch: first occurrence of a key wins (the highest-scoring one).
//! 2. Cross-run: anything already in the recipient's [`SeenSet`] is dropped.
//!
//! A job is a duplicate when either its identity key or its source-free
//! content key has been seen, which is how the same posting is caught
//! across boards that assign it different external ids. Both keys of every
//! surfaced job are recorded.
//!
//! O(n) in the batch size: hash lookups only, no pairwise comparison.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::types::job::{IdentityKey, Job};
use crate::types::seen::{SeenEntry, SeenSet};

/// Result of deduplicating one batch.
#[derive(Debug, Clone)]
pub struct DedupOutcome {
    /// Surfaced jobs, input order preserved
    pub new_jobs: Vec<Job>,

    /// Seen-set with every surfaced key added
    pub seen: SeenSet,

    /// Exactly the entries added to `seen`, for persistence
    pub recorded: Vec<SeenEntry>,

    pub duplicates_in_batch: usize,
    pub already_seen: usize,
}

/// Deduplicate `jobs` against each other and against `seen`.
///
/// Pure: the caller decides when the returned seen-set (or `recorded`)
/// is committed, and must not report `new_jobs` before it is.
pub fn dedupe(jobs: Vec<Job>, seen: SeenSet, now: DateTime<Utc>) -> DedupOutcome {
    let mut batch_keys: HashSet<IdentityKey> = HashSet::with_capacity(jobs.len() * 2);
    let mut seen = seen;
    let mut new_jobs = Vec::with_capacity(jobs.len());
    let mut recorded = Vec::new();
    let mut duplicates_in_batch = 0;
    let mut already_seen = 0;

    for job in jobs {
        let first_in_batch =
            !batch_keys.contains(&job.identity_key) && !batch_keys.contains(&job.content_key);
        batch_keys.insert(job.identity_key.clone());
        batch_keys.insert(job.content_key.clone());

        if !first_in_batch {
            duplicates_in_batch += 1;
            debug!(key = %job.identity_key, title = %job.title, "Dropping in-batch duplicate");
            continue;
        }

        if seen.contains(&job.identity_key) || seen.contains(&job.content_key) {
            already_seen += 1;
            debug!(key = %job.identity_key, title = %job.title, "Dropping previously seen job");
            continue;
        }

        for key in [&job.identity_key, &job.content_key] {
            if seen.insert(key.clone(), now) {
                recorded.push(SeenEntry {
                    key: key.clone(),
                    seen_at: now,
                });
            }
        }
        new_jobs.push(job);
    }

    DedupOutcome {
        new_jobs,
        seen,
        recorded,
        duplicates_in_batch,
        already_seen,
    }
}
