//! Persistence for per-recipient seen-sets.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DedupResult;
use crate::types::seen::{RecipientId, SeenEntry, SeenSet};

/// Durable home of every recipient's [`SeenSet`].
///
/// Callers serialize access per recipient (see
/// [`Aggregator`](crate::Aggregator)); implementations only need each
/// individual call to be atomic.
#[async_trait]
pub trait SeenStore: Send + Sync {
    /// Load a recipient's full seen-set. Unknown recipients get an empty set.
    async fn load(&self, recipient: &RecipientId) -> DedupResult<SeenSet>;

    /// Record new entries, all or nothing.
    ///
    /// Entries whose key is already stored keep their original timestamp.
    async fn record(&self, recipient: &RecipientId, entries: &[SeenEntry]) -> DedupResult<()>;

    /// Drop entries recorded before `cutoff`. Returns how many were dropped.
    async fn prune(&self, recipient: &RecipientId, cutoff: DateTime<Utc>) -> DedupResult<usize>;
}
