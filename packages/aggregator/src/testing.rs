//! Testing utilities including mock implementations.
//!
//! These are useful for exercising the pipeline, and applications built on
//! it, without network calls or a real database.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{DedupResult, DedupStateError, FetchError, FetchResult};
use crate::stores::MemorySeenStore;
use crate::traits::fetcher::{FetchQuery, RawRecord, SourceFetcher};
use crate::traits::seen_store::SeenStore;
use crate::types::seen::{RecipientId, SeenEntry, SeenSet};
use crate::types::source::Source;

type FailureFn = Arc<dyn Fn() -> FetchError + Send + Sync>;

/// Mock fetcher for testing.
///
/// Returns canned records, optionally after a delay, or fails every call.
/// Clones share records and call history.
///
/// # Example
///
/// ```rust
/// use job_aggregator::testing::MockFetcher;
/// use job_aggregator::{FetchError, Source};
///
/// let ok = MockFetcher::new(Source::LinkedIn);
/// let down = MockFetcher::new(Source::Indeed).failing(|| FetchError::RateLimited(Source::Indeed));
/// ```
#[derive(Clone)]
pub struct MockFetcher {
    source: Source,
    records: Arc<RwLock<Vec<RawRecord>>>,
    failure: Option<FailureFn>,
    delay: Option<Duration>,
    timeout_hint: Option<Duration>,
    calls: Arc<RwLock<Vec<FetchQuery>>>,
}

impl MockFetcher {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            records: Arc::new(RwLock::new(Vec::new())),
            failure: None,
            delay: None,
            timeout_hint: None,
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Records returned by every successful call.
    pub fn with_records(self, records: Vec<RawRecord>) -> Self {
        *self.records.write().unwrap_or_else(|e| e.into_inner()) = records;
        self
    }

    pub fn add_record(&self, record: RawRecord) {
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }

    /// Fail every call with the error `make` builds.
    pub fn failing(mut self, make: impl Fn() -> FetchError + Send + Sync + 'static) -> Self {
        self.failure = Some(Arc::new(make));
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report this as the fetcher's timeout hint.
    pub fn with_timeout_hint(mut self, hint: Duration) -> Self {
        self.timeout_hint = Some(hint);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Queries received, in call order.
    pub fn calls(&self) -> Vec<FetchQuery> {
        self.calls.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl SourceFetcher for MockFetcher {
    fn source(&self) -> Source {
        self.source
    }

    fn timeout_hint(&self) -> Option<Duration> {
        self.timeout_hint
    }

    async fn fetch(&self, query: &FetchQuery) -> FetchResult<Vec<RawRecord>> {
        self.calls
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(query.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(make) = &self.failure {
            return Err(make());
        }

        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        Ok(records.iter().take(query.limit).cloned().collect())
    }
}

/// Which [`SeenStore`] operation a [`FailingSeenStore`] breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    Load,
    Record,
    Prune,
}

/// Seen-store that fails one operation and behaves like
/// [`MemorySeenStore`] for the rest.
pub struct FailingSeenStore {
    inner: MemorySeenStore,
    fail_on: FailOn,
}

impl FailingSeenStore {
    pub fn new(fail_on: FailOn) -> Self {
        Self {
            inner: MemorySeenStore::new(),
            fail_on,
        }
    }

    pub fn on_load() -> Self {
        Self::new(FailOn::Load)
    }

    pub fn on_record() -> Self {
        Self::new(FailOn::Record)
    }

    pub fn on_prune() -> Self {
        Self::new(FailOn::Prune)
    }

    fn check(&self, op: FailOn) -> DedupResult<()> {
        if self.fail_on == op {
            return Err(DedupStateError::Storage(
                format!("seen-store unavailable ({op:?})").into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SeenStore for FailingSeenStore {
    async fn load(&self, recipient: &RecipientId) -> DedupResult<SeenSet> {
        self.check(FailOn::Load)?;
        self.inner.load(recipient).await
    }

    async fn record(&self, recipient: &RecipientId, entries: &[SeenEntry]) -> DedupResult<()> {
        self.check(FailOn::Record)?;
        self.inner.record(recipient, entries).await
    }

    async fn prune(&self, recipient: &RecipientId, cutoff: DateTime<Utc>) -> DedupResult<usize> {
        self.check(FailOn::Prune)?;
        self.inner.prune(recipient, cutoff).await
    }
}
