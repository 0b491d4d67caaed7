//! The Aggregator - per-recipient runs against a durable seen-set.
//!
//! Wraps the stateless [`Pipeline`] with the one piece of shared mutable
//! state: each recipient's seen-set. Runs for the same recipient are
//! serialized so the dedupe-and-record step never races.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{PipelineError, Result};
use crate::pipeline::run::{Pipeline, RunReport};
use crate::traits::fetcher::SourceFetcher;
use crate::traits::seen_store::SeenStore;
use crate::types::config::PipelineConfig;
use crate::types::criteria::SearchCriteria;
use crate::types::seen::RecipientId;

/// Fetchers, a seen-store and the locks that keep recipients consistent.
///
/// # Example
///
/// ```rust,ignore
/// let aggregator = Aggregator::new(Arc::new(MemorySeenStore::new()))
///     .with_fetcher(Arc::new(LinkedInFetcher::new()?));
///
/// let report = aggregator
///     .run_for(&RecipientId::new("alice"), &criteria, &CancellationToken::new())
///     .await?;
/// ```
pub struct Aggregator {
    pipeline: Pipeline,
    fetchers: Vec<Arc<dyn SourceFetcher>>,
    store: Arc<dyn SeenStore>,
    locks: Mutex<HashMap<RecipientId, Arc<Mutex<()>>>>,
}

impl Aggregator {
    pub fn new(store: Arc<dyn SeenStore>) -> Self {
        Self {
            pipeline: Pipeline::default(),
            fetchers: Vec::new(),
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline = Pipeline::new(config);
        self
    }

    /// Register a board. A later fetcher for the same board replaces the earlier one.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.fetchers.retain(|f| f.source() != fetcher.source());
        self.fetchers.push(fetcher);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        self.pipeline.config()
    }

    pub fn fetchers(&self) -> &[Arc<dyn SourceFetcher>] {
        &self.fetchers
    }

    /// Run one aggregation for `recipient` as of now.
    pub async fn run_for(
        &self,
        recipient: &RecipientId,
        criteria: &SearchCriteria,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        self.run_for_at(recipient, criteria, Utc::now(), cancel).await
    }

    /// Run one aggregation for `recipient` as of `now`.
    ///
    /// Prune, load, run, record. Jobs are only returned once the record
    /// call has succeeded; a storage failure fails the run. A run
    /// cancelled at any point before recording commits nothing.
    #[instrument(skip(self, criteria, cancel), fields(recipient = %recipient))]
    pub async fn run_for_at(
        &self,
        recipient: &RecipientId,
        criteria: &SearchCriteria,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        criteria.validate()?;

        let lock = self.recipient_lock(recipient).await;
        let result = self.run_locked(&lock, recipient, criteria, now, cancel).await;
        self.release_lock(recipient, lock).await;
        result
    }

    async fn run_locked(
        &self,
        lock: &Mutex<()>,
        recipient: &RecipientId,
        criteria: &SearchCriteria,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let _guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            guard = lock.lock() => guard,
        };

        let cutoff = self.config().seen_cutoff(now);
        let pruned = self.store.prune(recipient, cutoff).await?;
        if pruned > 0 {
            debug!(pruned, "Pruned expired seen entries");
        }

        let seen = self.store.load(recipient).await?;
        debug!(seen = seen.len(), "Loaded seen-set");

        let outcome = self
            .pipeline
            .run(criteria, &self.fetchers, seen, now, cancel)
            .await?;

        if cancel.is_cancelled() {
            warn!("Run cancelled before recording; discarding results");
            return Err(PipelineError::Cancelled);
        }

        self.store.record(recipient, &outcome.recorded).await?;

        info!(
            run_id = %outcome.report.run_id,
            new_jobs = outcome.report.jobs.len(),
            recorded = outcome.recorded.len(),
            "Recipient run committed"
        );
        Ok(outcome.report)
    }

    /// Drop seen entries older than the retention horizon.
    #[instrument(skip(self), fields(recipient = %recipient))]
    pub async fn prune(&self, recipient: &RecipientId, now: DateTime<Utc>) -> Result<usize> {
        let lock = self.recipient_lock(recipient).await;
        let result: Result<usize> = async {
            let _guard = lock.lock().await;
            let cutoff = self.config().seen_cutoff(now);
            let pruned = self.store.prune(recipient, cutoff).await?;
            info!(pruned, cutoff = %cutoff, "Pruned seen-set");
            Ok(pruned)
        }
        .await;
        self.release_lock(recipient, lock).await;
        result
    }

    async fn recipient_lock(&self, recipient: &RecipientId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(recipient.clone()).or_default().clone()
    }

    /// Forget a recipient's lock once no other run holds or awaits it.
    /// The caller's guard must already be dropped.
    async fn release_lock(&self, recipient: &RecipientId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // Clones are only handed out under `locks`, so the count is stable here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(recipient);
        }
    }
}
