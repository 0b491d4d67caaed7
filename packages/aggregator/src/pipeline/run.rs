//! Aggregation pipeline: fan-out fetch, then normalize, filter, score,
//! rank and dedupe the joined batch.
//!
//! Only the fetches run concurrently. Everything after the join is a pure
//! pass over a private per-run vector, so two runs with the same raw
//! records, seen-set and `now` produce identical output.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{FetchError, PipelineError, Result};
use crate::pipeline::dedup::dedupe;
use crate::pipeline::filter::evaluate;
use crate::pipeline::normalize::Normalizer;
use crate::pipeline::score::Scorer;
use crate::traits::fetcher::{FetchQuery, RawRecord, SourceFetcher};
use crate::types::config::PipelineConfig;
use crate::types::criteria::SearchCriteria;
use crate::types::job::{Job, JobSummary};
use crate::types::seen::{SeenEntry, SeenSet};
use crate::types::source::Source;

/// A source that contributed nothing to a run, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: Source,
    pub reason: String,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Raw records received, after the per-source cap
    pub fetched: usize,
    pub normalization_failures: usize,
    pub filtered_out: usize,
    pub below_quality: usize,
    pub duplicates_in_batch: usize,
    pub already_seen: usize,
}

/// What a run hands back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,

    /// New, deduplicated, criteria-matching jobs, best first
    pub jobs: Vec<Job>,

    /// Sources that failed; the run still returns what the others produced
    pub failed_sources: Vec<SourceFailure>,

    pub stats: RunStats,
}

impl RunReport {
    pub fn summaries(&self) -> Vec<JobSummary> {
        self.jobs.iter().map(JobSummary::from).collect()
    }

    /// True when at least one requested source failed.
    pub fn is_partial(&self) -> bool {
        !self.failed_sources.is_empty()
    }
}

/// A finished run plus the seen-set state it implies.
///
/// Nothing is committed by the pipeline itself. The caller persists
/// `recorded` (or `seen`) before surfacing `report.jobs`.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: RunReport,
    pub seen: SeenSet,
    pub recorded: Vec<SeenEntry>,
}

/// Raw records from one source, in fetch order.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub source: Source,
    pub records: Vec<RawRecord>,
}

/// Stateless aggregation pipeline.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = Pipeline::new(PipelineConfig::default());
/// let outcome = pipeline
///     .run(&criteria, &fetchers, seen, Utc::now(), &CancellationToken::new())
///     .await?;
/// store.record(&recipient, &outcome.recorded).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    normalizer: Normalizer,
    scorer: Scorer,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            normalizer: Normalizer::new(&config),
            scorer: Scorer::new(config.scoring.clone()),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one aggregation.
    ///
    /// Criteria are validated before any fetch. Cancellation before the
    /// run finishes yields [`PipelineError::Cancelled`] and the input
    /// seen-set is simply dropped.
    pub async fn run(
        &self,
        criteria: &SearchCriteria,
        fetchers: &[Arc<dyn SourceFetcher>],
        seen: SeenSet,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        criteria.validate()?;

        let run_id = Uuid::new_v4();
        let span = info_span!("aggregate", run_id = %run_id);

        async move {
            info!(
                sources = criteria.sources.len(),
                keywords = criteria.keywords.len(),
                max_age = %criteria.max_age,
                "Starting aggregation run"
            );

            let (batches, failed_sources) = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("Run cancelled during fetch");
                    return Err(PipelineError::Cancelled);
                }
                fetched = self.fetch_all(criteria, fetchers) => fetched,
            };

            let mut outcome = self.process(criteria, batches, seen, now);
            outcome.report.run_id = run_id;
            outcome.report.failed_sources = failed_sources;

            info!(
                new_jobs = outcome.report.jobs.len(),
                failed_sources = outcome.report.failed_sources.len(),
                stats = ?outcome.report.stats,
                "Aggregation run complete"
            );
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    /// Fetch every requested source concurrently, each bounded by the
    /// configured timeout or the fetcher's longer hint. Failures are
    /// collected, never propagated.
    pub async fn fetch_all(
        &self,
        criteria: &SearchCriteria,
        fetchers: &[Arc<dyn SourceFetcher>],
    ) -> (Vec<SourceBatch>, Vec<SourceFailure>) {
        let query = FetchQuery::from_criteria(criteria);
        let default_timeout = self.config.fetch_timeout;
        let cap = criteria.per_source_cap;

        let futures = criteria.sources.iter().map(|&source| {
            let fetcher = fetchers.iter().find(|f| f.source() == source).cloned();
            let query = &query;
            async move {
                let Some(fetcher) = fetcher else {
                    return Err(FetchError::Unsupported(source));
                };
                let timeout = fetcher
                    .timeout_hint()
                    .map_or(default_timeout, |hint| hint.max(default_timeout));
                match tokio::time::timeout(timeout, fetcher.fetch(query)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout {
                        board: source,
                        after: timeout,
                    }),
                }
            }
        });

        let results = join_all(futures).await;

        let mut batches = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (&source, result) in criteria.sources.iter().zip(results) {
            match result {
                Ok(mut records) => {
                    records.truncate(cap);
                    debug!(source = %source, count = records.len(), "Source fetched");
                    batches.push(SourceBatch { source, records });
                }
                Err(e) => {
                    warn!(source = %source, error = %e, "Source fetch failed");
                    failures.push(SourceFailure {
                        source,
                        reason: e.to_string(),
                    });
                }
            }
        }
        (batches, failures)
    }

    /// The synchronous half of a run: normalize, filter, score, rank, dedupe.
    pub fn process(
        &self,
        criteria: &SearchCriteria,
        batches: Vec<SourceBatch>,
        seen: SeenSet,
        now: DateTime<Utc>,
    ) -> RunOutcome {
        let mut stats = RunStats::default();
        let mut jobs = Vec::new();

        for batch in batches {
            stats.fetched += batch.records.len();
            for record in &batch.records {
                match self.normalizer.normalize(record, batch.source) {
                    Ok(job) => jobs.push(job),
                    Err(e) => {
                        stats.normalization_failures += 1;
                        debug!(source = %batch.source, error = %e, "Dropping raw record");
                    }
                }
            }
        }

        let mut kept = Vec::with_capacity(jobs.len());
        for mut job in jobs {
            if let Err(rejection) = evaluate(&job, criteria, now) {
                stats.filtered_out += 1;
                debug!(title = %job.title, ?rejection, "Job filtered out");
                continue;
            }

            self.scorer.apply(&mut job, now);
            if let Some(min) = criteria.min_quality_score {
                if job.quality_score() < f64::from(min) {
                    stats.below_quality += 1;
                    continue;
                }
            }
            kept.push(job);
        }

        kept.sort_by(rank);

        let dedup = dedupe(kept, seen, now);
        stats.duplicates_in_batch = dedup.duplicates_in_batch;
        stats.already_seen = dedup.already_seen;

        RunOutcome {
            report: RunReport {
                run_id: Uuid::nil(),
                jobs: dedup.new_jobs,
                failed_sources: Vec::new(),
                stats,
            },
            seen: dedup.seen,
            recorded: dedup.recorded,
        }
    }
}

/// Score descending, then newer first, then identity key.
pub fn rank(a: &Job, b: &Job) -> Ordering {
    b.quality_score()
        .total_cmp(&a.quality_score())
        .then_with(|| b.posting_time.cmp(&a.posting_time))
        .then_with(|| a.identity_key.cmp(&b.identity_key))
}
