//! Boards scraped through hosted Apify actors.
//!
//! One actor run per keyword entry (at most three), started together and
//! each asking for the full result cap. Actor output is returned untouched
//! as raw records; the board's field map does the rest.
//!
//! Actor runs are billed while they run, so a run this fetcher stops
//! waiting for is aborted, including when the fetch itself is dropped.

use std::sync::Arc;
use std::time::Duration;

use apify_client::{ApifyClient, ApifyError, JobSearchInput};
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::{FetchQuery, RawRecord, SourceFetcher};
use crate::types::source::Source;

/// Default actor for Indeed.
pub const INDEED_ACTOR: &str = "misceres~indeed-scraper";

/// How long one actor run may take before it is aborted.
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(4 * 60);

/// Allowance for starting runs and downloading datasets.
const REQUEST_GRACE: Duration = Duration::from_secs(30);

/// Fetches one board by running an Apify actor.
///
/// # Example
///
/// ```rust,ignore
/// let client = Arc::new(ApifyClient::new(token));
/// let indeed = ApifyFetcher::new(client.clone(), Source::Indeed, INDEED_ACTOR).with_country("CA");
/// ```
pub struct ApifyFetcher {
    client: Arc<ApifyClient>,
    source: Source,
    actor_id: String,
    country: Option<String>,
    max_keywords: usize,
    run_timeout: Duration,
}

impl ApifyFetcher {
    pub fn new(client: Arc<ApifyClient>, source: Source, actor_id: impl Into<String>) -> Self {
        Self {
            client,
            source,
            actor_id: actor_id.into(),
            country: None,
            max_keywords: 3,
            run_timeout: DEFAULT_RUN_TIMEOUT,
        }
    }

    /// Indeed through the default actor.
    pub fn indeed(client: Arc<ApifyClient>) -> Self {
        Self::new(client, Source::Indeed, INDEED_ACTOR)
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Abort actor runs still going after `timeout`.
    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }

    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    fn input(&self, keyword: &str, query: &FetchQuery) -> JobSearchInput {
        let max_items = u32::try_from(query.limit).unwrap_or(u32::MAX);
        let mut input = JobSearchInput::new(keyword, max_items);
        if let Some(location) = query.locations.first() {
            input = input.with_location(location.clone());
        }
        if let Some(country) = &self.country {
            input = input.with_country(country.clone());
        }
        input
    }

    fn map_error(&self, e: ApifyError) -> FetchError {
        match e {
            ApifyError::Http(e) => FetchError::Http(Box::new(e)),
            ApifyError::Api { status: 429, .. } => FetchError::RateLimited(self.source),
            ApifyError::Api { status, message } => FetchError::Status {
                board: self.source,
                status,
                message,
            },
            ApifyError::RunFailed(status) => FetchError::Malformed {
                board: self.source,
                reason: format!("actor run ended with status {status}"),
            },
            ApifyError::WaitTimedOut { waited, .. } => FetchError::Timeout {
                board: self.source,
                after: waited,
            },
        }
    }

    /// Start, await and download one actor run.
    async fn run_keyword(&self, keyword: &str, query: &FetchQuery) -> FetchResult<Vec<Value>> {
        let input = self.input(keyword, query);
        let run = self
            .client
            .start_run(&self.actor_id, &input)
            .await
            .map_err(|e| self.map_error(e))?;
        debug!(source = %self.source, run_id = %run.id, keyword, "Actor run started");

        let guard = RunGuard::new(self.client.clone(), run.id.clone());
        let completed = match self.client.wait_for_run(&run.id, self.run_timeout).await {
            Ok(completed) => {
                guard.disarm();
                completed
            }
            Err(e @ ApifyError::RunFailed(_)) => {
                guard.disarm();
                return Err(self.map_error(e));
            }
            Err(e) => {
                guard.abort().await;
                return Err(self.map_error(e));
            }
        };

        self.client
            .get_dataset_items(&completed.default_dataset_id)
            .await
            .map_err(|e| self.map_error(e))
    }
}

#[async_trait]
impl SourceFetcher for ApifyFetcher {
    fn source(&self) -> Source {
        self.source
    }

    fn timeout_hint(&self) -> Option<Duration> {
        Some(self.run_timeout + REQUEST_GRACE)
    }

    async fn fetch(&self, query: &FetchQuery) -> FetchResult<Vec<RawRecord>> {
        let keywords: Vec<&str> = query
            .keywords
            .iter()
            .map(String::as_str)
            .filter(|k| !k.trim().is_empty())
            .take(self.max_keywords)
            .collect();
        let keywords = if keywords.is_empty() { vec![""] } else { keywords };

        let results = join_all(keywords.iter().map(|keyword| self.run_keyword(keyword, query))).await;

        let mut records = Vec::new();
        let mut last_error = None;
        for (keyword, result) in keywords.iter().zip(results) {
            match result {
                Ok(items) => {
                    let fetched_at = Utc::now();
                    records.extend(items.into_iter().map(|item| RawRecord::from_value(item, fetched_at)));
                }
                Err(e) => {
                    warn!(source = %self.source, keyword, error = %e, "Actor run failed");
                    last_error = Some(e);
                }
            }
        }

        if records.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        records.truncate(query.limit);
        info!(source = %self.source, count = records.len(), "Apify fetch complete");
        Ok(records)
    }
}

/// Aborts an actor run when dropped, unless disarmed first.
struct RunGuard {
    client: Arc<ApifyClient>,
    run_id: Option<String>,
}

impl RunGuard {
    fn new(client: Arc<ApifyClient>, run_id: String) -> Self {
        Self {
            client,
            run_id: Some(run_id),
        }
    }

    fn disarm(mut self) {
        self.run_id = None;
    }

    async fn abort(mut self) {
        if let Some(run_id) = self.run_id.take() {
            abort_run(&self.client, &run_id).await;
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let Some(run_id) = self.run_id.take() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(run_id = %run_id, "No runtime left to abort abandoned actor run");
            return;
        };
        let client = self.client.clone();
        handle.spawn(async move { abort_run(&client, &run_id).await });
    }
}

async fn abort_run(client: &ApifyClient, run_id: &str) {
    match client.abort_run(run_id).await {
        Ok(_) => info!(run_id, "Aborted actor run"),
        Err(e) => warn!(run_id, error = %e, "Failed to abort actor run"),
    }
}
