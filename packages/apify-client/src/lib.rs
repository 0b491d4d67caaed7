//! Pure Apify REST API client.
//!
//! A minimal client for the Apify platform API. Supports starting actor runs,
//! polling for completion, and fetching dataset results. Used to reach job
//! boards that are only practical to scrape through hosted actors.
//!
//! # Example
//!
//! ```rust,ignore
//! use apify_client::{ApifyClient, JobSearchInput};
//!
//! let client = ApifyClient::new("your-api-token".into());
//!
//! let input = JobSearchInput::new("rust developer", 25).with_location("Toronto");
//! let items: Vec<serde_json::Value> = client.run_actor("misceres~indeed-scraper", &input).await?;
//! ```

pub mod error;
pub mod types;

pub use error::{ApifyError, Result};
pub use types::{JobSearchInput, RunData};

use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use types::ApiResponse;

const BASE_URL: &str = "https://api.apify.com/v2";

/// Longest single long-poll the API honours.
const MAX_POLL_SECS: u64 = 60;

/// Pause between polls when the server answers before the run finishes.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Wait budget used by [`ApifyClient::run_actor`].
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(30 * 60);

pub struct ApifyClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Use a different API root (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Start an actor run. Returns immediately with run metadata.
    pub async fn start_run<I: Serialize + ?Sized>(&self, actor_id: &str, input: &I) -> Result<RunData> {
        let url = format!("{}/acts/{}/runs", self.base_url, actor_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let resp = check_status(resp).await?;
        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Poll until a run completes or `max_wait` elapses.
    ///
    /// Long-polls with `waitForFinish`, never past the remaining budget.
    /// Running out of budget leaves the run alive; see [`Self::abort_run`].
    pub async fn wait_for_run(&self, run_id: &str, max_wait: Duration) -> Result<RunData> {
        let deadline = Instant::now() + max_wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let wait_secs = remaining.as_secs().min(MAX_POLL_SECS);
            let url = format!(
                "{}/actor-runs/{}?waitForFinish={}",
                self.base_url, run_id, wait_secs
            );
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await?;

            let resp = check_status(resp).await?;
            let api_resp: ApiResponse<RunData> = resp.json().await?;
            let run = api_resp.data;

            if run.succeeded() {
                return Ok(run);
            }
            if run.is_finished() {
                return Err(ApifyError::RunFailed(run.status));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ApifyError::WaitTimedOut {
                    run_id: run_id.to_string(),
                    waited: max_wait,
                });
            }
            tracing::debug!(run_id, status = %run.status, "Run still in progress");
            tokio::time::sleep(POLL_INTERVAL.min(remaining)).await;
        }
    }

    /// Ask the platform to stop a run. Billing stops once it is aborted.
    pub async fn abort_run(&self, run_id: &str) -> Result<RunData> {
        let url = format!("{}/actor-runs/{}/abort", self.base_url, run_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let resp = check_status(resp).await?;
        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Fetch dataset items from a completed run.
    pub async fn get_dataset_items<T: DeserializeOwned>(&self, dataset_id: &str) -> Result<Vec<T>> {
        let url = format!("{}/datasets/{}/items?format=json&clean=true", self.base_url, dataset_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let resp = check_status(resp).await?;
        let items: Vec<T> = resp.json().await?;
        Ok(items)
    }

    /// Run an actor end-to-end: start, poll, fetch its default dataset.
    ///
    /// Waits up to [`DEFAULT_MAX_WAIT`]. A run that outlives the wait is aborted.
    pub async fn run_actor<I, T>(&self, actor_id: &str, input: &I) -> Result<Vec<T>>
    where
        I: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::info!(actor_id, "Starting Apify actor run");

        let run = self.start_run(actor_id, input).await?;
        tracing::info!(run_id = %run.id, "Apify run started, polling for completion");

        let completed = match self.wait_for_run(&run.id, DEFAULT_MAX_WAIT).await {
            Err(e @ ApifyError::WaitTimedOut { .. }) => {
                if let Err(abort) = self.abort_run(&run.id).await {
                    tracing::warn!(run_id = %run.id, error = %abort, "Failed to abort Apify run");
                }
                return Err(e);
            }
            other => other?,
        };
        tracing::info!(
            run_id = %completed.id,
            dataset_id = %completed.default_dataset_id,
            "Run completed, fetching results"
        );

        let items: Vec<T> = self.get_dataset_items(&completed.default_dataset_id).await?;
        tracing::info!(count = items.len(), "Fetched dataset items");

        Ok(items)
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApifyError::Api {
        status: status.as_u16(),
        message: body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn run_json(status: &str) -> String {
        format!(
            r#"{{"data":{{"id":"run1","status":"{status}","defaultDatasetId":"ds1","startedAt":null,"finishedAt":null}}}}"#
        )
    }

    #[tokio::test]
    async fn test_run_actor_end_to_end() {
        let mut server = mockito::Server::new_async().await;
        let start = server
            .mock("POST", "/acts/misceres~indeed-scraper/runs")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::PartialJsonString(
                r#"{"position":"rust developer","maxItems":5}"#.to_string(),
            ))
            .with_status(201)
            .with_body(run_json("RUNNING"))
            .create_async()
            .await;
        let _poll = server
            .mock("GET", "/actor-runs/run1")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(run_json("SUCCEEDED"))
            .create_async()
            .await;
        let _items = server
            .mock("GET", "/datasets/ds1/items")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"positionName":"Rust Developer"},{"positionName":"Go Developer"}]"#)
            .create_async()
            .await;

        let client = ApifyClient::new("tok".into()).with_base_url(server.url());
        let input = JobSearchInput::new("rust developer", 5);
        let items: Vec<serde_json::Value> = client
            .run_actor("misceres~indeed-scraper", &input)
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["positionName"], "Rust Developer");
        start.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_run_reported() {
        let mut server = mockito::Server::new_async().await;
        let _poll = server
            .mock("GET", "/actor-runs/run1")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(run_json("ABORTED"))
            .create_async()
            .await;

        let client = ApifyClient::new("tok".into()).with_base_url(server.url());
        let result = client.wait_for_run("run1", Duration::from_secs(5)).await;

        assert!(matches!(result, Err(ApifyError::RunFailed(s)) if s == "ABORTED"));
    }

    #[tokio::test]
    async fn test_wait_gives_up_after_budget() {
        let mut server = mockito::Server::new_async().await;
        let _poll = server
            .mock("GET", "/actor-runs/run1")
            .match_query(Matcher::UrlEncoded("waitForFinish".into(), "0".into()))
            .with_status(200)
            .with_body(run_json("RUNNING"))
            .create_async()
            .await;

        let client = ApifyClient::new("tok".into()).with_base_url(server.url());
        let result = client.wait_for_run("run1", Duration::from_millis(200)).await;

        match result {
            Err(ApifyError::WaitTimedOut { run_id, waited }) => {
                assert_eq!(run_id, "run1");
                assert_eq!(waited, Duration::from_millis(200));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_abort_run() {
        let mut server = mockito::Server::new_async().await;
        let abort = server
            .mock("POST", "/actor-runs/run1/abort")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_body(run_json("ABORTING"))
            .expect(1)
            .create_async()
            .await;

        let client = ApifyClient::new("tok".into()).with_base_url(server.url());
        let run = client.abort_run("run1").await.unwrap();

        assert_eq!(run.status, "ABORTING");
        abort.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_carries_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        let _start = server
            .mock("POST", "/acts/a~b/runs")
            .with_status(402)
            .with_body("payment required")
            .create_async()
            .await;

        let client = ApifyClient::new("tok".into()).with_base_url(server.url());
        let result = client.start_run("a~b", &JobSearchInput::new("x", 1)).await;

        match result {
            Err(ApifyError::Api { status, message }) => {
                assert_eq!(status, 402);
                assert_eq!(message, "payment required");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_input_omits_unset_fields() {
        let json = serde_json::to_value(JobSearchInput::new("dev", 10).with_country("CA")).unwrap();
        assert_eq!(json["country"], "CA");
        assert!(json.get("location").is_none());
        assert_eq!(json["saveOnlyUniqueItems"], true);
    }
}
