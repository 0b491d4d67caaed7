use std::env;
use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use job_aggregator::fetchers::DEFAULT_REQUESTS_PER_MINUTE;
use job_aggregator::{PipelineConfig, MAX_SEEN_RETENTION_DAYS};

const DEFAULT_DATABASE_URL: &str = "sqlite://jobsprint.db?mode=rwc";

/// Binary configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub apify_token: Option<String>,
    pub fetch_timeout: Duration,
    pub seen_retention_days: i64,
    pub linkedin_requests_per_minute: NonZeroU32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = PipelineConfig::default();

        Ok(Self {
            database_url: get("JOBSPRINT_DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            apify_token: get("APIFY_TOKEN").filter(|t| !t.trim().is_empty()),
            fetch_timeout: match get("JOBSPRINT_FETCH_TIMEOUT_SECS") {
                Some(secs) => Duration::from_secs(
                    secs.trim()
                        .parse()
                        .context("JOBSPRINT_FETCH_TIMEOUT_SECS must be a whole number of seconds")?,
                ),
                None => defaults.fetch_timeout,
            },
            seen_retention_days: match get("JOBSPRINT_SEEN_RETENTION_DAYS") {
                Some(days) => parse_retention_days(&days)?,
                None => defaults.seen_retention_days,
            },
            linkedin_requests_per_minute: match get("JOBSPRINT_LINKEDIN_REQUESTS_PER_MINUTE") {
                Some(n) => n
                    .trim()
                    .parse()
                    .context("JOBSPRINT_LINKEDIN_REQUESTS_PER_MINUTE must be a positive number")?,
                None => DEFAULT_REQUESTS_PER_MINUTE,
            },
        })
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_fetch_timeout(self.fetch_timeout)
            .with_seen_retention_days(self.seen_retention_days)
    }
}

fn parse_retention_days(raw: &str) -> Result<i64> {
    let days: i64 = raw
        .trim()
        .parse()
        .context("JOBSPRINT_SEEN_RETENTION_DAYS must be a number of days")?;
    if !(1..=MAX_SEEN_RETENTION_DAYS).contains(&days) {
        bail!(
            "JOBSPRINT_SEEN_RETENTION_DAYS must be between 1 and {}, got {}",
            MAX_SEEN_RETENTION_DAYS,
            days
        );
    }
    Ok(days)
}
