use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Search input understood by the common job-board scraper actors.
///
/// Actors ignore fields they do not know, so one shape serves several boards.
#[derive(Debug, Clone, Serialize)]
pub struct JobSearchInput {
    /// Job title or keywords
    pub position: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Two-letter country code, e.g. `CA`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(rename = "maxItems")]
    pub max_items: u32,
    #[serde(rename = "saveOnlyUniqueItems")]
    pub save_only_unique_items: bool,
}

impl JobSearchInput {
    pub fn new(position: impl Into<String>, max_items: u32) -> Self {
        Self {
            position: position.into(),
            location: None,
            country: None,
            max_items,
            save_only_unique_items: true,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }
}

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Apify actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunData {
    pub fn is_finished(&self) -> bool {
        !matches!(self.status.as_str(), "READY" | "RUNNING" | "TIMING-OUT" | "ABORTING")
    }

    pub fn succeeded(&self) -> bool {
        self.status == "SUCCEEDED"
    }
}
