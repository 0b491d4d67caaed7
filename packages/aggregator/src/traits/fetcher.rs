//! Source fetcher capability.
//!
//! One implementation per job board. New boards are added by implementing
//! [`SourceFetcher`], never by branching inside the pipeline.
//!
//! # Usage
//!
//! ```rust,ignore
//! use job_aggregator::{FetchQuery, SourceFetcher};
//!
//! let records = fetcher.fetch(&FetchQuery::from_criteria(&criteria)).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FetchResult;
use crate::types::criteria::{KeywordTerm, SearchCriteria, TimeWindow};
use crate::types::source::{Source, WorkType};

/// One record in a board's native shape.
///
/// Opaque to the pipeline until the normalizer maps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Native fields as the board (or its scraper) reported them
    pub fields: Map<String, Value>,

    /// When this record was fetched; fallback posting time
    pub fetched_at: DateTime<Utc>,
}

impl RawRecord {
    pub fn new(fields: Map<String, Value>, fetched_at: DateTime<Utc>) -> Self {
        Self { fields, fetched_at }
    }

    /// Build from any JSON value; non-objects yield an empty field map.
    pub fn from_value(value: Value, fetched_at: DateTime<Utc>) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self { fields, fetched_at }
    }

    /// Set a string field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// What a fetcher is asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchQuery {
    /// Keyword entries, in caller order
    pub keywords: Vec<String>,

    /// Locations, in caller order; empty means board default
    pub locations: Vec<String>,

    /// Fetchers translate this into the board's own window vocabulary
    pub max_age: TimeWindow,

    /// Maximum records to return
    pub limit: usize,

    pub work_type: Option<WorkType>,
}

impl FetchQuery {
    pub fn new(max_age: TimeWindow, limit: usize) -> Self {
        Self {
            keywords: Vec::new(),
            locations: Vec::new(),
            max_age,
            limit,
            work_type: None,
        }
    }

    /// Project search criteria onto a board query.
    pub fn from_criteria(criteria: &SearchCriteria) -> Self {
        Self {
            keywords: criteria.keywords.iter().map(KeywordTerm::to_string).collect(),
            locations: criteria.locations.iter().cloned().collect(),
            max_age: criteria.max_age,
            limit: criteria.per_source_cap,
            work_type: criteria.work_type,
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.locations.push(location.into());
        self
    }

    pub fn with_work_type(mut self, work_type: WorkType) -> Self {
        self.work_type = Some(work_type);
        self
    }
}

/// A job board the pipeline can fetch from.
///
/// Implementations must return a finite batch and should honor their own
/// transport timeouts; the pipeline additionally bounds every call with
/// [`PipelineConfig::fetch_timeout`](crate::PipelineConfig), extended to
/// [`timeout_hint`](Self::timeout_hint) when that is longer.
/// No ordering is assumed of the returned records.
///
/// A fetch may be dropped mid-flight on timeout or cancellation.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Board this fetcher talks to.
    fn source(&self) -> Source;

    /// Time this fetcher needs to finish one call, when it knows it is slow.
    fn timeout_hint(&self) -> Option<Duration> {
        None
    }

    /// Fetch up to `query.limit` raw records.
    async fn fetch(&self, query: &FetchQuery) -> FetchResult<Vec<RawRecord>>;
}
