//! Supported job boards and their native record vocabulary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CriteriaError;

/// A job board the pipeline can ingest from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    LinkedIn,
    Indeed,
    Glassdoor,
    ZipRecruiter,
}

impl Source {
    pub const ALL: [Source; 4] = [
        Source::LinkedIn,
        Source::Indeed,
        Source::Glassdoor,
        Source::ZipRecruiter,
    ];

    /// Stable lowercase name, used in identity hashing and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::LinkedIn => "linkedin",
            Source::Indeed => "indeed",
            Source::Glassdoor => "glassdoor",
            Source::ZipRecruiter => "ziprecruiter",
        }
    }

    /// Native field names for this board's raw records.
    pub fn fields(&self) -> &'static FieldMap {
        match self {
            Source::LinkedIn => &LINKEDIN_FIELDS,
            Source::Indeed => &INDEED_FIELDS,
            Source::Glassdoor => &GLASSDOOR_FIELDS,
            Source::ZipRecruiter => &ZIPRECRUITER_FIELDS,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linkedin" => Ok(Source::LinkedIn),
            "indeed" => Ok(Source::Indeed),
            "glassdoor" => Ok(Source::Glassdoor),
            "ziprecruiter" | "zip_recruiter" => Ok(Source::ZipRecruiter),
            other => Err(CriteriaError::UnknownSource(other.to_string())),
        }
    }
}

/// Arrangement of the work itself, as boards report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    OnSite,
    Remote,
    Hybrid,
}

impl WorkType {
    /// LinkedIn `f_WT` code.
    pub fn linkedin_code(&self) -> &'static str {
        match self {
            WorkType::OnSite => "1",
            WorkType::Remote => "2",
            WorkType::Hybrid => "3",
        }
    }
}

impl FromStr for WorkType {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "on_site" | "onsite" | "1" => Ok(WorkType::OnSite),
            "remote" | "2" => Ok(WorkType::Remote),
            "hybrid" | "3" => Ok(WorkType::Hybrid),
            other => Err(CriteriaError::UnknownWorkType(other.to_string())),
        }
    }
}

/// Candidate native field names for each canonical field, tried in order.
#[derive(Debug)]
pub struct FieldMap {
    pub external_id: &'static [&'static str],
    pub title: &'static [&'static str],
    pub company: &'static [&'static str],
    pub location: &'static [&'static str],
    pub url: &'static [&'static str],
    pub posted: &'static [&'static str],
    pub description: &'static [&'static str],
    pub salary_min: &'static [&'static str],
    pub salary_max: &'static [&'static str],
    pub salary_text: &'static [&'static str],
    pub work_type: &'static [&'static str],
}

static LINKEDIN_FIELDS: FieldMap = FieldMap {
    external_id: &["id", "job_id"],
    title: &["title"],
    company: &["company"],
    location: &["location"],
    url: &["job_url", "url"],
    posted: &["posted_text", "posted_date", "date_posted"],
    description: &["description"],
    salary_min: &["salary_min", "min_amount"],
    salary_max: &["salary_max", "max_amount"],
    salary_text: &["salary", "salary_info"],
    work_type: &["work_type"],
};

static INDEED_FIELDS: FieldMap = FieldMap {
    external_id: &["id", "jobKey", "positionId"],
    title: &["positionName", "title"],
    company: &["company", "companyName"],
    location: &["location", "formattedLocation"],
    url: &["url", "jobUrl", "externalApplyLink"],
    posted: &["postedAt", "postingDateParsed", "date_posted"],
    description: &["description", "descriptionHTML"],
    salary_min: &["salaryMin", "min_amount"],
    salary_max: &["salaryMax", "max_amount"],
    salary_text: &["salary"],
    work_type: &["jobType", "workType"],
};

static GLASSDOOR_FIELDS: FieldMap = FieldMap {
    external_id: &["jobListingId", "id"],
    title: &["jobTitle", "title"],
    company: &["employerName", "company"],
    location: &["location", "locationName"],
    url: &["jobViewUrl", "url", "job_url"],
    posted: &["listingDate", "date_posted", "posted_date"],
    description: &["jobDescription", "description"],
    salary_min: &["payPercentile10", "salary_min"],
    salary_max: &["payPercentile90", "salary_max"],
    salary_text: &["salaryText", "salary"],
    work_type: &["remoteWorkTypes", "work_type"],
};

static ZIPRECRUITER_FIELDS: FieldMap = FieldMap {
    external_id: &["listing_key", "id"],
    title: &["name", "title"],
    company: &["hiring_company", "company"],
    location: &["location"],
    url: &["url", "job_url"],
    posted: &["posted_time", "posted_date"],
    description: &["snippet", "description"],
    salary_min: &["salary_min_annual", "salary_min"],
    salary_max: &["salary_max_annual", "salary_max"],
    salary_text: &["salary_interval_text", "salary"],
    work_type: &["work_type"],
};
