//! Normalizer - map a board's raw record onto the canonical [`Job`].
//!
//! Pure and stateless: safe to call concurrently from any number of tasks.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use url::Url;

use crate::error::NormalizationError;
use crate::traits::fetcher::RawRecord;
use crate::types::config::PipelineConfig;
use crate::types::job::{IdentityKey, Job, PostingTimeOrigin};
use crate::types::source::{Source, WorkType};

static RE_LINKEDIN_JOB_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/jobs/view/(?:[^/?#]*-)?(\d+)").unwrap());
static RE_RELATIVE_AGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\+?\s*(second|sec|minute|min|hour|hr|day|week|month)s?\s+ago").unwrap()
});
static RE_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d,]*(?:\.\d+)?)\s*([kK])?").unwrap());

/// Hours in a full-time working year, for hourly to annual conversion.
const HOURS_PER_YEAR: f64 = 2080.0;

/// Maps raw records to jobs.
#[derive(Debug, Clone)]
pub struct Normalizer {
    description_max_chars: usize,
    clock_skew: Duration,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl Normalizer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            description_max_chars: config.description_max_chars,
            clock_skew: config.clock_skew(),
        }
    }

    /// Normalize one record. Missing required fields fail the whole record.
    pub fn normalize(&self, raw: &RawRecord, source: Source) -> Result<Job, NormalizationError> {
        let fields = &raw.fields;
        let map = source.fields();

        let title = required_text(fields, map.title, "title")?;
        let company = required_text(fields, map.company, "company")?;
        let location = required_text(fields, map.location, "location")?;
        let raw_url = first_string(fields, map.url).ok_or(NormalizationError::MissingField { field: "url" })?;
        let url = parse_posting_url(&raw_url)?;

        let external_id = first_string(fields, map.external_id)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty() && id != "N/A")
            .or_else(|| external_id_from_url(source, &url));

        let identity_key = match &external_id {
            Some(id) => IdentityKey::from_external_id(source, id),
            None => IdentityKey::from_content(&title, &company, &location, Some(source)),
        };
        let content_key = IdentityKey::from_content(&title, &company, &location, None);

        let (posting_time, posting_time_origin) = map
            .posted
            .iter()
            .filter_map(|name| fields.get(*name))
            .find_map(|v| parse_posting_time(v, raw.fetched_at))
            .map(|t| clamp_future(t, raw.fetched_at, self.clock_skew))
            .unwrap_or((raw.fetched_at, PostingTimeOrigin::FetchTime));

        let (salary_min, salary_max) = extract_salary(fields, map.salary_min, map.salary_max, map.salary_text);

        let description_excerpt = first_string(fields, map.description)
            .map(|d| truncate_chars(&clean_text(&d), self.description_max_chars))
            .filter(|d| !d.is_empty());

        let work_type = first_string(fields, map.work_type)
            .and_then(|w| w.parse::<WorkType>().ok())
            .or_else(|| work_type_from_location(&location));

        Ok(Job {
            identity_key,
            content_key,
            source,
            external_id,
            title,
            company,
            location,
            url: url.to_string(),
            salary_min,
            salary_max,
            posting_time,
            posting_time_origin,
            fetched_at: raw.fetched_at,
            description_excerpt,
            work_type,
            quality_score: 0.0,
        })
    }
}

/// Normalize with default settings.
pub fn normalize(raw: &RawRecord, source: Source) -> Result<Job, NormalizationError> {
    Normalizer::default().normalize(raw, source)
}

fn first_value<'a>(fields: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| fields.get(*name))
        .find(|v| !v.is_null())
}

fn first_string(fields: &Map<String, Value>, names: &[&str]) -> Option<String> {
    names.iter().filter_map(|name| fields.get(*name)).find_map(|v| match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn required_text(
    fields: &Map<String, Value>,
    names: &[&str],
    field: &'static str,
) -> Result<String, NormalizationError> {
    first_string(fields, names)
        .map(|s| clean_text(&s))
        .filter(|s| !s.is_empty() && s != "N/A")
        .ok_or(NormalizationError::MissingField { field })
}

/// Strip HTML tags, decode entities, collapse whitespace. Case is preserved.
pub fn clean_text(input: &str) -> String {
    let text = if input.contains('<') || input.contains('&') {
        let fragment = scraper::Html::parse_fragment(input);
        fragment.root_element().text().collect::<Vec<_>>().join(" ")
    } else {
        input.to_string()
    };
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect::<String>().trim_end().to_string()
}

fn parse_posting_url(raw: &str) -> Result<Url, NormalizationError> {
    let invalid = || NormalizationError::InvalidUrl {
        url: raw.to_string(),
    };
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    Ok(url)
}

fn external_id_from_url(source: Source, url: &Url) -> Option<String> {
    match source {
        Source::LinkedIn => RE_LINKEDIN_JOB_ID
            .captures(url.path())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string()),
        Source::Indeed => url
            .query_pairs()
            .find(|(k, _)| k == "jk" || k == "vjk")
            .map(|(_, v)| v.into_owned()),
        Source::Glassdoor => url
            .query_pairs()
            .find(|(k, _)| k == "jobListingId")
            .map(|(_, v)| v.into_owned()),
        Source::ZipRecruiter => None,
    }
}

/// Parse any of the posting-time shapes boards emit.
fn parse_posting_time(value: &Value, fetched_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let raw = n.as_i64()?;
            if raw > 100_000_000_000 {
                Utc.timestamp_millis_opt(raw).single()
            } else {
                Utc.timestamp_opt(raw, 0).single()
            }
        }
        Value::String(s) => parse_posting_time_text(s.trim(), fetched_at),
        _ => None,
    }
}

fn parse_posting_time_text(text: &str, fetched_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Some(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(text, format) {
            return Some(t.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        // Day precision only: take the latest instant the day allows.
        let end_of_day = date.and_time(NaiveTime::from_hms_opt(23, 59, 59)?).and_utc();
        return Some(end_of_day.min(fetched_at));
    }

    let lower = text.to_lowercase();
    if lower.contains("just now") || lower == "today" || lower.contains("moments ago") {
        return Some(fetched_at);
    }
    if lower == "yesterday" {
        return fetched_at.checked_sub_signed(Duration::days(1));
    }
    let caps = RE_RELATIVE_AGE.captures(&lower)?;
    let amount: i32 = caps.get(1)?.as_str().parse().ok()?;
    let unit = match caps.get(2)?.as_str() {
        "second" | "sec" => Duration::seconds(1),
        "minute" | "min" => Duration::minutes(1),
        "hour" | "hr" => Duration::hours(1),
        "day" => Duration::days(1),
        "week" => Duration::weeks(1),
        _ => Duration::days(30),
    };
    // Absurd ages overflow; the caller falls back to fetch time.
    fetched_at.checked_sub_signed(unit.checked_mul(amount)?)
}

fn clamp_future(
    time: DateTime<Utc>,
    fetched_at: DateTime<Utc>,
    skew: Duration,
) -> (DateTime<Utc>, PostingTimeOrigin) {
    let latest = fetched_at.checked_add_signed(skew).unwrap_or(fetched_at);
    if time > latest {
        (fetched_at, PostingTimeOrigin::ClampedFuture)
    } else {
        (time, PostingTimeOrigin::Reported)
    }
}

fn extract_salary(
    fields: &Map<String, Value>,
    min_names: &[&str],
    max_names: &[&str],
    text_names: &[&str],
) -> (Option<u64>, Option<u64>) {
    let mut min = first_value(fields, min_names).and_then(salary_amount);
    let mut max = first_value(fields, max_names).and_then(salary_amount);

    if min.is_none() && max.is_none() {
        if let Some(text) = first_string(fields, text_names) {
            let (lo, hi) = parse_salary_text(&text);
            min = lo;
            max = hi;
        }
    }

    match (min, max) {
        (Some(lo), Some(hi)) if lo > hi => (Some(hi), Some(lo)),
        other => other,
    }
}

fn salary_amount(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| *v >= 0.0).map(|v| v.round() as u64),
        Value::String(s) => parse_salary_text(s).0,
        _ => None,
    }
}

/// Parse free-text pay ("$80,000 - $120,000", "$95K/yr", "$45/hr") into annual figures.
pub fn parse_salary_text(text: &str) -> (Option<u64>, Option<u64>) {
    let lower = text.to_lowercase();
    let multiplier = if lower.contains("hour") || lower.contains("/hr") || lower.contains("hourly") {
        HOURS_PER_YEAR
    } else if lower.contains("month") || lower.contains("/mo") {
        12.0
    } else if lower.contains("week") || lower.contains("/wk") {
        52.0
    } else {
        1.0
    };

    let amounts: Vec<u64> = RE_AMOUNT
        .captures_iter(text)
        .filter_map(|caps| {
            let digits = caps.get(1)?.as_str().replace(',', "");
            let mut value: f64 = digits.parse().ok()?;
            if caps.get(2).is_some() {
                value *= 1000.0;
            }
            Some((value * multiplier).round() as u64)
        })
        .filter(|v| *v > 0)
        .take(2)
        .collect();

    match amounts.as_slice() {
        [] => (None, None),
        [single] => (Some(*single), Some(*single)),
        [a, b, ..] => (Some(*a.min(b)), Some(*a.max(b))),
    }
}

fn work_type_from_location(location: &str) -> Option<WorkType> {
    let lower = location.to_lowercase();
    if lower.contains("hybrid") {
        Some(WorkType::Hybrid)
    } else if lower.contains("remote") {
        Some(WorkType::Remote)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fetched_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    fn linkedin(value: Value) -> RawRecord {
        RawRecord::from_value(value, fetched_at())
    }

    fn base() -> Value {
        json!({
            "id": "3812345678",
            "title": "  Senior   Rust Engineer ",
            "company": "Acme",
            "location": "Toronto, ON",
            "job_url": "https://www.linkedin.com/jobs/view/senior-rust-engineer-at-acme-3812345678?refId=abc",
            "posted_date": "2025-03-10T11:30:00Z"
        })
    }

    #[test]
    fn test_maps_linkedin_fields() {
        let job = normalize(&linkedin(base()), Source::LinkedIn).unwrap();

        assert_eq!(job.title, "Senior Rust Engineer");
        assert_eq!(job.company, "Acme");
        assert_eq!(job.location, "Toronto, ON");
        assert_eq!(job.external_id.as_deref(), Some("3812345678"));
        assert_eq!(job.identity_key, IdentityKey::from_external_id(Source::LinkedIn, "3812345678"));
        assert_eq!(job.posting_time, Utc.with_ymd_and_hms(2025, 3, 10, 11, 30, 0).unwrap());
        assert_eq!(job.posting_time_origin, PostingTimeOrigin::Reported);
        assert_eq!(job.quality_score(), 0.0);
    }

    #[test]
    fn test_missing_title_is_an_error() {
        let mut value = base();
        value["title"] = json!("   ");
        assert_eq!(
            normalize(&linkedin(value), Source::LinkedIn),
            Err(NormalizationError::MissingField { field: "title" })
        );
    }

    #[test]
    fn test_non_object_record_fails_on_first_required_field() {
        let record = RawRecord::from_value(json!("just a string"), fetched_at());
        assert_eq!(
            normalize(&record, Source::LinkedIn),
            Err(NormalizationError::MissingField { field: "title" })
        );
    }

    #[test]
    fn test_placeholder_company_is_missing() {
        let mut value = base();
        value["company"] = json!("N/A");
        assert_eq!(
            normalize(&linkedin(value), Source::LinkedIn),
            Err(NormalizationError::MissingField { field: "company" })
        );
    }

    #[test]
    fn test_relative_url_rejected() {
        let mut value = base();
        value["job_url"] = json!("/jobs/view/123");
        assert!(matches!(
            normalize(&linkedin(value), Source::LinkedIn),
            Err(NormalizationError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_external_id_recovered_from_url() {
        let mut value = base();
        value.as_object_mut().unwrap().remove("id");
        let job = normalize(&linkedin(value), Source::LinkedIn).unwrap();
        assert_eq!(job.external_id.as_deref(), Some("3812345678"));
    }

    #[test]
    fn test_identity_falls_back_to_content_hash() {
        let record = RawRecord::from_value(
            json!({
                "name": "Data Analyst",
                "hiring_company": "Beta Corp",
                "location": "Remote",
                "url": "https://www.ziprecruiter.com/c/Beta/Job/Data-Analyst"
            }),
            fetched_at(),
        );
        let job = normalize(&record, Source::ZipRecruiter).unwrap();

        assert!(job.external_id.is_none());
        assert_eq!(
            job.identity_key,
            IdentityKey::from_content("Data Analyst", "Beta Corp", "Remote", Some(Source::ZipRecruiter))
        );
        assert_eq!(job.posting_time, fetched_at());
        assert_eq!(job.posting_time_origin, PostingTimeOrigin::FetchTime);
        assert_eq!(job.work_type, Some(WorkType::Remote));
    }

    #[test]
    fn test_identity_stable_when_description_changes() {
        let mut a = base();
        a["description"] = json!("Build things.");
        let mut b = base();
        b["description"] = json!("Build <b>great</b> things with us!");
        b["job_url"] = json!("https://www.linkedin.com/jobs/view/3812345678?trackingId=zzz");

        let a = normalize(&linkedin(a), Source::LinkedIn).unwrap();
        let b = normalize(&linkedin(b), Source::LinkedIn).unwrap();
        assert_eq!(a.identity_key, b.identity_key);
        assert_eq!(a.content_key, b.content_key);
    }

    #[test]
    fn test_future_posting_time_clamped() {
        let mut value = base();
        value["posted_date"] = json!("2025-03-10T12:30:00Z");
        let job = normalize(&linkedin(value), Source::LinkedIn).unwrap();
        assert_eq!(job.posting_time, fetched_at());
        assert_eq!(job.posting_time_origin, PostingTimeOrigin::ClampedFuture);
    }

    #[test]
    fn test_small_future_skew_tolerated() {
        let mut value = base();
        value["posted_date"] = json!("2025-03-10T12:04:00Z");
        let job = normalize(&linkedin(value), Source::LinkedIn).unwrap();
        assert_eq!(job.posting_time, Utc.with_ymd_and_hms(2025, 3, 10, 12, 4, 0).unwrap());
        assert_eq!(job.posting_time_origin, PostingTimeOrigin::Reported);
    }

    #[test]
    fn test_posting_time_formats() {
        let at = fetched_at();
        assert_eq!(
            parse_posting_time(&json!("2 hours ago"), at),
            Some(at - Duration::hours(2))
        );
        assert_eq!(
            parse_posting_time(&json!("30+ days ago"), at),
            Some(at - Duration::days(30))
        );
        assert_eq!(parse_posting_time(&json!("Just now"), at), Some(at));
        assert_eq!(
            parse_posting_time(&json!(1_741_600_800), at),
            Some(Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap())
        );
        assert_eq!(
            parse_posting_time(&json!(1_741_600_800_000i64), at),
            Some(Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap())
        );
        assert_eq!(
            parse_posting_time(&json!("2025-03-09 08:15:00"), at),
            Some(Utc.with_ymd_and_hms(2025, 3, 9, 8, 15, 0).unwrap())
        );
        assert_eq!(parse_posting_time(&json!("sometime"), at), None);
    }

    #[test]
    fn test_date_only_resolves_to_end_of_day_capped_at_fetch() {
        let at = fetched_at();
        assert_eq!(parse_posting_time(&json!("2025-03-10"), at), Some(at));
        assert_eq!(
            parse_posting_time(&json!("2025-03-08"), at),
            Some(Utc.with_ymd_and_hms(2025, 3, 8, 23, 59, 59).unwrap())
        );
    }

    #[test]
    fn test_overflowing_relative_age_falls_back_to_fetch_time() {
        let at = fetched_at();
        assert_eq!(parse_posting_time(&json!("2147483647 months ago"), at), None);
        assert_eq!(parse_posting_time(&json!("99999999999 weeks ago"), at), None);

        let mut value = base();
        value.as_object_mut().unwrap().remove("posted_date");
        value["posted_text"] = json!("2147483647 months ago");
        let job = normalize(&linkedin(value), Source::LinkedIn).unwrap();
        assert_eq!(job.posting_time, at);
        assert_eq!(job.posting_time_origin, PostingTimeOrigin::FetchTime);
    }

    #[test]
    fn test_salary_swapped_when_inverted() {
        let mut value = base();
        value["salary_min"] = json!(150000);
        value["salary_max"] = json!(120000);
        let job = normalize(&linkedin(value), Source::LinkedIn).unwrap();
        assert_eq!((job.salary_min, job.salary_max), (Some(120_000), Some(150_000)));
    }

    #[test]
    fn test_salary_text_parsing() {
        assert_eq!(parse_salary_text("$80,000 - $120,000"), (Some(80_000), Some(120_000)));
        assert_eq!(parse_salary_text("$95K/yr"), (Some(95_000), Some(95_000)));
        assert_eq!(parse_salary_text("$45/hr"), (Some(93_600), Some(93_600)));
        assert_eq!(parse_salary_text("CA$6,000 - CA$7,000 a month"), (Some(72_000), Some(84_000)));
        assert_eq!(parse_salary_text("Competitive"), (None, None));
    }

    #[test]
    fn test_description_stripped_and_truncated() {
        let mut value = base();
        value["description"] = json!(format!("<p>Hello&nbsp;<b>world</b></p>{}", "x".repeat(600)));
        let normalizer = Normalizer::new(&PipelineConfig::default().with_description_max_chars(20));
        let job = normalizer.normalize(&linkedin(value), Source::LinkedIn).unwrap();

        let excerpt = job.description_excerpt.unwrap();
        assert!(excerpt.starts_with("Hello world"));
        assert!(excerpt.chars().count() <= 20);
        assert!(!excerpt.contains('<'));
    }

    #[test]
    fn test_indeed_field_names() {
        let record = RawRecord::from_value(
            json!({
                "positionName": "Backend Developer",
                "company": "Gamma",
                "location": "Vancouver, BC",
                "url": "https://ca.indeed.com/viewjob?jk=abc123def",
                "postedAt": "3 days ago",
                "salary": "$90,000 - $110,000 a year"
            }),
            fetched_at(),
        );
        let job = normalize(&record, Source::Indeed).unwrap();
        assert_eq!(job.external_id.as_deref(), Some("abc123def"));
        assert_eq!(job.salary_min, Some(90_000));
        assert_eq!(job.salary_max, Some(110_000));
        assert_eq!(job.posting_time, fetched_at() - Duration::days(3));
    }
}
