//! LinkedIn guest search fetcher.
//!
//! Scrapes the public "see more jobs" endpoint, which returns HTML job
//! cards 25 at a time. No login, no API key. The board stops paginating
//! at offset 200, and answers 429 when pushed too hard.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::StatusCode;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::{FetchQuery, RawRecord, SourceFetcher};
use crate::types::source::Source;

const SEARCH_URL: &str = "https://www.linkedin.com/jobs-guest/jobs/api/seeMoreJobPostings/search";
const PAGE_SIZE: usize = 25;
const MAX_OFFSET: usize = 200;
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Default request budget against the guest endpoint.
pub const DEFAULT_REQUESTS_PER_MINUTE: NonZeroU32 = nonzero!(10u32);

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Fetches job cards from LinkedIn's guest search.
///
/// Searches every (keyword, location) pair, up to 3 keywords and 2
/// locations, paginating each until the result cap is met.
///
/// # Example
///
/// ```rust,ignore
/// let fetcher = LinkedInFetcher::new()?.with_requests_per_minute(nonzero!(6u32));
/// let query = FetchQuery::new(TimeWindow::TEN_MINUTES, 25).with_keyword("rust developer");
/// let records = fetcher.fetch(&query).await?;
/// ```
pub struct LinkedInFetcher {
    client: reqwest::Client,
    search_url: String,
    limiter: Arc<DirectRateLimiter>,
    max_keywords: usize,
    max_locations: usize,
}

impl LinkedInFetcher {
    pub fn new() -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            search_url: SEARCH_URL.to_string(),
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(DEFAULT_REQUESTS_PER_MINUTE))),
            max_keywords: 3,
            max_locations: 2,
        })
    }

    pub fn with_requests_per_minute(mut self, requests: NonZeroU32) -> Self {
        self.limiter = Arc::new(RateLimiter::direct(Quota::per_minute(requests)));
        self
    }

    /// Point at a different search endpoint (mirrors, tests).
    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn fetch_page(
        &self,
        keywords: &str,
        location: &str,
        start: usize,
        query: &FetchQuery,
    ) -> FetchResult<Vec<RawRecord>> {
        self.limiter.until_ready().await;

        let start = start.to_string();
        let time_filter = query.max_age.code();
        let mut params = vec![
            ("keywords", keywords),
            ("location", location),
            ("start", start.as_str()),
            ("f_TPR", time_filter.as_str()),
        ];
        if let Some(work_type) = query.work_type {
            params.push(("f_WT", work_type.linkedin_code()));
        }

        debug!(keywords, location, start = %start, "LinkedIn page request");
        let response = self
            .client
            .get(&self.search_url)
            .header("Accept", "text/html,application/xhtml+xml")
            .header("Accept-Language", "en-US,en;q=0.5")
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited(Source::LinkedIn));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                board: Source::LinkedIn,
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let html = response.text().await?;
        Ok(parse_search_page(&html, Utc::now()))
    }

    /// Paginate one (keyword, location) search until `wanted` records,
    /// an empty page, or the board's offset ceiling.
    async fn search(
        &self,
        keywords: &str,
        location: &str,
        wanted: usize,
        query: &FetchQuery,
    ) -> FetchResult<Vec<RawRecord>> {
        let mut records = Vec::new();
        let mut start = 0;

        while records.len() < wanted && start < MAX_OFFSET {
            let page = match self.fetch_page(keywords, location, start, query).await {
                Ok(page) => page,
                // Keep what earlier pages produced.
                Err(e) if !records.is_empty() => {
                    warn!(error = %e, start, "Stopping pagination early");
                    break;
                }
                Err(e) => return Err(e),
            };
            if page.is_empty() {
                break;
            }
            records.extend(page);
            start += PAGE_SIZE;
        }

        records.truncate(wanted);
        Ok(records)
    }
}

#[async_trait]
impl SourceFetcher for LinkedInFetcher {
    fn source(&self) -> Source {
        Source::LinkedIn
    }

    async fn fetch(&self, query: &FetchQuery) -> FetchResult<Vec<RawRecord>> {
        let keywords = bounded_or_blank(&query.keywords, self.max_keywords);
        let locations = bounded_or_blank(&query.locations, self.max_locations);

        let mut records = Vec::new();
        let mut last_error = None;

        'outer: for keyword in &keywords {
            for location in &locations {
                let wanted = query.limit.saturating_sub(records.len());
                if wanted == 0 {
                    break 'outer;
                }
                match self.search(keyword, location, wanted, query).await {
                    Ok(found) => records.extend(found),
                    Err(e) => {
                        warn!(keyword = %keyword, location = %location, error = %e, "LinkedIn search failed");
                        last_error = Some(e);
                    }
                }
            }
        }

        // A board-wide failure only surfaces when nothing at all came back.
        if records.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        info!(count = records.len(), "LinkedIn fetch complete");
        Ok(records)
    }
}

fn bounded_or_blank(values: &[String], max: usize) -> Vec<String> {
    let bounded: Vec<String> = values
        .iter()
        .filter(|v| !v.trim().is_empty())
        .take(max)
        .cloned()
        .collect();
    if bounded.is_empty() {
        vec![String::new()]
    } else {
        bounded
    }
}

struct CardSelectors {
    card: Selector,
    title: Selector,
    company: Selector,
    location: Selector,
    link: Selector,
    time: Selector,
    salary: Selector,
}

impl CardSelectors {
    fn new() -> Option<Self> {
        Some(Self {
            card: Selector::parse("div.base-search-card").ok()?,
            title: Selector::parse("h3.base-search-card__title").ok()?,
            company: Selector::parse("h4.base-search-card__subtitle").ok()?,
            location: Selector::parse("span.job-search-card__location").ok()?,
            link: Selector::parse("a.base-card__full-link").ok()?,
            time: Selector::parse("time").ok()?,
            salary: Selector::parse("span.job-search-card__salary-info").ok()?,
        })
    }
}

/// Extract raw records from one page of guest search HTML.
///
/// Cards missing a field simply omit it; the normalizer decides whether
/// the record is usable.
pub fn parse_search_page(html: &str, fetched_at: DateTime<Utc>) -> Vec<RawRecord> {
    let Some(sel) = CardSelectors::new() else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    document
        .select(&sel.card)
        .map(|card| {
            let mut fields = Map::new();
            let mut put = |key: &str, value: Option<String>| {
                if let Some(v) = value.filter(|v| !v.is_empty()) {
                    fields.insert(key.to_string(), Value::String(v));
                }
            };

            put("title", first_text(card, &sel.title));
            put("company", first_text(card, &sel.company));
            put("location", first_text(card, &sel.location));
            put("salary", first_text(card, &sel.salary));

            let url = card
                .select(&sel.link)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(canonical_posting_url);
            put("job_url", url);

            if let Some(time) = card.select(&sel.time).next() {
                put("posted_date", time.value().attr("datetime").map(str::to_string));
                put("posted_text", Some(element_text(time)));
            }

            RawRecord::new(fields, fetched_at)
        })
        .collect()
}

fn first_text(card: ElementRef<'_>, selector: &Selector) -> Option<String> {
    card.select(selector).next().map(element_text)
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop tracking parameters; the posting is identified by its path.
fn canonical_posting_url(href: &str) -> String {
    match Url::parse(href.trim()) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => href.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize::normalize;
    use crate::types::criteria::TimeWindow;
    use crate::types::source::WorkType;
    use chrono::TimeZone;
    use mockito::Matcher;

    const PAGE: &str = r#"
        <ul>
          <li>
            <div class="base-card base-search-card job-search-card">
              <a class="base-card__full-link" href="https://ca.linkedin.com/jobs/view/senior-rust-engineer-at-acme-3912345678?refId=abc&trackingId=xyz">
                <span class="sr-only">Senior Rust Engineer</span>
              </a>
              <div class="base-search-card__info">
                <h3 class="base-search-card__title">
                    Senior Rust   Engineer
                </h3>
                <h4 class="base-search-card__subtitle"><a>Acme &amp; Co</a></h4>
                <div class="base-search-card__metadata">
                  <span class="job-search-card__location">Toronto, Ontario, Canada</span>
                  <span class="job-search-card__salary-info">CA$120,000.00 - CA$150,000.00</span>
                  <time class="job-search-card__listdate--new" datetime="2025-06-01">3 minutes ago</time>
                </div>
              </div>
            </div>
          </li>
          <li>
            <div class="base-card base-search-card job-search-card">
              <a class="base-card__full-link" href="https://ca.linkedin.com/jobs/view/3912345679"></a>
              <div class="base-search-card__info">
                <h4 class="base-search-card__subtitle">Nameless Inc</h4>
                <span class="job-search-card__location">Remote</span>
              </div>
            </div>
          </li>
        </ul>
    "#;

    fn fetched_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_search_page_extracts_cards() {
        let records = parse_search_page(PAGE, fetched_at());
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.get("title").unwrap(), "Senior Rust Engineer");
        assert_eq!(first.get("company").unwrap(), "Acme & Co");
        assert_eq!(
            first.get("job_url").unwrap(),
            "https://ca.linkedin.com/jobs/view/senior-rust-engineer-at-acme-3912345678"
        );
        assert_eq!(first.get("posted_text").unwrap(), "3 minutes ago");
        assert_eq!(first.get("posted_date").unwrap(), "2025-06-01");

        assert!(records[1].get("title").is_none());
    }

    #[test]
    fn test_parsed_cards_normalize() {
        let records = parse_search_page(PAGE, fetched_at());

        let job = normalize(&records[0], Source::LinkedIn).unwrap();
        assert_eq!(job.external_id.as_deref(), Some("3912345678"));
        assert_eq!(job.posting_time, fetched_at() - chrono::Duration::minutes(3));
        assert_eq!(job.salary_min, Some(120_000));
        assert_eq!(job.salary_max, Some(150_000));

        assert!(normalize(&records[1], Source::LinkedIn).is_err());
    }

    #[test]
    fn test_empty_page_yields_no_records() {
        assert!(parse_search_page("<html><body></body></html>", fetched_at()).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_paginates_until_empty_page() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("keywords".into(), "rust developer".into()),
                Matcher::UrlEncoded("start".into(), "0".into()),
                Matcher::UrlEncoded("f_TPR".into(), "r3600".into()),
                Matcher::UrlEncoded("f_WT".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(PAGE)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/search")
            .match_query(Matcher::UrlEncoded("start".into(), "25".into()))
            .with_status(200)
            .with_body("")
            .create_async()
            .await;

        let fetcher = LinkedInFetcher::new()
            .unwrap()
            .with_search_url(format!("{}/search", server.url()));
        let query = FetchQuery::new(TimeWindow::ONE_HOUR, 25)
            .with_keyword("rust developer")
            .with_work_type(WorkType::Remote);

        let records = fetcher.fetch(&query).await.unwrap();

        assert_eq!(records.len(), 2);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_respects_limit() {
        let mut server = mockito::Server::new_async().await;
        let only = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(PAGE)
            .expect(1)
            .create_async()
            .await;

        let fetcher = LinkedInFetcher::new()
            .unwrap()
            .with_search_url(format!("{}/search", server.url()));
        let records = fetcher
            .fetch(&FetchQuery::new(TimeWindow::ONE_HOUR, 1).with_keyword("rust"))
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        only.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limited_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let fetcher = LinkedInFetcher::new()
            .unwrap()
            .with_search_url(format!("{}/search", server.url()));
        let result = fetcher
            .fetch(&FetchQuery::new(TimeWindow::ONE_HOUR, 25).with_keyword("rust"))
            .await;

        assert!(matches!(result, Err(FetchError::RateLimited(Source::LinkedIn))));
    }

    #[tokio::test]
    async fn test_server_error_is_status_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let fetcher = LinkedInFetcher::new()
            .unwrap()
            .with_search_url(format!("{}/search", server.url()));
        let result = fetcher.fetch(&FetchQuery::new(TimeWindow::ONE_HOUR, 25)).await;

        assert!(matches!(result, Err(FetchError::Status { status: 503, .. })));
    }

    #[test]
    fn test_keyword_and_location_fanout_is_bounded() {
        let keywords: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        assert_eq!(bounded_or_blank(&keywords, 3).len(), 3);
        assert_eq!(bounded_or_blank(&[], 2), vec![String::new()]);
    }
}
