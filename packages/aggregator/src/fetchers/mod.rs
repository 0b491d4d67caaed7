//! Source fetcher implementations, one per way of reaching a board.
//!
//! - `LinkedInFetcher` - LinkedIn guest search, scraped directly
//! - `ApifyFetcher` - any board with a hosted Apify scraper actor
//!   (Indeed, Glassdoor, ZipRecruiter)
//!
//! For tests, see [`crate::testing::MockFetcher`].

mod apify;
mod linkedin;

pub use apify::{ApifyFetcher, DEFAULT_RUN_TIMEOUT, INDEED_ACTOR};
pub use linkedin::{parse_search_page, LinkedInFetcher, DEFAULT_REQUESTS_PER_MINUTE};
