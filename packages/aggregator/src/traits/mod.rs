//! Core trait abstractions: where boards and storage plug in.

pub mod fetcher;
pub mod seen_store;

pub use fetcher::{FetchQuery, RawRecord, SourceFetcher};
pub use seen_store::SeenStore;
