use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Apify API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("actor run ended with status {0}")]
    RunFailed(String),

    /// Run was still going when the wait budget ran out
    #[error("actor run {run_id} still running after {waited:?}")]
    WaitTimedOut { run_id: String, waited: Duration },
}

pub type Result<T> = std::result::Result<T, ApifyError>;
