// File: src/services/ticker_sync/error.rs
use super::models::NaturalKey;
use crate::env_config::error::ConfigError;
use thiserror::Error;

/// Failure of a single provider request. Retried by the fetcher.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed provider payload: {0}")]
    Payload(String),
}

impl ProviderError {
    /// Client errors and bad payloads will not heal on retry; timeouts,
    /// throttling, 5xx and transport errors might.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Http(_) => true,
            ProviderError::Status { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            ProviderError::Io(_) | ProviderError::Payload(_) => false,
        }
    }
}

/// A page could not be fetched within the retry budget.
#[derive(Debug, Error)]
#[error("fetch failed at page {page_index}: {cause}")]
pub struct FetchError {
    pub cause: String,
    pub page_index: usize,
}

/// Store-level failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored row {key} is invalid: {reason}")]
    InvalidRow { key: String, reason: String },
}

/// A batch failed to commit. Batches before it stay committed.
#[derive(Debug, Error)]
#[error("write failed after {last_successful_key:?}: {cause}")]
pub struct WriteError {
    pub cause: String,
    pub last_successful_key: Option<NaturalKey>,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to read current store state: {0}")]
    Load(#[source] StoreError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("pipeline already ran; create a new one per run")]
    AlreadyRan,
}
