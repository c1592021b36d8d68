// File: src/services/ticker_sync/fetcher.rs
use super::error::FetchError;
use super::models::{InstrumentPage, RawInstrument};
use crate::env_config::models::app_config::ProviderConfig;
use crate::services::providers::SharedProvider;
use futures::stream::{self, Stream, TryStreamExt};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub page_size: usize,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_pages: usize,
}

impl From<&ProviderConfig> for FetcherConfig {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            page_size: config.page_size,
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            max_pages: config.max_pages,
        }
    }
}

/// Pulls the full instrument catalog from a provider, page by page, with
/// bounded exponential backoff per page.
pub struct SourceFetcher {
    provider: SharedProvider,
    config: FetcherConfig,
}

impl SourceFetcher {
    pub fn new(provider: SharedProvider, config: FetcherConfig) -> Self {
        Self { provider, config }
    }

    /// Lazy sequence of raw entries. Every call starts again at page 0.
    /// The stream ends after the first error it yields.
    pub fn stream(&self) -> impl Stream<Item = Result<RawInstrument, FetchError>> + '_ {
        stream::try_unfold(Some(0usize), move |next_page| async move {
            let Some(page_index) = next_page else {
                return Ok(None);
            };

            if page_index >= self.config.max_pages {
                return Err(FetchError {
                    cause: format!(
                        "provider still reports more data after {} pages",
                        self.config.max_pages
                    ),
                    page_index,
                });
            }

            let page = self.fetch_page_with_retry(page_index).await?;
            let next_page = page.has_more.then_some(page_index + 1);
            let entries = stream::iter(page.entries.into_iter().map(Ok::<_, FetchError>));

            Ok(Some((entries, next_page)))
        })
        .try_flatten()
    }

    /// Drains the whole catalog. Any page failure discards what was read.
    pub async fn fetch_all(&self) -> Result<Vec<RawInstrument>, FetchError> {
        let started = Instant::now();
        info!("Fetching instrument catalog from {}", self.provider.name());

        let entries: Vec<RawInstrument> = self.stream().try_collect().await?;

        info!(
            "Fetched {} catalog entries from {} in {:?}",
            entries.len(),
            self.provider.name(),
            started.elapsed()
        );
        Ok(entries)
    }

    async fn fetch_page_with_retry(&self, page_index: usize) -> Result<InstrumentPage, FetchError> {
        let mut attempt = 1;
        let mut delay = self.config.initial_backoff;

        loop {
            match self
                .provider
                .fetch_page(page_index, self.config.page_size)
                .await
            {
                Ok(page) => {
                    debug!(
                        "Page {} fetched on attempt {}: {} entries",
                        page_index,
                        attempt,
                        page.entries.len()
                    );
                    return Ok(page);
                }
                Err(e) if !e.is_retryable() => {
                    error!("Page {} failed with non-retryable error: {}", page_index, e);
                    return Err(FetchError {
                        cause: e.to_string(),
                        page_index,
                    });
                }
                Err(e) if attempt >= self.config.max_attempts => {
                    error!(
                        "Page {} failed after {} attempts: {}",
                        page_index, attempt, e
                    );
                    return Err(FetchError {
                        cause: e.to_string(),
                        page_index,
                    });
                }
                Err(e) => {
                    warn!(
                        "Page {} attempt {}/{} failed: {}; retrying in {:?}",
                        page_index, attempt, self.config.max_attempts, e, delay
                    );
                    sleep(delay).await;
                    delay = (delay * 2).min(self.config.max_backoff);
                    attempt += 1;
                }
            }
        }
    }
}
