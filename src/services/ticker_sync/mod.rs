pub mod error;
pub mod fetcher;
pub mod maintenance;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod reconciler;
pub mod writer;

#[cfg(test)]
pub mod testing;

use crate::db::postgres::postgres_service::PostgresService;
use crate::env_config::models::app_setting::AppSettings;
use crate::services::providers::build_provider;
use error::SyncError;
use fetcher::{FetcherConfig, SourceFetcher};
use models::SyncOutcome;
use pipeline::TickerSyncPipeline;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;
use writer::WriterConfig;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Reconcile and report without writing
    pub dry_run: bool,
}

/// Runs one full ticker sync: fetch the catalog, then open the store,
/// reconcile and write. The store is only opened once the catalog has been
/// fetched in full and is closed again on every path.
pub async fn run(settings: &AppSettings, options: RunOptions) -> Result<SyncOutcome, SyncError> {
    let run_id = Uuid::new_v4();
    let span = info_span!("ticker_sync", %run_id, dry_run = options.dry_run);

    async move {
        info!("Starting ticker sync");

        let provider = build_provider(settings)?;
        let fetcher = SourceFetcher::new(provider, FetcherConfig::from(&settings.app_config.provider));
        let writer_config = WriterConfig::from(&settings.app_config.writer);
        let mut pipeline = TickerSyncPipeline::new(fetcher, writer_config, options.dry_run);

        let catalog = pipeline.fetch().await?;
        info!("Catalog fetched: {} entries", catalog.entry_count());

        let service = match PostgresService::new(settings).await {
            Ok(service) => service,
            Err(e) => {
                error!("Cannot open stocks store: {}", e);
                pipeline.fail();
                return Err(SyncError::Load(e.into()));
            }
        };

        let result = pipeline
            .apply(catalog, service.repository_stock.as_ref())
            .await;
        service.close().await;

        info!("Ticker sync ended in state {}", pipeline.state());
        result
    }
    .instrument(span)
    .await
}
