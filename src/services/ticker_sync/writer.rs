// File: src/services/ticker_sync/writer.rs
use super::error::WriteError;
use super::models::{Change, NaturalKey};
use crate::db::postgres::repository::stock_repository::TraitStockRepository;
use crate::env_config::models::app_config::WriterSettings;
use tracing::{debug, error, info};

#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub batch_size: usize,
}

impl From<&WriterSettings> for WriterConfig {
    fn from(settings: &WriterSettings) -> Self {
        Self {
            batch_size: settings.batch_size.max(1),
        }
    }
}

/// Applies a reconciliation to the store in atomic, key-ordered batches.
pub struct SyncWriter<'a> {
    repository: &'a (dyn TraitStockRepository + Send + Sync),
    config: WriterConfig,
}

impl<'a> SyncWriter<'a> {
    pub fn new(repository: &'a (dyn TraitStockRepository + Send + Sync), config: WriterConfig) -> Self {
        Self { repository, config }
    }

    /// Writes every non-`Unchanged` change and returns how many were written.
    ///
    /// Batches before a failing one stay committed; the failing batch is
    /// rolled back as a whole. Re-running with the same changes converges on
    /// the same end state.
    pub async fn apply(&self, changes: &[Change]) -> Result<usize, WriteError> {
        let writes: Vec<Change> = changes.iter().filter(|c| c.is_write()).cloned().collect();

        if writes.is_empty() {
            info!("Store already up to date, nothing to write");
            return Ok(0);
        }

        let total_batches = writes.len().div_ceil(self.config.batch_size);
        let mut last_successful_key: Option<NaturalKey> = None;
        let mut written = 0;

        for (index, batch) in writes.chunks(self.config.batch_size).enumerate() {
            debug!(
                "Applying batch {}/{} ({} changes)",
                index + 1,
                total_batches,
                batch.len()
            );

            if let Err(e) = self.repository.apply_batch(batch).await {
                error!(
                    "Batch {}/{} failed, last committed key {:?}: {}",
                    index + 1,
                    total_batches,
                    last_successful_key.as_ref().map(ToString::to_string),
                    e
                );
                return Err(WriteError {
                    cause: e.to_string(),
                    last_successful_key,
                });
            }

            written += batch.len();
            last_successful_key = batch.last().map(Change::key);
        }

        info!("Wrote {} changes in {} batches", written, total_batches);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ticker_sync::models::InstrumentStatus;
    use crate::services::ticker_sync::testing::{MemoryStockRepository, record};

    fn inserts(symbols: &[&str]) -> Vec<Change> {
        symbols
            .iter()
            .map(|s| Change::Insert(record(s, "NYSE", s)))
            .collect()
    }

    #[tokio::test]
    async fn test_changes_are_batched() {
        let repository = MemoryStockRepository::default();
        let writer = SyncWriter::new(&repository, WriterConfig { batch_size: 2 });

        let written = writer
            .apply(&inserts(&["A", "B", "C", "D", "E"]))
            .await
            .unwrap();

        assert_eq!(written, 5);
        assert_eq!(repository.batches_applied(), 3);
        assert_eq!(repository.rows().len(), 5);
    }

    #[tokio::test]
    async fn test_unchanged_entries_are_not_written() {
        let repository = MemoryStockRepository::default();
        let writer = SyncWriter::new(&repository, WriterConfig { batch_size: 10 });

        let written = writer
            .apply(&[Change::Unchanged(NaturalKey::new("A", "NYSE"))])
            .await
            .unwrap();

        assert_eq!(written, 0);
        assert_eq!(repository.batches_applied(), 0);
    }

    #[tokio::test]
    async fn test_failed_batch_keeps_earlier_batches() {
        let repository = MemoryStockRepository::default().failing_on_batch(3);
        let writer = SyncWriter::new(&repository, WriterConfig { batch_size: 2 });

        let err = writer
            .apply(&inserts(&["A", "B", "C", "D", "E", "F"]))
            .await
            .unwrap_err();

        assert_eq!(err.last_successful_key, Some(NaturalKey::new("D", "NYSE")));
        let stored: Vec<String> = repository.rows().into_iter().map(|r| r.symbol).collect();
        assert_eq!(stored, vec!["A", "B", "C", "D"]);
    }

    #[tokio::test]
    async fn test_failure_in_first_batch_has_no_key() {
        let repository = MemoryStockRepository::default().failing_on_batch(1);
        let writer = SyncWriter::new(&repository, WriterConfig { batch_size: 2 });

        let err = writer.apply(&inserts(&["A", "B", "C"])).await.unwrap_err();

        assert_eq!(err.last_successful_key, None);
        assert!(repository.rows().is_empty());
    }

    #[tokio::test]
    async fn test_reapplying_is_idempotent() {
        let repository = MemoryStockRepository::default();
        let writer = SyncWriter::new(&repository, WriterConfig { batch_size: 2 });
        let changes = vec![
            Change::Insert(record("A", "NYSE", "Alpha")),
            Change::Retire(record("B", "NYSE", "Beta").retired()),
        ];
        repository.seed(vec![record("B", "NYSE", "Beta")]);

        writer.apply(&changes).await.unwrap();
        let first = repository.rows();
        writer.apply(&changes).await.unwrap();

        assert_eq!(repository.rows(), first);
        assert_eq!(first[1].status, InstrumentStatus::Delisted);
    }
}
