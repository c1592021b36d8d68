// File: src/services/ticker_sync/maintenance.rs
//! Single-instrument edits made by an operator outside a full sync.

use super::error::StoreError;
use super::models::{Change, InstrumentRecord, InstrumentStatus, NaturalKey};
use super::reconciler::classify;
use crate::db::postgres::repository::stock_repository::TraitStockRepository;
use tracing::info;

/// Inserts or updates one instrument by natural key.
pub async fn add_instrument(
    repository: &(dyn TraitStockRepository + Send + Sync),
    record: InstrumentRecord,
) -> Result<Change, StoreError> {
    let existing = repository.get(&record.key()).await?;
    let change = classify(record, existing);

    match &change {
        Change::Unchanged(key) => info!("{} already exists with the same fields", key),
        Change::Insert(record) => info!("{} added", record.key()),
        Change::Update { after, .. } => info!("{} updated", after.key()),
        Change::Retire(_) => {}
    }

    if change.is_write() {
        repository.apply_batch(std::slice::from_ref(&change)).await?;
    }
    Ok(change)
}

#[derive(Debug, PartialEq, Eq)]
pub enum RetireResult {
    Retired(InstrumentRecord),
    AlreadyDelisted,
    NotFound,
}

/// Marks one instrument delisted. Rows are never deleted.
pub async fn retire_instrument(
    repository: &(dyn TraitStockRepository + Send + Sync),
    key: &NaturalKey,
) -> Result<RetireResult, StoreError> {
    let Some(existing) = repository.get(key).await? else {
        info!("Cannot retire {}, which does not exist in the stocks table", key);
        return Ok(RetireResult::NotFound);
    };

    if existing.status == InstrumentStatus::Delisted {
        info!("{} is already delisted", key);
        return Ok(RetireResult::AlreadyDelisted);
    }

    let retired = existing.retired();
    repository
        .apply_batch(&[Change::Retire(retired.clone())])
        .await?;
    info!("{} has been retired", key);
    Ok(RetireResult::Retired(retired))
}
