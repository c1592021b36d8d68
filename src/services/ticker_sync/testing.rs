// File: src/services/ticker_sync/testing.rs
//! In-memory stand-ins for the provider and the store.

use super::error::{ProviderError, StoreError};
use super::models::{
    AssetClass, Change, InstrumentPage, InstrumentRecord, InstrumentStatus, NaturalKey,
    RawInstrument,
};
use crate::db::postgres::repository::stock_repository::TraitStockRepository;
use crate::services::providers::TraitInstrumentProvider;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn record(symbol: &str, exchange: &str, name: &str) -> InstrumentRecord {
    InstrumentRecord {
        symbol: symbol.to_string(),
        exchange: exchange.to_string(),
        display_name: name.to_string(),
        asset_class: AssetClass::Equity,
        status: InstrumentStatus::Active,
    }
}

pub fn raw(symbol: &str, exchange: &str, name: &str) -> RawInstrument {
    RawInstrument {
        symbol: Some(symbol.to_string()),
        exchange: Some(exchange.to_string()),
        name: Some(name.to_string()),
        asset_class: Some("equity".to_string()),
        status: Some("active".to_string()),
    }
}

/// Serves fixed pages; individual pages can fail a set number of times.
#[derive(Default)]
pub struct ScriptedProvider {
    pages: Vec<Vec<RawInstrument>>,
    transient_failures: Mutex<HashMap<usize, usize>>,
    rejected_pages: HashSet<usize>,
    endless: bool,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn with_pages(pages: Vec<Vec<RawInstrument>>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    /// Reports `has_more` forever.
    pub fn endless() -> Self {
        Self {
            endless: true,
            ..Default::default()
        }
    }

    pub fn failing_page(self, page_index: usize, times: usize) -> Self {
        self.transient_failures
            .lock()
            .unwrap()
            .insert(page_index, times);
        self
    }

    pub fn rejecting_page(mut self, page_index: usize) -> Self {
        self.rejected_pages.insert(page_index);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TraitInstrumentProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_page(
        &self,
        page_index: usize,
        _page_size: usize,
    ) -> Result<InstrumentPage, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.rejected_pages.contains(&page_index) {
            return Err(ProviderError::Status {
                status: 401,
                body: "unauthorized".to_string(),
            });
        }

        {
            let mut failures = self.transient_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&page_index) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(ProviderError::Status {
                        status: 503,
                        body: "unavailable".to_string(),
                    });
                }
            }
        }

        if self.endless {
            return Ok(InstrumentPage {
                entries: vec![raw(&format!("T{}", page_index), "NYSE", "Endless")],
                has_more: true,
            });
        }

        Ok(InstrumentPage {
            entries: self.pages.get(page_index).cloned().unwrap_or_default(),
            has_more: page_index + 1 < self.pages.len(),
        })
    }
}

/// Store kept in a map; a chosen `apply_batch` call can be made to fail
/// without touching any row.
#[derive(Default)]
pub struct MemoryStockRepository {
    rows: Mutex<BTreeMap<NaturalKey, InstrumentRecord>>,
    batches_applied: AtomicUsize,
    batch_calls: AtomicUsize,
    fail_on_batch: Option<usize>,
}

impl MemoryStockRepository {
    /// Fails the `n`th call to `apply_batch` (1-based).
    pub fn failing_on_batch(mut self, n: usize) -> Self {
        self.fail_on_batch = Some(n);
        self
    }

    pub fn seed(&self, records: Vec<InstrumentRecord>) {
        let mut rows = self.rows.lock().unwrap();
        for record in records {
            rows.insert(record.key(), record);
        }
    }

    /// Snapshot ordered by natural key.
    pub fn rows(&self) -> Vec<InstrumentRecord> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    pub fn batches_applied(&self) -> usize {
        self.batches_applied.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TraitStockRepository for MemoryStockRepository {
    async fn load_all(&self) -> Result<Vec<InstrumentRecord>, StoreError> {
        Ok(self.rows())
    }

    async fn get(&self, key: &NaturalKey) -> Result<Option<InstrumentRecord>, StoreError> {
        let rows = self.rows.lock().unwrap();
        if let Some(exact) = rows.get(key) {
            return Ok(Some(exact.clone()));
        }
        Ok(rows
            .values()
            .find(|record| &record.normalized_key() == key)
            .cloned())
    }

    async fn apply_batch(&self, changes: &[Change]) -> Result<u64, StoreError> {
        let call = self.batch_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_batch == Some(call) {
            return Err(StoreError::Database(sqlx::Error::Protocol(format!(
                "injected failure on batch {}",
                call
            ))));
        }

        let mut rows = self.rows.lock().unwrap();
        let mut touched = 0;
        for change in changes {
            match change {
                Change::Insert(record) => {
                    rows.insert(record.key(), record.clone());
                    touched += 1;
                }
                Change::Update { before, after } => {
                    rows.remove(&before.key());
                    rows.insert(after.key(), after.clone());
                    touched += 1;
                }
                Change::Retire(record) => {
                    if let Some(existing) = rows.get_mut(&record.key()) {
                        existing.status = InstrumentStatus::Delisted;
                        touched += 1;
                    }
                }
                Change::Unchanged(_) => {}
            }
        }
        self.batches_applied.fetch_add(1, Ordering::SeqCst);
        Ok(touched)
    }
}
