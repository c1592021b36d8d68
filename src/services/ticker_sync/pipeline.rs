// File: src/services/ticker_sync/pipeline.rs
use super::error::SyncError;
use super::fetcher::SourceFetcher;
use super::models::{RawInstrument, SyncOutcome};
use super::normalizer::normalize;
use super::reconciler::reconcile;
use super::writer::{SyncWriter, WriterConfig};
use crate::db::postgres::repository::stock_repository::TraitStockRepository;
use std::fmt;
use tracing::{error, info, warn};

/// Progress of a single run. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Fetching,
    Reconciling,
    Writing,
    Succeeded,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Fetching => "fetching",
            RunState::Reconciling => "reconciling",
            RunState::Writing => "writing",
            RunState::Succeeded => "succeeded",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Catalog snapshot handed from the fetch phase to the store phase.
#[derive(Debug)]
pub struct FetchedCatalog {
    entries: Vec<RawInstrument>,
}

impl FetchedCatalog {
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

/// One traversal of Fetching → Reconciling → Writing.
///
/// The fetch phase and the store phase are separate calls so the caller can
/// open the database only once the catalog is in hand.
pub struct TickerSyncPipeline {
    fetcher: SourceFetcher,
    writer_config: WriterConfig,
    dry_run: bool,
    state: RunState,
}

impl TickerSyncPipeline {
    pub fn new(fetcher: SourceFetcher, writer_config: WriterConfig, dry_run: bool) -> Self {
        Self {
            fetcher,
            writer_config,
            dry_run,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        info!("Ticker sync: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Marks the run failed for errors raised outside the pipeline, such as
    /// the store connection failing between phases.
    pub fn fail(&mut self) {
        if !matches!(self.state, RunState::Succeeded | RunState::Failed) {
            self.transition(RunState::Failed);
        }
    }

    pub async fn fetch(&mut self) -> Result<FetchedCatalog, SyncError> {
        if self.state != RunState::Idle {
            return Err(SyncError::AlreadyRan);
        }
        self.transition(RunState::Fetching);

        match self.fetcher.fetch_all().await {
            Ok(entries) => Ok(FetchedCatalog { entries }),
            Err(e) => {
                error!("Ticker sync aborted while fetching: {}", e);
                self.transition(RunState::Failed);
                Err(e.into())
            }
        }
    }

    pub async fn apply(
        &mut self,
        catalog: FetchedCatalog,
        repository: &(dyn TraitStockRepository + Send + Sync),
    ) -> Result<SyncOutcome, SyncError> {
        if self.state != RunState::Fetching {
            return Err(SyncError::AlreadyRan);
        }
        self.transition(RunState::Reconciling);

        let stored = match repository.load_all().await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Ticker sync aborted while reading the store: {}", e);
                self.transition(RunState::Failed);
                return Err(SyncError::Load(e));
            }
        };

        let (records, mut issues) = normalize(catalog.entries);
        info!(
            "Reconciling {} catalog records against {} stored rows",
            records.len(),
            stored.len()
        );
        let reconciliation = reconcile(records, stored);
        issues.extend(reconciliation.issues);

        for issue in &issues {
            warn!("Catalog issue: {} ({})", issue.symbol, issue.reason);
        }

        let outcome = SyncOutcome::from_changes(&reconciliation.changes, issues);

        if self.dry_run {
            info!("Dry run, skipping {} writes", outcome.writes());
            self.transition(RunState::Succeeded);
            return Ok(outcome);
        }

        self.transition(RunState::Writing);
        let writer = SyncWriter::new(repository, self.writer_config.clone());
        if let Err(e) = writer.apply(&reconciliation.changes).await {
            self.transition(RunState::Failed);
            return Err(e.into());
        }

        self.transition(RunState::Succeeded);
        info!(
            "Ticker sync finished: {} inserted, {} updated, {} retired, {} unchanged, {} issues",
            outcome.inserted,
            outcome.updated,
            outcome.retired,
            outcome.unchanged,
            outcome.errors.len()
        );
        Ok(outcome)
    }
}
