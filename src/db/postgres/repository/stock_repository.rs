// src/db/postgres/repository/stock_repository.rs
use crate::db::postgres::connection::PostgresConnection;
use crate::db::postgres::models::stock::PgStock;
use crate::services::ticker_sync::error::StoreError;
use crate::services::ticker_sync::models::{Change, InstrumentRecord, NaturalKey};
use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Reference table for tradable instruments, keyed by (symbol, exchange).
///
/// Expected shape, created by the schema migrations:
/// `stocks(symbol text, exchange text, display_name text, asset_class text,
/// status text, updated_at timestamptz, UNIQUE (symbol, exchange))`
#[async_trait]
pub trait TraitStockRepository {
    /// Gets every row, active or delisted
    async fn load_all(&self) -> Result<Vec<InstrumentRecord>, StoreError>;

    /// Gets one row by natural key, compared trimmed and upper-cased. A row
    /// stored exactly as `key` is preferred over a variant of it.
    async fn get(&self, key: &NaturalKey) -> Result<Option<InstrumentRecord>, StoreError>;

    /// Applies a batch of changes in one transaction; either all of them
    /// land or none do. `Unchanged` entries are ignored. Returns rows touched.
    async fn apply_batch(&self, changes: &[Change]) -> Result<u64, StoreError>;
}

pub type SharedStockRepository = Arc<dyn TraitStockRepository + Send + Sync>;

pub struct StructStockRepository {
    connection: Arc<PostgresConnection>,
}

impl StructStockRepository {
    pub fn new(connection: Arc<PostgresConnection>) -> Self {
        Self { connection }
    }
}

fn to_record(row: PgStock) -> Result<InstrumentRecord, StoreError> {
    let key = format!("{}:{}", row.exchange, row.symbol);
    InstrumentRecord::try_from(row).map_err(|reason| StoreError::InvalidRow { key, reason })
}

#[async_trait]
impl TraitStockRepository for StructStockRepository {
    async fn load_all(&self) -> Result<Vec<InstrumentRecord>, StoreError> {
        let pool = self.connection.get_pool();

        debug!("Fetching all stock rows");

        let rows = sqlx::query_as::<_, PgStock>(
            "SELECT symbol, exchange, display_name, asset_class, status, updated_at
             FROM stocks
             ORDER BY symbol, exchange",
        )
        .fetch_all(pool)
        .await
        .map_err(|e| {
            error!("Error fetching stock rows: {}", e);
            StoreError::Database(e)
        })?;

        debug!("Fetched {} stock rows", rows.len());

        rows.into_iter().map(to_record).collect()
    }

    async fn get(&self, key: &NaturalKey) -> Result<Option<InstrumentRecord>, StoreError> {
        let pool = self.connection.get_pool();

        debug!("Fetching stock row {}", key);

        let row = sqlx::query_as::<_, PgStock>(
            "SELECT symbol, exchange, display_name, asset_class, status, updated_at
             FROM stocks
             WHERE upper(btrim(symbol)) = $1 AND upper(btrim(exchange)) = $2
             ORDER BY (symbol = $1 AND exchange = $2) DESC
             LIMIT 1",
        )
        .bind(&key.symbol)
        .bind(&key.exchange)
        .fetch_optional(pool)
        .await?;

        match row {
            Some(row) => {
                debug!("Found stock row {} (updated {})", key, row.updated_at);
                Ok(Some(to_record(row)?))
            }
            None => {
                debug!("No stock row for {}", key);
                Ok(None)
            }
        }
    }

    async fn apply_batch(&self, changes: &[Change]) -> Result<u64, StoreError> {
        let batch = SqlBatch::from_changes(changes);

        if batch.is_empty() {
            return Ok(0);
        }

        // Dropping the transaction without commit rolls the batch back.
        let mut tx = self.connection.get_pool().begin().await?;
        let mut rows_affected = 0;

        for (before, after) in &batch.rekeys {
            let result = rekey_query(before, after)
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    error!("Error rewriting key {} as {}: {}", before.key(), after.key(), e);
                    StoreError::Database(e)
                })?;
            rows_affected += result.rows_affected();
        }

        if !batch.upserts.is_empty() {
            let result = upsert_query(&batch.upserts)
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    error!("Error upserting {} stock rows: {}", batch.upserts.len(), e);
                    StoreError::Database(e)
                })?;
            rows_affected += result.rows_affected();
        }

        if !batch.retires.is_empty() {
            let result = retire_query(&batch.retires)
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    error!("Error retiring {} stock rows: {}", batch.retires.len(), e);
                    StoreError::Database(e)
                })?;
            rows_affected += result.rows_affected();
        }

        tx.commit().await?;

        info!(
            "Committed stock batch: {} upserts, {} retirements, {} rows affected",
            batch.upserts.len(),
            batch.retires.len(),
            rows_affected
        );

        Ok(rows_affected)
    }
}

/// Statements one batch turns into, in execution order: key rewrites, then
/// upserts, then retirements.
#[derive(Debug, Default)]
struct SqlBatch<'a> {
    rekeys: Vec<(&'a InstrumentRecord, &'a InstrumentRecord)>,
    upserts: Vec<&'a InstrumentRecord>,
    retires: Vec<&'a InstrumentRecord>,
}

impl<'a> SqlBatch<'a> {
    fn from_changes(changes: &'a [Change]) -> Self {
        let mut batch = SqlBatch::default();
        for change in changes {
            match change {
                Change::Insert(record) => batch.upserts.push(record),
                Change::Update { before, after } => {
                    if before.key() != after.key() {
                        batch.rekeys.push((before, after));
                    }
                    batch.upserts.push(after);
                }
                Change::Retire(record) => batch.retires.push(record),
                Change::Unchanged(_) => {}
            }
        }
        batch
    }

    fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.retires.is_empty()
    }
}

/// Moves a row stored under a non-normalized key onto its normalized key.
fn rekey_query<'a>(
    before: &'a InstrumentRecord,
    after: &'a InstrumentRecord,
) -> QueryBuilder<'a, Postgres> {
    let mut query = QueryBuilder::new("UPDATE stocks SET symbol = ");
    query
        .push_bind(&after.symbol)
        .push(", exchange = ")
        .push_bind(&after.exchange)
        .push(" WHERE symbol = ")
        .push_bind(&before.symbol)
        .push(" AND exchange = ")
        .push_bind(&before.exchange);
    query
}

fn upsert_query<'a>(records: &[&'a InstrumentRecord]) -> QueryBuilder<'a, Postgres> {
    let mut query = QueryBuilder::new(
        "INSERT INTO stocks (symbol, exchange, display_name, asset_class, status, updated_at) ",
    );
    query.push_values(records.iter().copied(), |mut row, record| {
        row.push_bind(&record.symbol)
            .push_bind(&record.exchange)
            .push_bind(&record.display_name)
            .push_bind(record.asset_class.as_str())
            .push_bind(record.status.as_str())
            .push("NOW()");
    });
    query.push(
        " ON CONFLICT (symbol, exchange) DO UPDATE SET
            display_name = EXCLUDED.display_name,
            asset_class = EXCLUDED.asset_class,
            status = EXCLUDED.status,
            updated_at = EXCLUDED.updated_at",
    );
    query
}

/// Soft delete: rows keep every field except `status` and `updated_at`.
fn retire_query<'a>(records: &[&'a InstrumentRecord]) -> QueryBuilder<'a, Postgres> {
    let mut query = QueryBuilder::new(
        "UPDATE stocks SET status = 'delisted', updated_at = NOW()
         WHERE (symbol, exchange) IN ",
    );
    query.push_tuples(records.iter().copied(), |mut row, record| {
        row.push_bind(&record.symbol).push_bind(&record.exchange);
    });
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ticker_sync::testing::record;

    fn compact(sql: &str) -> String {
        sql.split_whitespace().collect()
    }

    #[test]
    fn test_batch_splits_changes_by_statement() {
        let renamed = record("aapl", "NASDAQ", "Apple Inc");
        let changes = vec![
            Change::Insert(record("IBM", "NYSE", "IBM")),
            Change::Update {
                before: record("KO", "NYSE", "Coca-Cola"),
                after: record("KO", "NYSE", "The Coca-Cola Company"),
            },
            Change::Update {
                before: renamed.clone(),
                after: record("AAPL", "NASDAQ", "Apple Inc"),
            },
            Change::Unchanged(NaturalKey::new("MSFT", "NASDAQ")),
            Change::Retire(record("TWTR", "NYSE", "Twitter").retired()),
        ];

        let batch = SqlBatch::from_changes(&changes);

        assert_eq!(batch.rekeys.len(), 1);
        assert_eq!(batch.rekeys[0].0, &renamed);
        let upserted: Vec<&str> = batch.upserts.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(upserted, vec!["IBM", "KO", "AAPL"]);
        assert_eq!(batch.retires.len(), 1);
        assert!(!batch.is_empty());
    }

    #[test]
    fn test_unchanged_only_batch_is_empty() {
        let changes = vec![Change::Unchanged(NaturalKey::new("MSFT", "NASDAQ"))];
        assert!(SqlBatch::from_changes(&changes).is_empty());
    }

    #[test]
    fn test_upsert_targets_natural_key() {
        let aapl = record("AAPL", "NASDAQ", "Apple Inc");
        let ibm = record("IBM", "NYSE", "IBM");

        let query = upsert_query(&[&aapl, &ibm]);
        let sql = compact(query.sql());

        assert!(sql.starts_with(
            "INSERTINTOstocks(symbol,exchange,display_name,asset_class,status,updated_at)"
        ));
        assert!(sql.contains("VALUES($1,$2,$3,$4,$5,NOW()),($6,$7,$8,$9,$10,NOW())"));
        assert!(sql.contains("ONCONFLICT(symbol,exchange)DOUPDATESET"));
        assert!(sql.contains("status=EXCLUDED.status"));
        assert!(!sql.contains("$11"));
    }

    #[test]
    fn test_retire_only_touches_status() {
        let twtr = record("TWTR", "NYSE", "Twitter");
        let enrn = record("ENRN", "NYSE", "Enron");

        let query = retire_query(&[&twtr, &enrn]);
        let sql = compact(query.sql());

        assert!(sql.starts_with("UPDATEstocksSETstatus='delisted',updated_at=NOW()"));
        assert!(sql.ends_with("WHERE(symbol,exchange)IN(($1,$2),($3,$4))"));
        assert!(!sql.contains("DELETE"));
    }

    #[test]
    fn test_rekey_addresses_stored_row() {
        let before = record("aapl", "nasdaq", "Apple Inc");
        let after = record("AAPL", "NASDAQ", "Apple Inc");

        let query = rekey_query(&before, &after);

        assert_eq!(
            query.sql(),
            "UPDATE stocks SET symbol = $1, exchange = $2 WHERE symbol = $3 AND exchange = $4"
        );
    }
}
