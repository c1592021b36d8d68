// src/db/postgres/models/stock.rs
use crate::services::ticker_sync::models::InstrumentRecord;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Represents a record in the stocks table
#[derive(Debug, FromRow)]
pub struct PgStock {
    pub symbol: String,
    pub exchange: String,
    pub display_name: String,
    /// One of `equity`, `etf`, `other`
    pub asset_class: String,
    /// One of `active`, `delisted`
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PgStock> for InstrumentRecord {
    type Error = String;

    fn try_from(row: PgStock) -> Result<Self, Self::Error> {
        Ok(InstrumentRecord {
            asset_class: row.asset_class.parse()?,
            status: row.status.parse()?,
            symbol: row.symbol,
            exchange: row.exchange,
            display_name: row.display_name,
        })
    }
}
