// File: src/services/ticker_sync/normalizer.rs
use super::models::{
    AssetClass, InstrumentRecord, InstrumentStatus, IssueReason, RawInstrument, SyncIssue,
    normalize_code,
};
use tracing::warn;

/// Turns provider entries into store-shaped records, preserving fetch order.
/// Entries that cannot be keyed or whose status is unknown become
/// `invalid_record` issues instead of records.
pub fn normalize(raw: Vec<RawInstrument>) -> (Vec<InstrumentRecord>, Vec<SyncIssue>) {
    let mut records = Vec::with_capacity(raw.len());
    let mut issues = Vec::new();

    for entry in raw {
        match normalize_entry(&entry) {
            Some(record) => records.push(record),
            None => {
                warn!("Rejected catalog entry: {:?}", entry);
                issues.push(SyncIssue {
                    symbol: entry.symbol_text().trim().to_string(),
                    reason: IssueReason::InvalidRecord,
                });
            }
        }
    }

    (records, issues)
}

fn normalize_entry(entry: &RawInstrument) -> Option<InstrumentRecord> {
    let symbol = normalize_code(entry.symbol_text());
    let exchange = normalize_code(entry.exchange.as_deref().unwrap_or_default());

    if symbol.is_empty() || exchange.is_empty() || symbol.chars().any(char::is_whitespace) {
        return None;
    }

    let status = InstrumentStatus::from_provider(entry.status.as_deref())?;
    let asset_class = AssetClass::from_provider(entry.asset_class.as_deref());

    let display_name = entry
        .name
        .as_deref()
        .map(collapse_whitespace)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| symbol.clone());

    Some(InstrumentRecord {
        symbol,
        exchange,
        display_name,
        asset_class,
        status,
    })
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
