// File: src/services/providers/sec_tickers.rs
use super::TraitInstrumentProvider;
use crate::services::ticker_sync::error::ProviderError;
use crate::services::ticker_sync::models::{InstrumentPage, RawInstrument};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Where the SEC `company_tickers.json` document comes from.
pub enum SecSource {
    File(PathBuf),
    Http { client: Client, url: String },
}

/// One value of the SEC document, keyed by a running index:
/// `{"0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."}, ...}`
#[derive(Debug, Default, Deserialize)]
struct SecTickerEntry {
    #[serde(default)]
    ticker: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl SecTickerEntry {
    /// Entries of the wrong shape come back empty and are rejected later as
    /// invalid records.
    fn from_value(index: &str, value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or_else(|e| {
            warn!("Unreadable SEC entry {}: {}", index, e);
            SecTickerEntry::default()
        })
    }
}

/// Serves the SEC company ticker list as pages of `page_size` entries.
///
/// The document is loaded on first use and kept for the provider's
/// lifetime; a failed load is not cached, so a retry reloads it.
pub struct StructSecTickersProvider {
    source: SecSource,
    default_exchange: String,
    entries: OnceCell<Vec<RawInstrument>>,
}

impl StructSecTickersProvider {
    pub fn new(source: SecSource, default_exchange: String) -> Self {
        Self {
            source,
            default_exchange,
            entries: OnceCell::new(),
        }
    }

    async fn load_document(&self) -> Result<Vec<u8>, ProviderError> {
        match &self.source {
            SecSource::File(path) => {
                info!("Reading SEC ticker file {}", path.display());
                Ok(tokio::fs::read(path).await?)
            }
            SecSource::Http { client, url } => {
                info!("Downloading SEC ticker file from {}", url);
                let response = client.get(url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(ProviderError::Status {
                        status: status.as_u16(),
                        body,
                    });
                }
                Ok(response.bytes().await?.to_vec())
            }
        }
    }

    async fn entries(&self) -> Result<&Vec<RawInstrument>, ProviderError> {
        self.entries
            .get_or_try_init(|| async {
                let document = self.load_document().await?;
                let entries = parse_sec_document(&document, &self.default_exchange)?;
                info!("Loaded {} SEC ticker entries", entries.len());
                Ok::<_, ProviderError>(entries)
            })
            .await
    }
}

/// Orders entries by their numeric index so paging is stable across loads.
fn parse_sec_document(
    document: &[u8],
    default_exchange: &str,
) -> Result<Vec<RawInstrument>, ProviderError> {
    let parsed: HashMap<String, serde_json::Value> = serde_json::from_slice(document)
        .map_err(|e| ProviderError::Payload(format!("SEC ticker document: {}", e)))?;

    let mut indexed: Vec<(Option<u64>, String, SecTickerEntry)> = parsed
        .into_iter()
        .map(|(index, value)| {
            let entry = SecTickerEntry::from_value(&index, value);
            (index.parse::<u64>().ok(), index, entry)
        })
        .collect();

    // Numeric indexes first in numeric order, anything else after by text
    indexed.sort_by(|a, b| match (a.0, b.0) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.1.cmp(&b.1),
    });

    let non_numeric = indexed.iter().filter(|(n, _, _)| n.is_none()).count();
    if non_numeric > 0 {
        warn!("SEC document has {} non-numeric entry keys", non_numeric);
    }

    Ok(indexed
        .into_iter()
        .map(|(_, _, entry)| RawInstrument {
            symbol: entry.ticker,
            exchange: Some(default_exchange.to_string()),
            name: entry.title,
            asset_class: None,
            status: None,
        })
        .collect())
}

#[async_trait]
impl TraitInstrumentProvider for StructSecTickersProvider {
    fn name(&self) -> &str {
        "sec_tickers"
    }

    async fn fetch_page(
        &self,
        page_index: usize,
        page_size: usize,
    ) -> Result<InstrumentPage, ProviderError> {
        let entries = self.entries().await?;

        let start = page_index.saturating_mul(page_size).min(entries.len());
        let end = start.saturating_add(page_size).min(entries.len());

        debug!("Serving SEC entries {}..{} of {}", start, end, entries.len());

        Ok(InstrumentPage {
            entries: entries[start..end].to_vec(),
            has_more: end < entries.len(),
        })
    }
}
