// File: src/services/providers/catalog_api.rs
use super::TraitInstrumentProvider;
use crate::services::ticker_sync::error::ProviderError;
use crate::services::ticker_sync::models::{InstrumentPage, RawInstrument};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

/// Body of one catalog page:
/// `{"instruments": [{"symbol", "exchange", "name", "asset_class", "status"}], "has_more": bool}`
#[derive(Debug, Deserialize)]
struct CatalogResponse {
    /// Read entry by entry so one malformed row cannot fail the page
    instruments: Vec<serde_json::Value>,
    #[serde(default)]
    has_more: bool,
}

/// Paged JSON instrument catalog behind an API key.
pub struct StructCatalogApiProvider {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl StructCatalogApiProvider {
    pub fn new(client: Client, endpoint: String, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl TraitInstrumentProvider for StructCatalogApiProvider {
    fn name(&self) -> &str {
        "catalog_api"
    }

    async fn fetch_page(
        &self,
        page_index: usize,
        page_size: usize,
    ) -> Result<InstrumentPage, ProviderError> {
        debug!("Requesting catalog page {} (size {})", page_index, page_size);

        let mut request = self
            .client
            .get(&self.endpoint)
            .query(&[("page", page_index), ("page_size", page_size)]);

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Catalog page {} returned HTTP {}", page_index, status);
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let parsed: CatalogResponse = serde_json::from_slice(&bytes)
            .map_err(|e| ProviderError::Payload(format!("page {}: {}", page_index, e)))?;

        debug!(
            "Catalog page {} returned {} entries, has_more={}",
            page_index,
            parsed.instruments.len(),
            parsed.has_more
        );

        Ok(InstrumentPage {
            entries: parsed
                .instruments
                .into_iter()
                .map(RawInstrument::from_value)
                .collect(),
            has_more: parsed.has_more,
        })
    }
}
