pub mod catalog_api;
pub mod sec_tickers;

use crate::env_config::error::ConfigError;
use crate::env_config::models::app_config::ProviderKind;
use crate::env_config::models::app_setting::AppSettings;
use crate::services::ticker_sync::error::ProviderError;
use crate::services::ticker_sync::models::InstrumentPage;
use async_trait::async_trait;
use catalog_api::StructCatalogApiProvider;
use sec_tickers::{SecSource, StructSecTickersProvider};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const DEFAULT_USER_AGENT: &str = concat!("tradelens-tickers/", env!("CARGO_PKG_VERSION"));

/// External catalog of tradable instruments, read one page at a time.
///
/// Page 0 always restarts the sequence from the beginning; a provider keeps
/// no cursor between calls.
#[async_trait]
pub trait TraitInstrumentProvider {
    fn name(&self) -> &str;

    async fn fetch_page(
        &self,
        page_index: usize,
        page_size: usize,
    ) -> Result<InstrumentPage, ProviderError>;
}

pub type SharedProvider = Arc<dyn TraitInstrumentProvider + Send + Sync>;

/// Builds the provider selected by `[provider].kind`.
pub fn build_provider(settings: &AppSettings) -> Result<SharedProvider, ConfigError> {
    let provider_config = &settings.app_config.provider;

    let provider: SharedProvider = match provider_config.kind {
        ProviderKind::CatalogApi => {
            let endpoint = settings.app_env.provider_endpoint.clone().ok_or_else(|| {
                ConfigError::MissingVar("PROVIDER_ENDPOINT".to_string())
            })?;
            let client = build_http_client(provider_config.timeout, None)?;
            Arc::new(StructCatalogApiProvider::new(
                client,
                endpoint,
                settings.app_env.provider_api_key.clone(),
            ))
        }
        ProviderKind::SecFile => {
            let path = provider_config.sec_file_path.clone().ok_or_else(|| {
                ConfigError::Invalid("provider.sec_file_path is required for sec_file".into())
            })?;
            Arc::new(StructSecTickersProvider::new(
                SecSource::File(PathBuf::from(path)),
                provider_config.default_exchange.clone(),
            ))
        }
        ProviderKind::SecHttp => {
            let url = provider_config
                .sec_url
                .clone()
                .or_else(|| settings.app_env.provider_endpoint.clone())
                .ok_or_else(|| {
                    ConfigError::Invalid("provider.sec_url is required for sec_http".into())
                })?;
            let client =
                build_http_client(provider_config.timeout, provider_config.user_agent.as_deref())?;
            Arc::new(StructSecTickersProvider::new(
                SecSource::Http { client, url },
                provider_config.default_exchange.clone(),
            ))
        }
    };

    info!("Using instrument provider: {}", provider.name());
    Ok(provider)
}

fn build_http_client(
    timeout_seconds: u64,
    user_agent: Option<&str>,
) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
        .build()
        .map_err(|e| ConfigError::Invalid(format!("failed to build http client: {}", e)))
}
