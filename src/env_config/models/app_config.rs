use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub log: LogConfig,
    pub postgres: PostgresConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub writer: WriterSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    pub timeout: u64,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: u64,
    pub idle_timeout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Paged JSON catalog API at `PROVIDER_ENDPOINT`
    CatalogApi,
    /// SEC company_tickers.json on local disk
    SecFile,
    /// SEC company_tickers.json downloaded over HTTP
    SecHttp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Exchange assigned to SEC entries, which carry none
    #[serde(default = "default_exchange")]
    pub default_exchange: String,
    #[serde(default)]
    pub sec_file_path: Option<String>,
    #[serde(default)]
    pub sec_url: Option<String>,
    /// SEC rejects requests without a contact User-Agent
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WriterSettings {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

fn default_page_size() -> usize {
    500
}

fn default_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    8_000
}

fn default_max_pages() -> usize {
    10_000
}

fn default_exchange() -> String {
    "US".to_string()
}

fn default_batch_size() -> usize {
    500
}
