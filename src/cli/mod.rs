//! Command-line interface

use crate::env_config::models::app_config::AppConfig;
use crate::services::ticker_sync::models::{
    AssetClass, InstrumentRecord, InstrumentStatus, NaturalKey, normalize_code,
};
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Reference-data loader for the tradelens stocks table
#[derive(Parser, Debug)]
#[command(name = "tradelens-tickers")]
#[command(about = "Synchronizes the stocks reference table with an instrument catalog")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the catalog and reconcile the stocks table against it
    Sync(SyncArgs),
    /// Insert or update a single instrument
    Add(AddArgs),
    /// Mark a single instrument delisted
    Retire(KeyArgs),
}

#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Report what would change without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Override provider.page_size
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Override provider.max_attempts
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Override provider.timeout (seconds)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Override writer.batch_size
    #[arg(long)]
    pub batch_size: Option<usize>,
}

impl SyncArgs {
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(page_size) = self.page_size {
            config.provider.page_size = page_size;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.provider.max_attempts = max_attempts;
        }
        if let Some(timeout) = self.timeout {
            config.provider.timeout = timeout;
        }
        if let Some(batch_size) = self.batch_size {
            config.writer.batch_size = batch_size;
        }
    }
}

#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Ticker symbol, e.g. AAPL
    #[arg(long)]
    pub symbol: String,

    /// Exchange code, e.g. NASDAQ
    #[arg(long)]
    pub exchange: String,
}

impl KeyArgs {
    pub fn key(&self) -> NaturalKey {
        NaturalKey::new(&self.symbol, &self.exchange)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum AssetClassArg {
    Equity,
    Etf,
    Other,
}

impl From<AssetClassArg> for AssetClass {
    fn from(arg: AssetClassArg) -> Self {
        match arg {
            AssetClassArg::Equity => AssetClass::Equity,
            AssetClassArg::Etf => AssetClass::Etf,
            AssetClassArg::Other => AssetClass::Other,
        }
    }
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    /// Company or fund name
    #[arg(long)]
    pub name: String,

    #[arg(long, value_enum, default_value = "equity")]
    pub asset_class: AssetClassArg,
}

impl AddArgs {
    pub fn record(&self) -> InstrumentRecord {
        InstrumentRecord {
            symbol: normalize_code(&self.key.symbol),
            exchange: normalize_code(&self.key.exchange),
            display_name: self.name.trim().to_string(),
            asset_class: self.asset_class.into(),
            status: InstrumentStatus::Active,
        }
    }
}
