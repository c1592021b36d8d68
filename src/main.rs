mod cli;
mod db;
mod env_config;
mod logger;
mod services;

use clap::Parser;
use cli::{AddArgs, Cli, Commands, KeyArgs, SyncArgs};
use db::postgres::postgres_service::PostgresService;
use env_config::error::ConfigError;
use env_config::models::{app_config::AppConfig, app_env::AppEnv, app_setting::AppSettings};
use services::ticker_sync::{
    self, RunOptions,
    maintenance::{self, RetireResult},
};
use std::process::ExitCode;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Application setup
    let settings = match initialize_application(&cli.command) {
        Ok(settings) => settings,
        Err(err) => {
            // The logger may not be up yet
            eprintln!("Failed to initialize application: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let succeeded = match &cli.command {
        Commands::Sync(args) => run_sync(&settings, args).await,
        Commands::Add(args) => run_add(&settings, args).await,
        Commands::Retire(args) => run_retire(&settings, args).await,
    };

    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Loads environment and config, applies CLI overrides and starts logging
fn initialize_application(command: &Commands) -> Result<AppSettings, ConfigError> {
    let environment = AppEnv::new()?;
    let mut config = AppConfig::new(&environment.env)?;

    if let Commands::Sync(args) = command {
        args.apply_overrides(&mut config);
        config.validate()?;
    }

    let app_settings = AppSettings {
        app_config: config,
        app_env: environment,
    };

    logger::init_logger(
        &app_settings.app_config.log.level,
        &app_settings.app_config.log.format,
        app_settings.app_env.is_local(),
    )
    .map_err(|e| ConfigError::Invalid(format!("failed to initialize logger: {}", e)))?;

    info!("Starting tradelens-tickers...");
    info!("Current environment: {}", app_settings.app_env.env);

    if app_settings.app_env.is_local() {
        debug!("Configuration details: {:#?}", app_settings);
    }

    Ok(app_settings)
}

async fn run_sync(settings: &AppSettings, args: &SyncArgs) -> bool {
    let options = RunOptions {
        dry_run: args.dry_run,
    };

    match ticker_sync::run(settings, options).await {
        Ok(outcome) => {
            match serde_json::to_string(&outcome) {
                Ok(summary) => println!("{}", summary),
                Err(e) => error!("Failed to render sync summary: {}", e),
            }
            true
        }
        Err(err) => {
            error!("Ticker sync failed: {}", err);
            false
        }
    }
}

async fn open_store(settings: &AppSettings) -> Option<PostgresService> {
    match PostgresService::new(settings).await {
        Ok(service) => Some(service),
        Err(err) => {
            error!("Failed to connect to PostgreSQL: {}", err);
            None
        }
    }
}

async fn run_add(settings: &AppSettings, args: &AddArgs) -> bool {
    let Some(service) = open_store(settings).await else {
        return false;
    };

    let result = maintenance::add_instrument(service.repository_stock.as_ref(), args.record()).await;
    service.close().await;

    match result {
        Ok(_) => true,
        Err(err) => {
            error!("Failed to add {}: {}", args.key.key(), err);
            false
        }
    }
}

async fn run_retire(settings: &AppSettings, args: &KeyArgs) -> bool {
    let Some(service) = open_store(settings).await else {
        return false;
    };

    let key = args.key();
    let result = maintenance::retire_instrument(service.repository_stock.as_ref(), &key).await;
    service.close().await;

    match result {
        Ok(RetireResult::Retired(record)) => {
            info!("{} ({}) is now delisted", key, record.display_name);
            true
        }
        Ok(RetireResult::AlreadyDelisted) => true,
        Ok(RetireResult::NotFound) => {
            error!("No stock row for {}", key);
            false
        }
        Err(err) => {
            error!("Failed to retire {}: {}", key, err);
            false
        }
    }
}
