use super::error::ConfigError;
use super::models::app_config::AppConfig;
use super::models::app_env::Env;
use std::fs;
use std::path::Path;

const CONFIG_DIR: &str = "config";

// Five bind parameters per upserted row; Postgres caps a statement at 65535.
const MAX_BATCH_SIZE: usize = 10_000;

impl AppConfig {
    /// Loads `config/{env}.toml` relative to the working directory.
    pub fn new(env: &Env) -> Result<AppConfig, ConfigError> {
        let path = Path::new(CONFIG_DIR).join(format!("{}.toml", env));
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<AppConfig, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config: AppConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.page_size == 0 {
            return Err(ConfigError::Invalid("provider.page_size must be > 0".into()));
        }
        if self.provider.max_attempts == 0 {
            return Err(ConfigError::Invalid("provider.max_attempts must be >= 1".into()));
        }
        if self.provider.max_pages == 0 {
            return Err(ConfigError::Invalid("provider.max_pages must be > 0".into()));
        }
        if self.writer.batch_size == 0 || self.writer.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::Invalid(format!(
                "writer.batch_size must be between 1 and {}",
                MAX_BATCH_SIZE
            )));
        }
        if self.postgres.min_connections > self.postgres.max_connections {
            return Err(ConfigError::Invalid(
                "postgres.min_connections exceeds postgres.max_connections".into(),
            ));
        }
        Ok(())
    }
}
