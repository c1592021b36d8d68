use super::error::ConfigError;
use super::models::app_env::{AppEnv, Env};
use std::env;
use std::str::FromStr;

impl AppEnv {
    pub fn new() -> Result<AppEnv, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the environment from an arbitrary variable lookup so tests do
    /// not have to touch the real process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<AppEnv, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_name = required(&lookup, "ENV")?;
        let env = Env::from_str(&env_name).map_err(|_| ConfigError::InvalidVar {
            name: "ENV".to_string(),
            value: env_name.clone(),
        })?;

        let database_url = optional(&lookup, "DATABASE_URL");

        // The individual parts are only mandatory without a full URL.
        let part = |name: &str| -> Result<String, ConfigError> {
            match database_url {
                Some(_) => Ok(optional(&lookup, name).unwrap_or_default()),
                None => required(&lookup, name),
            }
        };

        Ok(AppEnv {
            env,
            postgres_host: part("POSTGRES_HOST")?,
            postgres_user: part("POSTGRES_USER")?,
            postgres_password: part("POSTGRES_PASSWORD")?,
            postgres_database: part("POSTGRES_DATABASE")?,
            database_url,
            provider_endpoint: optional(&lookup, "PROVIDER_ENDPOINT"),
            provider_api_key: optional(&lookup, "PROVIDER_API_KEY"),
        })
    }
}

fn required<F>(lookup: &F, name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, name).ok_or_else(|| ConfigError::MissingVar(name.to_string()))
}

fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|value| !value.trim().is_empty())
}
