use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Env {
    Local,
    Dev,
    Prod,
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Env::Local => write!(f, "local"),
            Env::Dev => write!(f, "dev"),
            Env::Prod => write!(f, "prod"),
        }
    }
}

impl FromStr for Env {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Env::Local),
            "dev" | "development" => Ok(Env::Dev),
            "prod" | "production" => Ok(Env::Prod),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

/// Values read from the process environment at start-up.
#[derive(Clone)]
pub struct AppEnv {
    pub env: Env,
    pub database_url: Option<String>,
    pub postgres_host: String,
    pub postgres_user: String,
    pub postgres_password: String,
    pub postgres_database: String,
    pub provider_endpoint: Option<String>,
    pub provider_api_key: Option<String>,
}

impl AppEnv {
    pub fn is_local(&self) -> bool {
        self.env == Env::Local
    }

    /// Connection string for the stocks database. A full `DATABASE_URL`
    /// wins over the individual `POSTGRES_*` parts.
    pub fn postgres_url(&self) -> String {
        match &self.database_url {
            Some(url) => url.clone(),
            None => format!(
                "postgres://{}:{}@{}/{}",
                self.postgres_user,
                self.postgres_password,
                self.postgres_host,
                self.postgres_database
            ),
        }
    }
}

// Credentials stay out of debug dumps of the settings.
impl fmt::Debug for AppEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppEnv")
            .field("env", &self.env)
            .field("database_url", &self.database_url.as_ref().map(|_| "***"))
            .field("postgres_host", &self.postgres_host)
            .field("postgres_user", &self.postgres_user)
            .field("postgres_password", &"***")
            .field("postgres_database", &self.postgres_database)
            .field("provider_endpoint", &self.provider_endpoint)
            .field("provider_api_key", &self.provider_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}
