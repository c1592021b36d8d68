use crate::env_config::models::app_setting::AppSettings;
use sqlx::{Pool, Postgres, postgres::PgPoolOptions};
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct PostgresConnection {
    pool: Pool<Postgres>,
}

impl PostgresConnection {
    pub async fn new(settings: &AppSettings) -> Result<Self, sqlx::Error> {
        info!("Initializing PostgreSQL connection...");

        let postgres = &settings.app_config.postgres;
        let pool = PgPoolOptions::new()
            .max_connections(postgres.max_connections)
            .min_connections(postgres.min_connections)
            .max_lifetime(Duration::from_secs(postgres.max_lifetime))
            .idle_timeout(Duration::from_secs(postgres.idle_timeout))
            .acquire_timeout(Duration::from_secs(postgres.timeout))
            .connect(&settings.app_env.postgres_url())
            .await?;

        // Test connection
        debug!("Executing test query on PostgreSQL");
        match sqlx::query("SELECT 1").execute(&pool).await {
            Ok(_) => info!("PostgreSQL connection successful"),
            Err(e) => {
                error!("Failed to connect to PostgreSQL: {}", e);
                pool.close().await;
                return Err(e);
            }
        }

        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    pub async fn close(&self) {
        debug!("Closing PostgreSQL pool");
        self.pool.close().await;
        info!("PostgreSQL connection closed");
    }
}
