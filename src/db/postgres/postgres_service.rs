use crate::db::postgres::{
    connection::PostgresConnection,
    repository::stock_repository::{
        SharedStockRepository, StructStockRepository, TraitStockRepository,
    },
};
use crate::env_config::models::app_setting::AppSettings;
use std::sync::Arc;
use tracing::{error, info};

pub struct PostgresService {
    // Connection
    pub connection: Arc<PostgresConnection>,

    // Reference data repositories (PostgreSQL)
    pub repository_stock: SharedStockRepository,
}

impl PostgresService {
    pub async fn new(settings: &AppSettings) -> Result<Self, sqlx::Error> {
        info!("Initializing PostgreSQL service components");

        let postgres_connection = match PostgresConnection::new(settings).await {
            Ok(conn) => {
                info!("PostgreSQL connection established successfully");
                Arc::new(conn)
            }
            Err(e) => {
                error!("Failed to establish PostgreSQL connection: {}", e);
                return Err(e);
            }
        };

        info!("Initializing repositories");

        let stock_repository = Arc::new(StructStockRepository::new(postgres_connection.clone()))
            as Arc<dyn TraitStockRepository + Send + Sync>;

        info!("PostgreSQL service initialized successfully");
        Ok(Self {
            connection: postgres_connection,
            repository_stock: stock_repository,
        })
    }

    /// Releases every pooled connection. Callers run this on all exit paths.
    pub async fn close(&self) {
        self.connection.close().await;
    }
}
