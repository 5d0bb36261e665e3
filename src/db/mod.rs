pub mod backend;
pub mod schema;
pub mod store;

mod postgres;

#[cfg(test)]
pub(crate) mod memory;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Config;

pub use store::InvoiceStore;

/// Database connection pool
///
/// Owned by the process entry point and handed to the store explicitly.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new Database instance with a connection pool
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(config.database_url()?)
            .await
            .context("failed to connect to the database")?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Initialize the database connection pool
pub async fn init(config: &Config) -> Result<Database> {
    Database::new(config).await
}
