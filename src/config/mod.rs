use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;

/// Configuration for the application
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Database connection URL, only needed by commands that persist
    pub database_url: Option<String>,
    /// Directory rendered invoices are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Upper bound for the connection pool
    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,
}

fn default_output_dir() -> String {
    "invoices".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Variables from a `.env` file are loaded first if the file exists.
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::from_env::<Config>().context("invalid environment configuration")?;

        Ok(config)
    }

    /// Get the database URL, failing when it was never configured
    pub fn database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set for commands that use the database")
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    Config::load()
}
