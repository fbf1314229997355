//! `SQLite` connection pool for the hall of fame.
//!
//! Queries are built at runtime rather than checked at compile time, so no
//! database is needed to build the crate.

use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::StoreError;

/// Default maximum number of connections in the pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// Default connection timeout in seconds.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Configuration for the `SQLite` connection pool.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database URL, e.g. `sqlite://gauntlet-hall-of-fame.db?mode=rwc`.
    pub url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Connection timeout.
    pub connect_timeout: Duration,
}

impl StoreConfig {
    /// Create a new configuration from a database URL.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Set the maximum number of connections.
    #[must_use]
    pub const fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Connection pool handle to the hall-of-fame database.
#[derive(Debug, Clone)]
pub struct StorePool {
    pool: SqlitePool,
}

impl StorePool {
    /// Connect using the provided configuration, creating the database
    /// file if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL cannot be parsed and
    /// [`StoreError::Sqlite`] if the connection fails.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let options: SqliteConnectOptions = config
            .url
            .parse()
            .map_err(|e: sqlx::Error| StoreError::Config(format!("invalid database URL: {e}")))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect_with(options.create_if_missing(true))
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            "connected to hall-of-fame database"
        );

        Ok(Self { pool })
    }

    /// Connect using a URL with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the connection fails.
    pub async fn connect_url(url: &str) -> Result<Self, StoreError> {
        Self::connect(&StoreConfig::new(url)).await
    }

    /// Run all pending migrations from the `migrations/` directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Migration`] if any migration fails.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("hall-of-fame migrations completed");
        Ok(())
    }

    /// Return a reference to the underlying [`SqlitePool`].
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all connections gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("hall-of-fame pool closed");
    }
}
