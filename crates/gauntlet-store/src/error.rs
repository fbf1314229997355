//! Error types for the hall-of-fame store.

/// Errors that can occur in the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A `SQLite` operation failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    /// A migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A party could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored reward is not a decimal.
    #[error("corrupt reward value {value:?}: {source}")]
    CorruptReward {
        /// The stored text.
        value: String,
        /// The parse failure.
        source: rust_decimal::Error,
    },

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
