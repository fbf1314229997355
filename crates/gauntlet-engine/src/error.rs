//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup and the batch run so
//! `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: gauntlet_core::config::ConfigError,
    },

    /// The batch runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: gauntlet_core::runner::RunnerError,
    },

    /// The hall-of-fame store failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: gauntlet_store::StoreError,
    },
}
