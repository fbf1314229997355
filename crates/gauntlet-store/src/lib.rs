//! Hall-of-fame persistence for the Nuzlocke gauntlet engine.
//!
//! Cleared runs are written to `SQLite` through [`sqlx`]. The store is the
//! only component that outlives an episode.
//!
//! # Modules
//!
//! - [`error`] -- [`StoreError`] wrapping the underlying `sqlx` errors.
//! - [`sqlite`] -- [`StorePool`] connection handling and migrations.
//! - [`hall_of_fame`] -- [`HallOfFameStore`] record and query operations.

pub mod error;
pub mod hall_of_fame;
pub mod sqlite;

pub use error::StoreError;
pub use hall_of_fame::{HallOfFameEntry, HallOfFameRow, HallOfFameStore, NewHallOfFameEntry};
pub use sqlite::{StoreConfig, StorePool};
