//! Roster management for the Nuzlocke gauntlet engine.
//!
//! This crate owns every creature of a run. The state machine asks it to
//! instantiate, field, kill, teach, and release creatures; nothing else
//! mutates a [`MonInstance`](gauntlet_types::MonInstance).
//!
//! # Modules
//!
//! - [`config`] -- Party and roster caps ([`RosterConfig`])
//! - [`death`] -- Casualties and departures ([`SurvivalOutcome`])
//! - [`error`] -- Error types for roster operations ([`RosterError`])
//! - [`moves`] -- Moveset validation and slot writes
//! - [`roster`] -- The [`RosterManager`]

pub mod config;
pub mod death;
pub mod error;
pub mod moves;
pub mod roster;

pub use config::RosterConfig;
pub use death::{Casualty, Departure, SurvivalOutcome};
pub use error::RosterError;
pub use roster::RosterManager;
