//! Gauntlet state machine, rewards, encounters, and episode orchestration
//! for the Nuzlocke gauntlet engine.
//!
//! This crate owns the episode lifecycle: sample a gauntlet, seed the
//! roster, and step through pre-battle, move selection, and encounter
//! phases until the run is cleared, wiped, or aborted. Combat itself is
//! delegated to a [`BattleSimulator`].
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `gauntlet-config.yaml` into
//!   strongly-typed structs.
//! - [`gauntlet`] -- Weighted gauntlet catalog, starter choice, and route
//!   unlock tracking.
//! - [`encounter`] -- Route encounter draws under the dupes clause.
//! - [`reward`] -- Reward weights, the risk-scaled death cost, and the
//!   per-episode reward ledger.
//! - [`simulator`] -- [`BattleSimulator`] trait, the heuristic backend, and
//!   the backend pool.
//! - [`machine`] -- [`GauntletStateMachine`].
//! - [`observation`] -- Observation assembly from machine state.
//! - [`policy`] -- [`StrategicPolicy`] trait and [`ScriptedPolicy`].
//! - [`runner`] -- Episode and batch runners.
//!
//! [`BattleSimulator`]: simulator::BattleSimulator
//! [`GauntletStateMachine`]: machine::GauntletStateMachine
//! [`StrategicPolicy`]: policy::StrategicPolicy
//! [`ScriptedPolicy`]: policy::ScriptedPolicy

pub mod config;
pub mod encounter;
pub mod gauntlet;
pub mod machine;
pub mod observation;
pub mod policy;
pub mod reward;
pub mod runner;
pub mod simulator;
