//! Shared type definitions for the Nuzlocke gauntlet engine.
//!
//! This crate is the single source of truth for the data model exchanged
//! between the roster manager, the gauntlet state machine, the battle
//! simulator, the hall-of-fame store, and the policies driving a run.
//!
//! # Modules
//!
//! - [`ids`] -- Episode/run UUID wrappers and the per-episode [`MonId`]
//! - [`enums`] -- Phases, move sources, outcomes, rejections
//! - [`structs`] -- Blueprints, gauntlet specs, creature instances, battle hand-off
//! - [`actions`] -- Per-phase action variants
//! - [`observation`] -- Observation payload delivered each step

pub mod actions;
pub mod enums;
pub mod ids;
pub mod observation;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use actions::{EncounterAction, GauntletAction, MoveSelectionAction, PreBattleAction};
pub use enums::{EpisodeOutcome, InvalidActionReason, MoveSource, Phase, Rejection};
pub use ids::{EpisodeId, MonId, RunId};
pub use observation::{EncounterPreview, MonSummary, Observation, RouteStatus, TrainerPreview};
pub use structs::{
    BattleReport, BattleRequest, CreatureBlueprint, EncounterSlot, GauntletSpec,
    HallOfFameMember, ItemReward, LearnsetEntry, LevelRange, MAX_MOVES, MonInstance, MoveEvent,
    PARTY_CAP, RiskVector, RouteSpec, TrainerSpec,
};
