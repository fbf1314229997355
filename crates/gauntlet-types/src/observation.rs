//! Observation payload delivered to the strategic policy each step.
//!
//! The observation is everything the policy knows about the run. The
//! encoding is structured; vectorizing it is left to the training side.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::Phase;
use crate::ids::MonId;
use crate::structs::{MonInstance, MoveEvent};

/// Complete per-step observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Current phase.
    pub phase: Phase,
    /// Identifier of the active gauntlet.
    pub gauntlet_id: String,
    /// Index of the next trainer to fight.
    pub trainer_idx: usize,
    /// Number of trainers in the gauntlet.
    pub gauntlet_len: usize,
    /// Every creature issued this run, alive or not, in id order.
    pub roster: Vec<MonSummary>,
    /// Summary of the next trainer's team. `None` once the gauntlet is cleared.
    pub next_trainer: Option<TrainerPreview>,
    /// The move event awaiting resolution, if any.
    pub pending_move: Option<MoveEvent>,
    /// Move events still queued, including the pending one.
    pub queued_moves: usize,
    /// The creature currently on offer, if in the encounter phase.
    pub pending_encounter: Option<EncounterPreview>,
    /// Unlock status of every route.
    pub routes: Vec<RouteStatus>,
    /// Free roster slots.
    pub capacity_remaining: u32,
    /// Items obtained so far, in order.
    pub bag: Vec<String>,
}

/// Per-creature roster summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonSummary {
    /// Creature id.
    pub id: MonId,
    /// Species name.
    pub species: String,
    /// Level.
    pub level: u32,
    /// Whether the creature can still be fielded.
    pub alive: bool,
    /// Whether the creature is in the party.
    pub in_party: bool,
    /// Current moves.
    pub moves: Vec<String>,
    /// Held item.
    pub item: Option<String>,
    /// Ability.
    pub ability: Option<String>,
}

impl From<&MonInstance> for MonSummary {
    fn from(mon: &MonInstance) -> Self {
        Self {
            id: mon.id,
            species: mon.species.clone(),
            level: mon.level,
            alive: mon.alive,
            in_party: mon.in_party,
            moves: mon.moves.clone(),
            item: mon.item.clone(),
            ability: mon.ability.clone(),
        }
    }
}

/// What the policy can see of the next trainer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainerPreview {
    /// Trainer name.
    pub name: String,
    /// `(species, level)` per team member, in lead order.
    pub team: Vec<(String, u32)>,
    /// Sum of the team's levels.
    pub total_level: u32,
    /// Strategic value of the items handed out on victory.
    pub reward_value: Decimal,
}

/// The creature on offer in the encounter phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterPreview {
    /// Route the draw came from.
    pub route: String,
    /// Species drawn.
    pub species: String,
    /// Level drawn.
    pub level: u32,
}

/// Unlock flags for one route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStatus {
    /// Route name.
    pub name: String,
    /// Whether the unlock predicate holds. Never reverts.
    pub unlocked: bool,
    /// Whether the unlocked draw is still waiting for a decision.
    pub pending: bool,
    /// Whether the single draw has been used (or lost).
    pub consumed: bool,
}
