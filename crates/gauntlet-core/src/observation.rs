//! Observation assembly.
//!
//! The observation is rebuilt from machine state after every step; nothing
//! in it is cached.

use gauntlet_types::{MonSummary, Observation, TrainerPreview, TrainerSpec};
use rust_decimal::Decimal;

use crate::machine::GauntletStateMachine;

/// Summarize a trainer for the policy.
pub fn trainer_preview(trainer: &TrainerSpec) -> TrainerPreview {
    let team: Vec<(String, u32)> = trainer
        .team
        .iter()
        .map(|b| (b.species.clone(), b.level))
        .collect();
    let total_level = team
        .iter()
        .fold(0_u32, |acc, (_, level)| acc.saturating_add(*level));
    let reward_value = trainer
        .rewards
        .iter()
        .fold(Decimal::ZERO, |acc, item| acc.saturating_add(item.value));
    TrainerPreview {
        name: trainer.name.clone(),
        team,
        total_level,
        reward_value,
    }
}

/// Build the observation for the machine's current state.
pub fn observe(machine: &GauntletStateMachine) -> Observation {
    let spec = machine.spec();
    let roster = machine.roster();
    let next_trainer = if machine.is_done() {
        None
    } else {
        spec.trainer(machine.trainer_idx()).map(trainer_preview)
    };

    Observation {
        phase: machine.phase(),
        gauntlet_id: spec.id.clone(),
        trainer_idx: machine.trainer_idx(),
        gauntlet_len: spec.len(),
        roster: roster.all().map(MonSummary::from).collect(),
        next_trainer,
        pending_move: machine.move_queue().front().cloned(),
        queued_moves: machine.move_queue().len(),
        pending_encounter: machine.pending_encounter().map(|d| d.preview()),
        routes: machine.routes().statuses(),
        capacity_remaining: roster.capacity_remaining(),
        bag: machine.bag().to_vec(),
    }
}
