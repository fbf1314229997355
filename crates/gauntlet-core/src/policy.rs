//! Strategic policy trait and a scripted baseline.
//!
//! The state machine does not care where decisions come from: a learned
//! agent, a scripted bot, or a test stub. [`StrategicPolicy`] is the seam;
//! [`ScriptedPolicy`] is a deterministic baseline that lets the engine run
//! end to end without a trained agent.

use gauntlet_types::{
    EncounterAction, GauntletAction, MAX_MOVES, MonId, MonSummary, MoveSelectionAction, Observation,
    PARTY_CAP, Phase, PreBattleAction, RiskVector,
};
use rust_decimal::Decimal;

/// A source of strategic decisions.
pub trait StrategicPolicy: Send {
    /// Choose the action for the current phase.
    ///
    /// Returns `None` when there is nothing to decide (the episode is over).
    fn decide(&mut self, observation: &Observation) -> Option<GauntletAction>;
}

/// Deterministic baseline policy.
///
/// - Pre-battle: fields the highest-level living creatures, up to the party
///   cap, all at the same risk.
/// - Move selection: learns into a free slot, declines when full.
/// - Encounter: catches while there is room; when full, swaps out the
///   weakest boxed creature if the newcomer outlevels it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedPolicy {
    risk: Decimal,
    party_cap: usize,
}

impl ScriptedPolicy {
    /// A policy fielding up to `party_cap` creatures at `risk`.
    pub fn new(risk: Decimal, party_cap: usize) -> Self {
        Self {
            risk: risk.clamp(Decimal::ZERO, Decimal::ONE),
            party_cap: party_cap.clamp(1, PARTY_CAP),
        }
    }

    fn pre_battle(&self, observation: &Observation) -> GauntletAction {
        let mut alive: Vec<&MonSummary> = observation.roster.iter().filter(|m| m.alive).collect();
        alive.sort_by(|a, b| b.level.cmp(&a.level).then(a.id.cmp(&b.id)));
        let party: Vec<MonId> = alive.iter().take(self.party_cap).map(|m| m.id).collect();
        let risk = RiskVector::uniform(party.len(), self.risk);
        GauntletAction::PreBattle(PreBattleAction { party, risk })
    }

    fn move_selection(observation: &Observation) -> GauntletAction {
        let free_slot = observation.pending_move.as_ref().and_then(|event| {
            observation
                .roster
                .iter()
                .find(|m| m.id == event.target)
                .filter(|m| m.moves.len() < MAX_MOVES)
                .and_then(|m| u8::try_from(m.moves.len().saturating_add(1)).ok())
        });
        let action = free_slot.map_or(MoveSelectionAction::Skip, |slot| {
            MoveSelectionAction::Replace { slot }
        });
        GauntletAction::MoveSelection(action)
    }

    fn encounter(observation: &Observation) -> GauntletAction {
        if observation.capacity_remaining > 0 {
            return GauntletAction::Encounter(EncounterAction::Catch);
        }
        let Some(offer) = observation.pending_encounter.as_ref() else {
            return GauntletAction::Encounter(EncounterAction::Skip);
        };
        let weakest = observation
            .roster
            .iter()
            .filter(|m| m.alive && !m.in_party)
            .min_by(|a, b| a.level.cmp(&b.level).then(a.id.cmp(&b.id)));
        let action = match weakest {
            Some(mon) if mon.level < offer.level => EncounterAction::CatchAndReplace { release: mon.id },
            _ => EncounterAction::Skip,
        };
        GauntletAction::Encounter(action)
    }
}

impl Default for ScriptedPolicy {
    fn default() -> Self {
        Self::new(Decimal::new(3, 1), PARTY_CAP)
    }
}

impl StrategicPolicy for ScriptedPolicy {
    fn decide(&mut self, observation: &Observation) -> Option<GauntletAction> {
        match observation.phase {
            Phase::PreBattle => Some(self.pre_battle(observation)),
            Phase::MoveSelection => Some(Self::move_selection(observation)),
            Phase::Encounter => Some(Self::encounter(observation)),
            Phase::BoxManagement | Phase::Done => None,
        }
    }
}
