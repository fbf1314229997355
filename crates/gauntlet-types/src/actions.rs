//! Action types submitted by the strategic policy, one per step.
//!
//! The accepted variant depends on the current [`Phase`]. Submitting a
//! variant for another phase is an invalid action, not an error.
//!
//! [`Phase`]: crate::enums::Phase

use serde::{Deserialize, Serialize};

use crate::enums::Phase;
use crate::ids::MonId;
use crate::structs::RiskVector;

/// Party selection for the next trainer battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreBattleAction {
    /// Party members in lead order (1 to 6 alive creatures).
    pub party: Vec<MonId>,
    /// Risk per party slot, aligned to `party`.
    pub risk: RiskVector,
}

/// Resolution of the head move event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveSelectionAction {
    /// Decline the move.
    Skip,
    /// Learn the move into slot `1..=4`.
    Replace {
        /// 1-based move slot.
        slot: u8,
    },
}

/// Resolution of the pending route encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncounterAction {
    /// Let the creature go. The draw is lost.
    Skip,
    /// Catch the creature into the box. Needs free roster capacity.
    Catch,
    /// Release `release` first, then catch.
    CatchAndReplace {
        /// The creature to release.
        release: MonId,
    },
}

/// One decision, tagged by the phase it is meant for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GauntletAction {
    /// Decision for [`Phase::PreBattle`].
    PreBattle(PreBattleAction),
    /// Decision for [`Phase::MoveSelection`].
    MoveSelection(MoveSelectionAction),
    /// Decision for [`Phase::Encounter`].
    Encounter(EncounterAction),
}

impl GauntletAction {
    /// The phase this action is meant for.
    pub const fn phase(&self) -> Phase {
        match self {
            Self::PreBattle(_) => Phase::PreBattle,
            Self::MoveSelection(_) => Phase::MoveSelection,
            Self::Encounter(_) => Phase::Encounter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_reports_its_phase() {
        let fight = GauntletAction::PreBattle(PreBattleAction {
            party: vec![MonId(1)],
            risk: RiskVector::default(),
        });
        assert_eq!(fight.phase(), Phase::PreBattle);
        assert_eq!(
            GauntletAction::MoveSelection(MoveSelectionAction::Skip).phase(),
            Phase::MoveSelection
        );
        assert_eq!(
            GauntletAction::Encounter(EncounterAction::Catch).phase(),
            Phase::Encounter
        );
    }
}
