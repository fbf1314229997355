//! Error types for the gauntlet-roster crate.
//!
//! Every roster operation validates its inputs at the boundary and returns
//! a typed error instead of clamping. Nothing is mutated when an error is
//! returned.

use gauntlet_types::{InvalidActionReason, MonId};

/// Errors that can occur during roster operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    /// A party must contain at least one creature.
    #[error("party is empty")]
    EmptyParty,

    /// The party exceeded the configured cap.
    #[error("party of {size} exceeds the cap of {cap}")]
    PartyTooLarge {
        /// Number of creatures submitted.
        size: usize,
        /// Configured party cap.
        cap: usize,
    },

    /// The same creature was listed twice in one party.
    #[error("{0} appears more than once in the party")]
    DuplicateMember(MonId),

    /// The id was never issued by this roster.
    #[error("{0} is not part of this roster")]
    UnknownMon(MonId),

    /// The creature has fainted or was released.
    #[error("{0} is no longer alive")]
    MonNotAlive(MonId),

    /// The roster is full.
    #[error("roster capacity of {cap} reached")]
    CapacityExceeded {
        /// Configured roster cap.
        cap: u32,
    },

    /// Move slots are numbered 1 to 4.
    #[error("move slot {slot} is outside 1..=4")]
    SlotOutOfRange {
        /// The slot requested.
        slot: u8,
    },

    /// Learning the move would leave two copies in one moveset.
    #[error("{mon} already knows {move_name}")]
    DuplicateMove {
        /// The target creature.
        mon: MonId,
        /// The move offered.
        move_name: String,
    },

    /// A blueprint's default moveset broke the 1..=4 distinct-moves rule.
    #[error("invalid moveset for {species}: {reason}")]
    InvalidMoveset {
        /// Species of the offending blueprint.
        species: String,
        /// What was wrong with the moveset.
        reason: String,
    },

    /// The survival mask does not line up with the party that was submitted.
    ///
    /// This is a defect in the caller or the simulator, not a runtime
    /// condition. Nothing is applied.
    #[error(
        "survival mask misaligned: submitted {submitted:?}, battle reported {reported:?} with {mask_len} slots"
    )]
    OrderingMismatch {
        /// Party order recorded when the party was set.
        submitted: Vec<MonId>,
        /// Party order passed alongside the mask.
        reported: Vec<MonId>,
        /// Length of the survival mask.
        mask_len: usize,
    },

    /// The creature id counter overflowed.
    #[error("arithmetic overflow: {context}")]
    ArithmeticOverflow {
        /// Description of what was being computed.
        context: String,
    },
}

impl RosterError {
    /// Map a policy-caused error to the matching invalid-action reason.
    ///
    /// Returns `None` for errors that are not the policy's fault
    /// (misaligned survival masks, bad blueprints, overflow, capacity).
    pub const fn invalid_action_reason(&self) -> Option<InvalidActionReason> {
        match self {
            Self::EmptyParty => Some(InvalidActionReason::EmptyParty),
            Self::PartyTooLarge { .. } => Some(InvalidActionReason::PartyTooLarge),
            Self::DuplicateMember(_) => Some(InvalidActionReason::DuplicateMember),
            Self::UnknownMon(_) => Some(InvalidActionReason::UnknownMon),
            Self::MonNotAlive(_) => Some(InvalidActionReason::MonNotAlive),
            Self::SlotOutOfRange { .. } => Some(InvalidActionReason::SlotOutOfRange),
            Self::DuplicateMove { .. } => Some(InvalidActionReason::DuplicateMove),
            Self::CapacityExceeded { .. }
            | Self::InvalidMoveset { .. }
            | Self::OrderingMismatch { .. }
            | Self::ArithmeticOverflow { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_errors_map_to_invalid_actions() {
        assert_eq!(
            RosterError::MonNotAlive(MonId(3)).invalid_action_reason(),
            Some(InvalidActionReason::MonNotAlive)
        );
        assert_eq!(
            RosterError::SlotOutOfRange { slot: 5 }.invalid_action_reason(),
            Some(InvalidActionReason::SlotOutOfRange)
        );
    }

    #[test]
    fn defects_do_not_map_to_invalid_actions() {
        let err = RosterError::OrderingMismatch {
            submitted: vec![MonId(1)],
            reported: vec![MonId(2)],
            mask_len: 1,
        };
        assert_eq!(err.invalid_action_reason(), None);
        assert_eq!(
            RosterError::CapacityExceeded { cap: 6 }.invalid_action_reason(),
            None
        );
    }
}
