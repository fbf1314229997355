//! Enumeration types for the gauntlet engine.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// The phase the gauntlet state machine is in.
///
/// Exactly one decision is taken per step, and the phase determines which
/// action variant is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Choose a party and a risk vector for the next trainer battle.
    PreBattle,
    /// Resolve the head of the move-learn queue.
    MoveSelection,
    /// Decide what to do with the creature drawn from an unlocked route.
    Encounter,
    /// Checkpoint-style roster reshaping. Reserved; never entered.
    BoxManagement,
    /// Terminal. No further actions are accepted.
    Done,
}

impl Phase {
    /// Whether this phase is terminal.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::PreBattle => write!(f, "pre_battle"),
            Self::MoveSelection => write!(f, "move_selection"),
            Self::Encounter => write!(f, "encounter"),
            Self::BoxManagement => write!(f, "box_management"),
            Self::Done => write!(f, "done"),
        }
    }
}

// ---------------------------------------------------------------------------
// Move events
// ---------------------------------------------------------------------------

/// Where a move-learn opportunity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveSource {
    /// A move from the creature's learnset, unlocked by run progress.
    LevelUp,
    /// A move taught by an item obtained during the run (TM or tutor).
    ExternalItem,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// How a finished episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EpisodeOutcome {
    /// Every trainer in the gauntlet was defeated.
    Cleared,
    /// Every creature in the roster fainted.
    Wipe,
    /// The battle simulator failed or timed out; the run is void.
    Aborted,
}

impl core::fmt::Display for EpisodeOutcome {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Cleared => write!(f, "cleared"),
            Self::Wipe => write!(f, "wipe"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

/// Why an action violated its phase's structural contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InvalidActionReason {
    /// The action variant does not belong to the current phase.
    WrongPhase,
    /// The proposed party was empty.
    EmptyParty,
    /// The proposed party exceeded the party cap.
    PartyTooLarge,
    /// The proposed party listed the same creature twice.
    DuplicateMember,
    /// A referenced creature has fainted or was released.
    MonNotAlive,
    /// A referenced creature id was never issued in this episode.
    UnknownMon,
    /// The risk vector length differs from the party size.
    RiskLengthMismatch,
    /// A risk entry lies outside `[0, 1]`.
    RiskOutOfRange,
    /// A move slot outside `1..=4` was named.
    SlotOutOfRange,
    /// The candidate move is already known by the target.
    DuplicateMove,
}

impl core::fmt::Display for InvalidActionReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::WrongPhase => write!(f, "wrong_phase"),
            Self::EmptyParty => write!(f, "empty_party"),
            Self::PartyTooLarge => write!(f, "party_too_large"),
            Self::DuplicateMember => write!(f, "duplicate_member"),
            Self::MonNotAlive => write!(f, "mon_not_alive"),
            Self::UnknownMon => write!(f, "unknown_mon"),
            Self::RiskLengthMismatch => write!(f, "risk_length_mismatch"),
            Self::RiskOutOfRange => write!(f, "risk_out_of_range"),
            Self::SlotOutOfRange => write!(f, "slot_out_of_range"),
            Self::DuplicateMove => write!(f, "duplicate_move"),
        }
    }
}

/// A recoverable refusal of an action. Carried in the step outcome, never
/// raised as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rejection {
    /// The action broke its phase contract. State is unchanged and the same
    /// phase asks again.
    InvalidAction(InvalidActionReason),
    /// A catch was requested with a full roster and no replacement target.
    /// Treated as a skip.
    CapacityExceeded,
}
