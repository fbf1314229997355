//! Permadeath bookkeeping.
//!
//! A creature leaves the roster in one of two ways: it faints in battle
//! (a death, penalized by the reward model) or the player releases it to
//! make room for a capture (no penalty). Either way its `alive` flag goes
//! false and never comes back.

use gauntlet_types::MonId;

/// How a creature left the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Departure {
    /// Fainted in a trainer battle.
    Fainted,
    /// Released by the player.
    Released,
}

impl core::fmt::Display for Departure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Fainted => write!(f, "fainted"),
            Self::Released => write!(f, "released"),
        }
    }
}

/// A creature lost in battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Casualty {
    /// The creature that fainted.
    pub mon_id: MonId,
    /// Its 0-based slot in the submitted party, which indexes the risk vector.
    pub slot: usize,
    /// Species, for logging.
    pub species: String,
    /// Level at death.
    pub level: u32,
}

/// The result of applying one battle's survival mask.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SurvivalOutcome {
    /// Creatures that fainted, in slot order.
    pub casualties: Vec<Casualty>,
    /// Creatures that survived, in slot order. They stay in the party.
    pub survivors: Vec<MonId>,
}

impl SurvivalOutcome {
    /// Whether nobody fainted.
    pub fn is_flawless(&self) -> bool {
        self.casualties.is_empty()
    }

    /// Slots (0-based) that fainted.
    pub fn fainted_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.casualties.iter().map(|c| c.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flawless_when_no_casualties() {
        let outcome = SurvivalOutcome {
            casualties: Vec::new(),
            survivors: vec![MonId(1), MonId(2)],
        };
        assert!(outcome.is_flawless());
    }

    #[test]
    fn fainted_slots_follow_casualties() {
        let outcome = SurvivalOutcome {
            casualties: vec![
                Casualty {
                    mon_id: MonId(4),
                    slot: 1,
                    species: String::from("Geodude"),
                    level: 12,
                },
                Casualty {
                    mon_id: MonId(9),
                    slot: 3,
                    species: String::from("Zubat"),
                    level: 10,
                },
            ],
            survivors: vec![MonId(1), MonId(2)],
        };
        assert_eq!(outcome.fainted_slots().collect::<Vec<_>>(), vec![1, 3]);
        assert!(!outcome.is_flawless());
    }

    #[test]
    fn departure_display() {
        assert_eq!(Departure::Fainted.to_string(), "fainted");
        assert_eq!(Departure::Released.to_string(), "released");
    }
}
