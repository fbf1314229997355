//! Capacity parameters for the roster.
//!
//! These values correspond to the `roster` section of
//! `gauntlet-config.yaml`. The party cap can be lowered for variant rule
//! sets but never raised above [`PARTY_CAP`].

use gauntlet_types::PARTY_CAP;
use serde::{Deserialize, Serialize};

/// Roster capacity configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Maximum creatures fielded per battle (default: 6).
    #[serde(default = "default_party_cap")]
    pub party_cap: usize,

    /// Maximum living creatures owned at once, party and box combined
    /// (default: 12).
    #[serde(default = "default_roster_cap")]
    pub roster_cap: u32,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            party_cap: default_party_cap(),
            roster_cap: default_roster_cap(),
        }
    }
}

impl RosterConfig {
    /// List every rule this configuration breaks. Empty means valid.
    pub fn violations(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.party_cap == 0 || self.party_cap > PARTY_CAP {
            problems.push(format!(
                "roster.party_cap must be within 1..={PARTY_CAP}, got {}",
                self.party_cap
            ));
        }
        let party_cap = u32::try_from(self.party_cap).unwrap_or(u32::MAX);
        if self.roster_cap < party_cap {
            problems.push(format!(
                "roster.roster_cap ({}) must be at least roster.party_cap ({})",
                self.roster_cap, self.party_cap
            ));
        }
        problems
    }
}

const fn default_party_cap() -> usize {
    PARTY_CAP
}

const fn default_roster_cap() -> u32 {
    12
}
