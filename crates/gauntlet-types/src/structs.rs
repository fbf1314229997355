//! Core entity structs: static gauntlet definitions, run-scoped creature
//! instances, and the battle hand-off records exchanged with the simulator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::MoveSource;
use crate::ids::{EpisodeId, MonId};

/// Maximum number of moves a creature can know.
pub const MAX_MOVES: usize = 4;

/// Maximum number of creatures fielded in one battle.
pub const PARTY_CAP: usize = 6;

// ---------------------------------------------------------------------------
// Static definitions
// ---------------------------------------------------------------------------

/// A move a blueprint gains once the run reaches a given trainer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnsetEntry {
    /// Index of the trainer whose defeat unlocks the move.
    pub after_trainer: usize,
    /// The move offered.
    #[serde(rename = "move")]
    pub move_name: String,
}

/// A static creature definition. Read-only template for instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureBlueprint {
    /// Species name.
    pub species: String,
    /// Level used when no level range overrides it.
    pub level: u32,
    /// Default moveset (1 to 4 distinct moves).
    pub moves: Vec<String>,
    /// Held item, if any.
    #[serde(default)]
    pub item: Option<String>,
    /// Ability, if any.
    #[serde(default)]
    pub ability: Option<String>,
    /// Level-up moves offered as the run progresses.
    #[serde(default)]
    pub learnset: Vec<LearnsetEntry>,
}

/// An item handed out when a trainer is defeated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReward {
    /// Item name.
    pub name: String,
    /// Strategic reward credited when the item is obtained.
    #[serde(default)]
    pub value: Decimal,
    /// Move taught by the item (a TM), offered to every living creature.
    #[serde(default)]
    pub teaches: Option<String>,
}

/// A mandatory fight with a fixed team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainerSpec {
    /// Trainer name.
    pub name: String,
    /// The trainer's team, in lead order.
    pub team: Vec<CreatureBlueprint>,
    /// Items obtained on victory.
    #[serde(default)]
    pub rewards: Vec<ItemReward>,
}

/// Inclusive level bounds for a route encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRange {
    /// Lowest level drawn.
    pub min: u32,
    /// Highest level drawn.
    pub max: u32,
}

/// One row of a route's encounter table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterSlot {
    /// The creature that may appear.
    pub blueprint: CreatureBlueprint,
    /// Probability of this row. Rows of a route sum to 1.
    pub probability: Decimal,
    /// Level range; the blueprint level is used when absent.
    #[serde(default)]
    pub levels: Option<LevelRange>,
}

/// An optional encounter source unlocked by progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    /// Route name (unique within a gauntlet).
    pub name: String,
    /// The route unlocks once this trainer has been defeated.
    pub unlocks_after: usize,
    /// Weighted encounter table.
    pub encounters: Vec<EncounterSlot>,
}

/// One full gauntlet: ordered trainers plus unlockable routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GauntletSpec {
    /// Gauntlet identifier (hall-of-fame key).
    pub id: String,
    /// Trainers, fought strictly in order.
    pub trainers: Vec<TrainerSpec>,
    /// Routes and their unlock predicates.
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

impl GauntletSpec {
    /// Number of trainers that must be defeated to clear the gauntlet.
    pub const fn len(&self) -> usize {
        self.trainers.len()
    }

    /// Whether the gauntlet has no trainers.
    pub const fn is_empty(&self) -> bool {
        self.trainers.is_empty()
    }

    /// The trainer at `index`, if any.
    pub fn trainer(&self, index: usize) -> Option<&TrainerSpec> {
        self.trainers.get(index)
    }
}

// ---------------------------------------------------------------------------
// Run-scoped state
// ---------------------------------------------------------------------------

/// A living (or formerly living) creature owned by one run.
///
/// Only the roster manager mutates instances. Everyone else sees shared
/// references or clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonInstance {
    /// Identifier, unique within the episode.
    pub id: MonId,
    /// Species name.
    pub species: String,
    /// Current level.
    pub level: u32,
    /// Current moves: 1 to 4, distinct.
    pub moves: Vec<String>,
    /// Held item.
    pub item: Option<String>,
    /// Ability.
    pub ability: Option<String>,
    /// False once the creature has fainted or been released. Never flips back.
    pub alive: bool,
    /// Whether the creature is in the active party (false means boxed).
    pub in_party: bool,
}

impl MonInstance {
    /// Whether the creature already knows `move_name`.
    pub fn knows(&self, move_name: &str) -> bool {
        self.moves.iter().any(|m| m == move_name)
    }
}

/// A pending move-learn opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEvent {
    /// The creature offered the move.
    pub target: MonId,
    /// The candidate move.
    pub move_name: String,
    /// What produced the opportunity.
    pub source: MoveSource,
}

/// Per-slot willingness to sacrifice, aligned to the submitted party order.
///
/// Each entry lies in `[0, 1]`: 0 means "protect at all costs", 1 means
/// "expendable". Produced by the strategic layer for one battle only.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RiskVector(pub Vec<Decimal>);

impl RiskVector {
    /// Wrap a list of per-slot risk values.
    pub const fn new(values: Vec<Decimal>) -> Self {
        Self(values)
    }

    /// The same risk for every one of `len` slots.
    pub fn uniform(len: usize, value: Decimal) -> Self {
        Self(vec![value; len])
    }

    /// Number of slots.
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the vector has no slots.
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Risk assigned to `slot` (0-based).
    pub fn get(&self, slot: usize) -> Option<Decimal> {
        self.0.get(slot).copied()
    }

    /// Whether every entry lies in `[0, 1]`.
    pub fn in_unit_range(&self) -> bool {
        self.0.iter().all(|r| *r >= Decimal::ZERO && *r <= Decimal::ONE)
    }

    /// Iterate over the entries in slot order.
    pub fn iter(&self) -> core::slice::Iter<'_, Decimal> {
        self.0.iter()
    }

    /// Mean risk across slots, or zero for an empty vector.
    pub fn mean(&self) -> Decimal {
        if self.0.is_empty() {
            return Decimal::ZERO;
        }
        let total: Decimal = self.0.iter().copied().sum();
        total
            .checked_div(Decimal::from(self.0.len()))
            .unwrap_or(Decimal::ZERO)
    }
}

impl<'a> IntoIterator for &'a RiskVector {
    type Item = &'a Decimal;
    type IntoIter = core::slice::Iter<'a, Decimal>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Battle hand-off
// ---------------------------------------------------------------------------

/// Everything the battle simulator receives for one fight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleRequest {
    /// The episode the battle belongs to.
    pub episode_id: EpisodeId,
    /// Index of the trainer being fought.
    pub trainer_index: usize,
    /// Party snapshot in submission order.
    pub party: Vec<MonInstance>,
    /// The opponent.
    pub opponent: TrainerSpec,
    /// Risk per party slot.
    pub risk: RiskVector,
    /// Seed for any randomness inside the simulator.
    pub seed: u64,
    /// Externally enforced turn cap.
    pub turn_cap: u32,
}

impl BattleRequest {
    /// Party ids in submission order.
    pub fn party_order(&self) -> Vec<MonId> {
        self.party.iter().map(|m| m.id).collect()
    }
}

/// What the battle simulator reports back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleReport {
    /// Whether the party won.
    pub win: bool,
    /// Survival per party slot, aligned to the submitted order.
    pub survived: Vec<bool>,
    /// Turns the battle lasted.
    pub turns_taken: u32,
    /// Whether the battle was cut off by the turn cap.
    pub turn_cap_hit: bool,
}

impl BattleReport {
    /// Number of slots that fainted.
    pub fn fainted_count(&self) -> usize {
        self.survived.iter().filter(|s| !**s).count()
    }
}

// ---------------------------------------------------------------------------
// Hall of fame
// ---------------------------------------------------------------------------

/// One member of a winning party as recorded in the hall of fame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HallOfFameMember {
    /// Species name.
    pub species: String,
    /// Moves at the time of victory.
    pub moves: Vec<String>,
    /// Held item.
    pub item: Option<String>,
}

impl From<&MonInstance> for HallOfFameMember {
    fn from(mon: &MonInstance) -> Self {
        Self {
            species: mon.species.clone(),
            moves: mon.moves.clone(),
            item: mon.item.clone(),
        }
    }
}
