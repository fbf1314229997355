//! Gauntlet catalog sampling, starter selection, and route unlock tracking.
//!
//! A run samples exactly one [`GauntletSpec`] from the weighted catalog and
//! keeps it for its whole life behind an `Arc`. Routes unlock once the run
//! has defeated the trainer they are tied to; an unlock never reverts and
//! yields at most one encounter.

use std::collections::VecDeque;
use std::sync::Arc;

use gauntlet_types::{CreatureBlueprint, GauntletSpec, RouteStatus};
use rand::Rng;
use rand::rngs::StdRng;

use crate::config::{CatalogEntry, StarterConfig};

/// Weighted set of gauntlets to sample from.
#[derive(Debug, Clone)]
pub struct GauntletCatalog {
    entries: Vec<(Arc<GauntletSpec>, u32)>,
    total_weight: u64,
}

impl GauntletCatalog {
    /// Build a catalog from validated config entries.
    pub fn new(entries: &[CatalogEntry]) -> Self {
        let entries: Vec<_> = entries
            .iter()
            .map(|e| (Arc::new(e.spec.clone()), e.weight))
            .collect();
        let total_weight = entries
            .iter()
            .fold(0_u64, |acc, (_, w)| acc.saturating_add(u64::from(*w)));
        Self {
            entries,
            total_weight,
        }
    }

    /// A catalog holding one gauntlet.
    pub fn single(spec: GauntletSpec) -> Self {
        Self {
            entries: vec![(Arc::new(spec), 1)],
            total_weight: 1,
        }
    }

    /// Number of gauntlets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Draw one gauntlet in proportion to its weight. `None` only for an
    /// empty or zero-weight catalog.
    pub fn sample(&self, rng: &mut StdRng) -> Option<Arc<GauntletSpec>> {
        if self.total_weight == 0 {
            return None;
        }
        let mut roll = rng.random_range(0..self.total_weight);
        for (spec, weight) in &self.entries {
            let weight = u64::from(*weight);
            if roll < weight {
                return Some(Arc::clone(spec));
            }
            roll = roll.saturating_sub(weight);
        }
        self.entries.last().map(|(spec, _)| Arc::clone(spec))
    }
}

/// Resolve the starting party: every fixed starter, then one choice.
pub fn choose_starters(config: &StarterConfig, rng: &mut StdRng) -> Vec<CreatureBlueprint> {
    let mut party = config.fixed.clone();
    if !config.choices.is_empty() {
        let index = config
            .pick
            .unwrap_or_else(|| rng.random_range(0..config.choices.len()));
        if let Some(choice) = config.choices.get(index) {
            party.push(choice.clone());
        }
    }
    party
}

/// Per-route unlock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct RouteState {
    unlocked: bool,
    pending: bool,
    consumed: bool,
}

/// Tracks which routes have unlocked and which draws are still owed.
#[derive(Debug, Clone)]
pub struct RouteTracker {
    spec: Arc<GauntletSpec>,
    states: Vec<RouteState>,
    pending: VecDeque<usize>,
}

impl RouteTracker {
    /// Start with every route locked.
    pub fn new(spec: Arc<GauntletSpec>) -> Self {
        let states = vec![RouteState::default(); spec.routes.len()];
        Self {
            spec,
            states,
            pending: VecDeque::new(),
        }
    }

    /// Unlock every route whose trainer is among the first
    /// `trainers_defeated`. Returns the newly unlocked route indices, which
    /// are also queued as pending.
    pub fn advance(&mut self, trainers_defeated: usize) -> Vec<usize> {
        let mut unlocked = Vec::new();
        for (index, (route, state)) in self.spec.routes.iter().zip(&mut self.states).enumerate() {
            if !state.unlocked && route.unlocks_after < trainers_defeated {
                state.unlocked = true;
                state.pending = true;
                self.pending.push_back(index);
                unlocked.push(index);
            }
        }
        unlocked
    }

    /// The route whose draw is owed next.
    pub fn head(&self) -> Option<usize> {
        self.pending.front().copied()
    }

    /// Whether any draw is owed.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Mark the head route's single draw as used and dequeue it.
    pub fn consume_head(&mut self) -> Option<usize> {
        let index = self.pending.pop_front()?;
        if let Some(state) = self.states.get_mut(index) {
            state.pending = false;
            state.consumed = true;
        }
        Some(index)
    }

    /// Whether route `index` has unlocked.
    pub fn is_unlocked(&self, index: usize) -> bool {
        self.states.get(index).is_some_and(|s| s.unlocked)
    }

    /// Unlock flags for every route, in spec order.
    pub fn statuses(&self) -> Vec<RouteStatus> {
        self.spec
            .routes
            .iter()
            .zip(&self.states)
            .map(|(route, state)| RouteStatus {
                name: route.name.clone(),
                unlocked: state.unlocked,
                pending: state.pending,
                consumed: state.consumed,
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gauntlet_types::{EncounterSlot, RouteSpec, TrainerSpec};
    use rand::SeedableRng;
    use rust_decimal::Decimal;

    use super::*;

    fn blueprint(species: &str) -> CreatureBlueprint {
        CreatureBlueprint {
            species: species.to_owned(),
            level: 5,
            moves: vec![String::from("tackle")],
            item: None,
            ability: None,
            learnset: Vec::new(),
        }
    }

    fn spec(id: &str, routes: &[(&str, usize)]) -> GauntletSpec {
        GauntletSpec {
            id: id.to_owned(),
            trainers: (0..3)
                .map(|i| TrainerSpec {
                    name: format!("T{i}"),
                    team: vec![blueprint("Rattata")],
                    rewards: Vec::new(),
                })
                .collect(),
            routes: routes
                .iter()
                .map(|(name, after)| RouteSpec {
                    name: (*name).to_owned(),
                    unlocks_after: *after,
                    encounters: vec![EncounterSlot {
                        blueprint: blueprint("Pidgey"),
                        probability: Decimal::ONE,
                        levels: None,
                    }],
                })
                .collect(),
        }
    }

    #[test]
    fn sampling_is_deterministic_per_seed() {
        let catalog = GauntletCatalog::new(&[
            CatalogEntry {
                weight: 1,
                spec: spec("a", &[]),
            },
            CatalogEntry {
                weight: 3,
                spec: spec("b", &[]),
            },
        ]);
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..20)
                .map(|_| catalog.sample(&mut rng).unwrap().id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(7), draw(7));
        assert!(draw(7).iter().any(|id| id == "b"));
    }

    #[test]
    fn zero_weight_entries_are_never_drawn() {
        let catalog = GauntletCatalog::new(&[
            CatalogEntry {
                weight: 0,
                spec: spec("never", &[]),
            },
            CatalogEntry {
                weight: 1,
                spec: spec("always", &[]),
            },
        ]);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            assert_eq!(catalog.sample(&mut rng).unwrap().id, "always");
        }
    }

    #[test]
    fn pinned_starter_choice() {
        let config = StarterConfig {
            fixed: vec![blueprint("Pidgey")],
            choices: vec![blueprint("Bulbasaur"), blueprint("Squirtle")],
            pick: Some(1),
        };
        let mut rng = StdRng::seed_from_u64(3);
        let party = choose_starters(&config, &mut rng);
        let species: Vec<_> = party.iter().map(|b| b.species.as_str()).collect();
        assert_eq!(species, vec!["Pidgey", "Squirtle"]);
    }

    #[test]
    fn routes_unlock_monotonically() {
        let spec = Arc::new(spec("g", &[("R1", 0), ("R2", 1), ("R3", 1)]));
        let mut tracker = RouteTracker::new(spec);
        assert!(tracker.advance(0).is_empty());
        assert_eq!(tracker.advance(1), vec![0]);
        assert_eq!(tracker.advance(2), vec![1, 2]);
        assert!(tracker.advance(2).is_empty());

        assert_eq!(tracker.consume_head(), Some(0));
        let statuses = tracker.statuses();
        assert!(statuses[0].unlocked && statuses[0].consumed && !statuses[0].pending);
        assert!(statuses[1].unlocked && statuses[1].pending);

        // Regressing progress never relocks.
        assert!(tracker.advance(0).is_empty());
        assert!(tracker.is_unlocked(0));
        assert_eq!(tracker.head(), Some(1));
    }
}
