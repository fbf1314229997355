//! Route encounter sampling.
//!
//! One draw per route unlock: a uniform [`Decimal`] roll in `[0, 1)` picks a
//! row of the route's weighted table. Under the dupes clause a species the
//! run already owned (alive, fainted, or released) is rerolled, up to
//! `max_rerolls` times; if every roll is a dupe the unlock yields nothing.

use gauntlet_types::{CreatureBlueprint, EncounterPreview, EncounterSlot, RouteSpec};
use rand::Rng;
use rand::rngs::StdRng;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::EncounterConfig;

/// Resolution of the uniform roll, in decimal places.
const ROLL_SCALE: u32 = 6;

/// `10^ROLL_SCALE`.
const ROLL_BOUND: i64 = 1_000_000;

/// A creature drawn from an unlocked route, waiting for a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncounterDraw {
    /// Index of the route in the gauntlet spec.
    pub route_index: usize,
    /// Route name.
    pub route: String,
    /// Template for the creature on offer.
    pub blueprint: CreatureBlueprint,
    /// Level the creature will be caught at.
    pub level: u32,
}

impl EncounterDraw {
    /// What the policy sees of this draw.
    pub fn preview(&self) -> EncounterPreview {
        EncounterPreview {
            route: self.route.clone(),
            species: self.blueprint.species.clone(),
            level: self.level,
        }
    }
}

/// A uniform roll in `[0, 1)`.
pub fn uniform_roll(rng: &mut StdRng) -> Decimal {
    Decimal::new(rng.random_range(0..ROLL_BOUND), ROLL_SCALE)
}

/// Pick the table row that `roll` lands in.
pub fn select_slot(table: &[EncounterSlot], roll: Decimal) -> Option<&EncounterSlot> {
    let mut cumulative = Decimal::ZERO;
    for slot in table {
        cumulative = cumulative.saturating_add(slot.probability);
        if roll < cumulative {
            return Some(slot);
        }
    }
    // Rounding slack: a roll past the last boundary lands on the last row.
    table.last()
}

/// Draw the single encounter owed by an unlocked route.
///
/// `already_owned` reports whether the run has owned a species before.
pub fn draw_encounter(
    route_index: usize,
    route: &RouteSpec,
    config: EncounterConfig,
    rng: &mut StdRng,
    already_owned: impl Fn(&str) -> bool,
) -> Option<EncounterDraw> {
    let attempts = if config.dupes_clause {
        config.max_rerolls.saturating_add(1)
    } else {
        1
    };

    for attempt in 0..attempts {
        let roll = uniform_roll(rng);
        let slot = select_slot(&route.encounters, roll)?;
        if config.dupes_clause && already_owned(&slot.blueprint.species) {
            debug!(
                route = %route.name,
                species = %slot.blueprint.species,
                attempt,
                "dupe rerolled"
            );
            continue;
        }
        let level = match slot.levels {
            Some(range) if range.min <= range.max => rng.random_range(range.min..=range.max),
            _ => slot.blueprint.level,
        };
        return Some(EncounterDraw {
            route_index,
            route: route.name.clone(),
            blueprint: slot.blueprint.clone(),
            level,
        });
    }

    debug!(route = %route.name, attempts, "every draw was a dupe; no encounter");
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gauntlet_types::LevelRange;
    use rand::SeedableRng;
    use rust_decimal_macros::dec;

    use super::*;

    fn slot(species: &str, probability: Decimal, levels: Option<LevelRange>) -> EncounterSlot {
        EncounterSlot {
            blueprint: CreatureBlueprint {
                species: species.to_owned(),
                level: 7,
                moves: vec![String::from("tackle")],
                item: None,
                ability: None,
                learnset: Vec::new(),
            },
            probability,
            levels,
        }
    }

    fn route(slots: Vec<EncounterSlot>) -> RouteSpec {
        RouteSpec {
            name: String::from("Viridian Forest"),
            unlocks_after: 0,
            encounters: slots,
        }
    }

    #[test]
    fn select_slot_uses_cumulative_bounds() {
        let table = vec![slot("Caterpie", dec!(0.5), None), slot("Weedle", dec!(0.5), None)];
        assert_eq!(select_slot(&table, dec!(0)).unwrap().blueprint.species, "Caterpie");
        assert_eq!(select_slot(&table, dec!(0.499999)).unwrap().blueprint.species, "Caterpie");
        assert_eq!(select_slot(&table, dec!(0.5)).unwrap().blueprint.species, "Weedle");
        assert!(select_slot(&[], dec!(0.1)).is_none());
    }

    #[test]
    fn roll_is_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1_000 {
            let roll = uniform_roll(&mut rng);
            assert!(roll >= Decimal::ZERO && roll < Decimal::ONE);
        }
    }

    #[test]
    fn draws_are_deterministic_per_seed() {
        let route = route(vec![
            slot("Caterpie", dec!(0.4), Some(LevelRange { min: 3, max: 6 })),
            slot("Weedle", dec!(0.4), None),
            slot("Pikachu", dec!(0.2), None),
        ]);
        let config = EncounterConfig::default();
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..10)
                .map(|_| draw_encounter(0, &route, config, &mut rng, |_| false))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(99), run(99));
    }

    #[test]
    fn level_comes_from_range_or_blueprint() {
        let mut rng = StdRng::seed_from_u64(5);
        let config = EncounterConfig::default();
        let ranged = route(vec![slot("Caterpie", dec!(1), Some(LevelRange { min: 3, max: 6 }))]);
        for _ in 0..50 {
            let draw = draw_encounter(0, &ranged, config, &mut rng, |_| false).unwrap();
            assert!((3..=6).contains(&draw.level));
        }
        let fixed = route(vec![slot("Weedle", dec!(1), None)]);
        let draw = draw_encounter(0, &fixed, config, &mut rng, |_| false).unwrap();
        assert_eq!(draw.level, 7);
    }

    #[test]
    fn dupes_clause_rerolls_owned_species() {
        let route = route(vec![slot("Caterpie", dec!(0.5), None), slot("Weedle", dec!(0.5), None)]);
        let config = EncounterConfig {
            dupes_clause: true,
            max_rerolls: 64,
        };
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..20 {
            let draw = draw_encounter(0, &route, config, &mut rng, |s| s == "Caterpie").unwrap();
            assert_eq!(draw.blueprint.species, "Weedle");
        }
    }

    #[test]
    fn all_dupes_yield_nothing() {
        let route = route(vec![slot("Caterpie", dec!(1), None)]);
        let config = EncounterConfig::default();
        let mut rng = StdRng::seed_from_u64(8);
        assert!(draw_encounter(0, &route, config, &mut rng, |_| true).is_none());
    }

    #[test]
    fn dupes_allowed_when_clause_is_off() {
        let route = route(vec![slot("Caterpie", dec!(1), None)]);
        let config = EncounterConfig {
            dupes_clause: false,
            max_rerolls: 10,
        };
        let mut rng = StdRng::seed_from_u64(8);
        let draw = draw_encounter(2, &route, config, &mut rng, |_| true).unwrap();
        assert_eq!(draw.route_index, 2);
        assert_eq!(draw.preview().species, "Caterpie");
    }
}
