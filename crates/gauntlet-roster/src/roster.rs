//! The roster manager: sole owner of every creature in a run.
//!
//! The [`RosterManager`] issues [`MonId`]s sequentially, keeps the
//! party/box partition, applies battle survival masks, and handles move
//! learning and releases. Callers only ever see shared references or
//! clones of [`MonInstance`].
//!
//! Partition rule: the party and the box are disjoint and together hold
//! exactly the living creatures. A creature that faints or is released
//! leaves both and never returns.

use std::collections::{BTreeMap, BTreeSet};

use gauntlet_types::{CreatureBlueprint, MonId, MonInstance};
use tracing::{debug, info};

use crate::config::RosterConfig;
use crate::death::{Casualty, Departure, SurvivalOutcome};
use crate::error::RosterError;
use crate::moves;

/// Owns and mutates every [`MonInstance`] of one episode.
#[derive(Debug, Clone)]
pub struct RosterManager {
    /// Capacity parameters.
    config: RosterConfig,
    /// Every creature issued this run, alive or not.
    mons: BTreeMap<MonId, MonInstance>,
    /// Active party in submission order.
    party: Vec<MonId>,
    /// Creatures that left through a release rather than a faint.
    released: BTreeSet<MonId>,
    /// Next id to hand out.
    next_id: u32,
}

impl RosterManager {
    /// Create an empty roster.
    pub const fn new(config: RosterConfig) -> Self {
        Self {
            config,
            mons: BTreeMap::new(),
            party: Vec::new(),
            released: BTreeSet::new(),
            next_id: 1,
        }
    }

    /// The capacity parameters this roster enforces.
    pub const fn config(&self) -> &RosterConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Create a new living creature from `blueprint` at `level`.
    ///
    /// The creature starts boxed with the blueprint's default moves.
    ///
    /// # Errors
    ///
    /// - [`RosterError::CapacityExceeded`] if the roster is full.
    /// - [`RosterError::InvalidMoveset`] if the blueprint's moveset is not
    ///   1 to 4 distinct moves.
    /// - [`RosterError::ArithmeticOverflow`] if the id counter wraps.
    pub fn instantiate(
        &mut self,
        blueprint: &CreatureBlueprint,
        level: u32,
    ) -> Result<MonInstance, RosterError> {
        if self.capacity_remaining() == 0 {
            return Err(RosterError::CapacityExceeded {
                cap: self.config.roster_cap,
            });
        }
        let id = MonId(self.next_id);
        self.next_id = self.check_instantiable(blueprint)?;

        let mon = MonInstance {
            id,
            species: blueprint.species.clone(),
            level,
            moves: blueprint.moves.clone(),
            item: blueprint.item.clone(),
            ability: blueprint.ability.clone(),
            alive: true,
            in_party: false,
        };
        debug!(mon = %id, species = %mon.species, level, "creature instantiated");
        self.mons.insert(id, mon.clone());
        Ok(mon)
    }

    /// Check everything [`instantiate`](Self::instantiate) checks except
    /// capacity, without changing anything. Returns the id counter's next
    /// value.
    ///
    /// Callers that free a slot before instantiating run this first so a
    /// doomed instantiation never costs them the creature they freed.
    ///
    /// # Errors
    ///
    /// - [`RosterError::InvalidMoveset`] for a bad default moveset.
    /// - [`RosterError::ArithmeticOverflow`] if the id counter would wrap.
    pub fn check_instantiable(&self, blueprint: &CreatureBlueprint) -> Result<u32, RosterError> {
        moves::validate_moveset(&blueprint.moves).map_err(|reason| {
            RosterError::InvalidMoveset {
                species: blueprint.species.clone(),
                reason,
            }
        })?;
        self.next_id
            .checked_add(1)
            .ok_or_else(|| RosterError::ArithmeticOverflow {
                context: String::from("mon id counter overflow"),
            })
    }

    /// Instantiate each starter at its base level and field them all.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`instantiate`](Self::instantiate) and
    /// [`set_party`](Self::set_party). Starters created before a failure
    /// stay boxed.
    pub fn seed_party(&mut self, starters: &[CreatureBlueprint]) -> Result<Vec<MonId>, RosterError> {
        let mut ids = Vec::with_capacity(starters.len());
        for blueprint in starters {
            let mon = self.instantiate(blueprint, blueprint.level)?;
            ids.push(mon.id);
        }
        self.set_party(&ids)?;
        info!(starters = ids.len(), "starting party seeded");
        Ok(ids)
    }

    /// Replace the active party with `subset`, in the given order.
    ///
    /// Every other living creature moves to the box.
    ///
    /// # Errors
    ///
    /// Rejects an empty subset, one larger than the party cap, duplicate
    /// ids, unknown ids, and creatures that are no longer alive. Nothing
    /// changes on error.
    pub fn set_party(&mut self, subset: &[MonId]) -> Result<(), RosterError> {
        if subset.is_empty() {
            return Err(RosterError::EmptyParty);
        }
        if subset.len() > self.config.party_cap {
            return Err(RosterError::PartyTooLarge {
                size: subset.len(),
                cap: self.config.party_cap,
            });
        }
        let mut seen = BTreeSet::new();
        for id in subset {
            if !seen.insert(*id) {
                return Err(RosterError::DuplicateMember(*id));
            }
            self.require_alive(*id)?;
        }

        for mon in self.mons.values_mut().filter(|m| m.alive) {
            mon.in_party = seen.contains(&mon.id);
        }
        self.party = subset.to_vec();
        debug!(party = ?self.party, "party set");
        Ok(())
    }

    /// Apply one battle's survival mask.
    ///
    /// `party_order` must be exactly the order recorded by the last
    /// [`set_party`](Self::set_party) and `survived` must have one entry per
    /// slot. Fainted creatures lose their `alive` flag and leave the party;
    /// survivors keep their slots.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::OrderingMismatch`] when the order or the mask
    /// length diverges. Nothing is applied in that case.
    pub fn apply_survival(
        &mut self,
        party_order: &[MonId],
        survived: &[bool],
    ) -> Result<SurvivalOutcome, RosterError> {
        if party_order != self.party.as_slice() || survived.len() != self.party.len() {
            return Err(RosterError::OrderingMismatch {
                submitted: self.party.clone(),
                reported: party_order.to_vec(),
                mask_len: survived.len(),
            });
        }

        let mut outcome = SurvivalOutcome::default();
        for (slot, (id, alive)) in party_order.iter().zip(survived).enumerate() {
            if *alive {
                outcome.survivors.push(*id);
                continue;
            }
            if let Some(mon) = self.mons.get_mut(id) {
                mon.alive = false;
                mon.in_party = false;
                info!(
                    mon = %id,
                    species = %mon.species,
                    level = mon.level,
                    departure = %Departure::Fainted,
                    "creature lost"
                );
                outcome.casualties.push(Casualty {
                    mon_id: *id,
                    slot,
                    species: mon.species.clone(),
                    level: mon.level,
                });
            }
        }
        self.party.retain(|id| outcome.survivors.contains(id));
        Ok(outcome)
    }

    /// Teach `move_name` to `mon` in 1-based `slot`.
    ///
    /// Overwrites the move in that slot, or appends when the creature knows
    /// fewer moves than `slot`. Returns the move that was forgotten, if any.
    ///
    /// # Errors
    ///
    /// Rejects slots outside `1..=4`, unknown or fainted creatures, and moves
    /// the creature already knows.
    pub fn learn_move(
        &mut self,
        mon: MonId,
        slot: u8,
        move_name: &str,
    ) -> Result<Option<String>, RosterError> {
        let index = moves::slot_index(slot).ok_or(RosterError::SlotOutOfRange { slot })?;
        self.require_alive(mon)?;
        let instance = self.mons.get_mut(&mon).ok_or(RosterError::UnknownMon(mon))?;
        if instance.knows(move_name) {
            return Err(RosterError::DuplicateMove {
                mon,
                move_name: move_name.to_owned(),
            });
        }
        let forgotten = moves::write_slot(&mut instance.moves, index, move_name);
        debug!(
            mon = %mon,
            learned = move_name,
            forgotten = forgotten.as_deref().unwrap_or("-"),
            "move learned"
        );
        Ok(forgotten)
    }

    /// Release a living creature. It leaves the roster for good, without
    /// counting as a death.
    ///
    /// # Errors
    ///
    /// Rejects unknown creatures and creatures that are no longer alive.
    pub fn release(&mut self, mon: MonId) -> Result<(), RosterError> {
        self.require_alive(mon)?;
        if let Some(instance) = self.mons.get_mut(&mon) {
            instance.alive = false;
            instance.in_party = false;
            info!(
                mon = %mon,
                species = %instance.species,
                departure = %Departure::Released,
                "creature lost"
            );
        }
        self.party.retain(|id| *id != mon);
        self.released.insert(mon);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Free roster slots. Pure: calling it never changes anything.
    pub fn capacity_remaining(&self) -> u32 {
        let alive = u32::try_from(self.alive_count()).unwrap_or(u32::MAX);
        self.config.roster_cap.saturating_sub(alive)
    }

    /// Look up a creature by id, alive or not.
    pub fn get(&self, mon: MonId) -> Option<&MonInstance> {
        self.mons.get(&mon)
    }

    /// Whether `mon` exists and is alive.
    pub fn is_alive(&self, mon: MonId) -> bool {
        self.mons.get(&mon).is_some_and(|m| m.alive)
    }

    /// Whether `mon` left the roster through a release.
    pub fn is_released(&self, mon: MonId) -> bool {
        self.released.contains(&mon)
    }

    /// Living creatures in id order.
    pub fn alive(&self) -> impl Iterator<Item = &MonInstance> {
        self.mons.values().filter(|m| m.alive)
    }

    /// Number of living creatures.
    pub fn alive_count(&self) -> usize {
        self.alive().count()
    }

    /// Active party ids in submission order.
    pub fn party(&self) -> &[MonId] {
        &self.party
    }

    /// Active party members in submission order.
    pub fn party_members(&self) -> Vec<&MonInstance> {
        self.party.iter().filter_map(|id| self.mons.get(id)).collect()
    }

    /// Ids of living creatures outside the party.
    pub fn box_ids(&self) -> Vec<MonId> {
        self.alive()
            .filter(|m| !m.in_party)
            .map(|m| m.id)
            .collect()
    }

    /// Every creature issued this run, in id order.
    pub fn all(&self) -> impl Iterator<Item = &MonInstance> {
        self.mons.values()
    }

    /// Whether any creature of `species` was ever owned this run.
    pub fn owns_species(&self, species: &str) -> bool {
        self.mons.values().any(|m| m.species == species)
    }

    /// Whether every creature satisfies the 1 to 4 distinct moves rule.
    pub fn movesets_hold(&self) -> bool {
        self.mons
            .values()
            .all(|m| moves::validate_moveset(&m.moves).is_ok())
    }

    /// Check the partition rule: party and box are disjoint, their union is
    /// the living roster, and the party fits the cap.
    pub fn partition_holds(&self) -> bool {
        let party: BTreeSet<MonId> = self.party.iter().copied().collect();
        let boxed: BTreeSet<MonId> = self.box_ids().into_iter().collect();
        let alive: BTreeSet<MonId> = self.alive().map(|m| m.id).collect();
        let flags_agree = self
            .mons
            .values()
            .all(|m| m.in_party == party.contains(&m.id));
        party.len() == self.party.len()
            && self.party.len() <= self.config.party_cap
            && party.is_disjoint(&boxed)
            && party.union(&boxed).copied().collect::<BTreeSet<_>>() == alive
            && flags_agree
    }

    fn require_alive(&self, mon: MonId) -> Result<(), RosterError> {
        match self.mons.get(&mon) {
            None => Err(RosterError::UnknownMon(mon)),
            Some(m) if !m.alive => Err(RosterError::MonNotAlive(mon)),
            Some(_) => Ok(()),
        }
    }
}
