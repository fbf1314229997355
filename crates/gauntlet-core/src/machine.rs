//! The gauntlet state machine.
//!
//! One [`GauntletStateMachine`] drives one episode. It holds the sampled
//! [`GauntletSpec`], the [`RosterManager`], the route tracker, the move
//! queue, and the episode RNG, and it accepts exactly one
//! [`GauntletAction`] per step. The phase decides which action variant is
//! legal; anything else is rejected with a penalty and leaves the state
//! untouched.
//!
//! # Phases
//!
//! ```text
//! PreBattle ──battle──> MoveSelection* ──> Encounter* ──> PreBattle
//!     │                                                      ...
//!     └──wipe / last trainer beaten──> Done
//! ```
//!
//! Battles are split in two so an async caller can bound the simulator
//! call: [`submit_pre_battle`](GauntletStateMachine::submit_pre_battle)
//! hands back a [`BattleRequest`], and the caller answers with
//! [`resolve_battle`](GauntletStateMachine::resolve_battle) or gives up
//! with [`abandon`](GauntletStateMachine::abandon).
//! [`step`](GauntletStateMachine::step) does both halves synchronously.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use gauntlet_roster::{RosterConfig, RosterError, RosterManager};
use gauntlet_types::{
    BattleReport, BattleRequest, CreatureBlueprint, EncounterAction, EpisodeId, EpisodeOutcome,
    GauntletAction, GauntletSpec, HallOfFameMember, InvalidActionReason, LearnsetEntry, MonId,
    MoveEvent, MoveSelectionAction, MoveSource, Observation, Phase, PreBattleAction, Rejection,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::{EncounterConfig, GauntletConfig, StarterConfig};
use crate::encounter::{EncounterDraw, draw_encounter};
use crate::gauntlet::{GauntletCatalog, RouteTracker, choose_starters};
use crate::observation;
use crate::reward::{BattleRewardBreakdown, LedgerError, RewardConfig, RewardLedger};
use crate::simulator::{BattleSimulator, SimulatorError};

/// Errors that stop a step from producing an outcome.
///
/// Policy mistakes are not errors; they come back as a [`Rejection`] in the
/// [`StepOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// The episode is over; no further actions are accepted.
    #[error("episode already finished")]
    EpisodeFinished,

    /// A battle was submitted and has not been resolved or abandoned.
    #[error("a battle is already awaiting resolution")]
    BattleInFlight,

    /// `resolve_battle` was called with no battle outstanding.
    #[error("no battle is awaiting resolution")]
    NoBattleInFlight,

    /// The survival mask does not line up with the submitted party. This
    /// is a defect in the simulator adapter; nothing was applied.
    #[error("ordering mismatch: {source}")]
    OrderingMismatch {
        /// The roster's description of the mismatch.
        source: RosterError,
    },

    /// The roster refused an operation the machine had already validated.
    #[error("roster error: {source}")]
    Roster {
        /// The underlying roster error.
        source: RosterError,
    },

    /// The simulator failed; the episode has been aborted.
    #[error("simulator error: {source}")]
    Simulator {
        /// The underlying simulator error.
        #[from]
        source: SimulatorError,
    },

    /// The reward ledger refused an entry.
    #[error("reward ledger error: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: LedgerError,
    },

    /// The episode could not be started.
    #[error("episode setup failed: {reason}")]
    Setup {
        /// What was missing.
        reason: String,
    },
}

impl From<RosterError> for StepError {
    fn from(source: RosterError) -> Self {
        match source {
            RosterError::OrderingMismatch { .. } => Self::OrderingMismatch { source },
            other => Self::Roster { source: other },
        }
    }
}

/// Per-episode settings taken from the loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EpisodeSettings {
    /// Party and roster caps.
    pub roster: RosterConfig,
    /// Reward weights.
    pub rewards: RewardConfig,
    /// Encounter rules.
    pub encounters: EncounterConfig,
    /// Turn cap handed to the simulator.
    pub turn_cap: u32,
}

impl EpisodeSettings {
    /// Pull the episode-relevant sections out of a full config.
    pub fn from_config(config: &GauntletConfig) -> Self {
        Self {
            roster: config.roster,
            rewards: config.rewards.clone(),
            encounters: config.encounters,
            turn_cap: config.engine.turn_cap,
        }
    }
}

/// What one resolved battle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleSummary {
    /// Trainer fought.
    pub trainer_index: usize,
    /// The simulator's report.
    pub report: BattleReport,
    /// Creatures lost, in slot order.
    pub casualties: Vec<MonId>,
    /// Strategic reward terms.
    pub reward: BattleRewardBreakdown,
    /// Battle-level reward for the tactical layer.
    pub tactical_reward: Decimal,
}

/// Details of a step beyond the reward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepInfo {
    /// Phase the action was taken in.
    pub phase: Phase,
    /// Why the action was rejected, if it was.
    pub rejection: Option<Rejection>,
    /// Battle details, for a resolved pre-battle step.
    pub battle: Option<BattleSummary>,
    /// Set once the episode has ended.
    pub outcome: Option<EpisodeOutcome>,
}

/// The result of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// State after the step.
    pub observation: Observation,
    /// Step reward, excluding any terminal term.
    pub reward: Decimal,
    /// Terminal term, present on the step that ends a cleared or wiped run.
    pub terminal_reward: Option<Decimal>,
    /// Whether the episode is over.
    pub done: bool,
    /// Everything else.
    pub info: StepInfo,
}

/// What [`GauntletStateMachine::submit`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The action was handled without a battle (or rejected).
    Resolved(Box<StepOutcome>),
    /// A valid party was submitted; the battle must now be simulated.
    Battle(Box<BattleRequest>),
}

/// Drives one episode through its phases.
#[derive(Debug)]
pub struct GauntletStateMachine {
    episode_id: EpisodeId,
    settings: EpisodeSettings,
    spec: Arc<GauntletSpec>,
    roster: RosterManager,
    learnsets: BTreeMap<MonId, Vec<LearnsetEntry>>,
    routes: RouteTracker,
    phase: Phase,
    trainer_idx: usize,
    move_queue: VecDeque<MoveEvent>,
    pending_encounter: Option<EncounterDraw>,
    in_flight: Option<BattleRequest>,
    /// Party in place before the outstanding submission, restored on abandon.
    party_before_battle: Option<Vec<MonId>>,
    bag: Vec<String>,
    rng: StdRng,
    ledger: RewardLedger,
    outcome: Option<EpisodeOutcome>,
    winning_party: Option<Vec<HallOfFameMember>>,
    steps: u64,
    battles: u32,
    deaths: u32,
}

impl GauntletStateMachine {
    /// Start an episode: sample a gauntlet from `catalog`, choose the
    /// starters, and seed the roster. Every random choice of the episode
    /// flows from `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Setup`] for an empty catalog and
    /// [`StepError::Roster`] if the starters cannot be seeded.
    pub fn start(
        settings: EpisodeSettings,
        catalog: &GauntletCatalog,
        starters: &StarterConfig,
        seed: u64,
    ) -> Result<Self, StepError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let spec = catalog.sample(&mut rng).ok_or_else(|| StepError::Setup {
            reason: String::from("gauntlet catalog is empty"),
        })?;
        let party = choose_starters(starters, &mut rng);
        Self::build(settings, spec, &party, rng)
    }

    /// Start an episode on a fixed gauntlet with a fixed starting party.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Setup`] for a gauntlet with no trainers and
    /// [`StepError::Roster`] if the starters cannot be seeded.
    pub fn with_spec(
        settings: EpisodeSettings,
        spec: Arc<GauntletSpec>,
        starters: &[CreatureBlueprint],
        seed: u64,
    ) -> Result<Self, StepError> {
        Self::build(settings, spec, starters, StdRng::seed_from_u64(seed))
    }

    fn build(
        settings: EpisodeSettings,
        spec: Arc<GauntletSpec>,
        starters: &[CreatureBlueprint],
        mut rng: StdRng,
    ) -> Result<Self, StepError> {
        if spec.is_empty() {
            return Err(StepError::Setup {
                reason: format!("gauntlet {} has no trainers", spec.id),
            });
        }
        let mut roster = RosterManager::new(settings.roster);
        let ids = roster.seed_party(starters)?;
        let learnsets = ids
            .iter()
            .zip(starters)
            .map(|(id, blueprint)| (*id, blueprint.learnset.clone()))
            .collect();

        let episode_id = EpisodeId::from_random_bytes(rng.random());
        info!(
            episode = %episode_id,
            gauntlet = %spec.id,
            trainers = spec.len(),
            starters = ids.len(),
            "episode started"
        );

        Ok(Self {
            episode_id,
            routes: RouteTracker::new(Arc::clone(&spec)),
            settings,
            spec,
            roster,
            learnsets,
            phase: Phase::PreBattle,
            trainer_idx: 0,
            move_queue: VecDeque::new(),
            pending_encounter: None,
            in_flight: None,
            party_before_battle: None,
            bag: Vec::new(),
            rng,
            ledger: RewardLedger::new(),
            outcome: None,
            winning_party: None,
            steps: 0,
            battles: 0,
            deaths: 0,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Episode identifier.
    pub const fn episode_id(&self) -> EpisodeId {
        self.episode_id
    }

    /// The active gauntlet. Never changes during the episode.
    pub fn spec(&self) -> &GauntletSpec {
        &self.spec
    }

    /// Current phase.
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Index of the next trainer to fight.
    pub const fn trainer_idx(&self) -> usize {
        self.trainer_idx
    }

    /// The roster, read-only.
    pub const fn roster(&self) -> &RosterManager {
        &self.roster
    }

    /// Route unlock state.
    pub const fn routes(&self) -> &RouteTracker {
        &self.routes
    }

    /// Pending move events, head first.
    pub const fn move_queue(&self) -> &VecDeque<MoveEvent> {
        &self.move_queue
    }

    /// The creature on offer, in the encounter phase.
    pub const fn pending_encounter(&self) -> Option<&EncounterDraw> {
        self.pending_encounter.as_ref()
    }

    /// Items obtained so far.
    pub fn bag(&self) -> &[String] {
        &self.bag
    }

    /// Every reward paid so far.
    pub const fn ledger(&self) -> &RewardLedger {
        &self.ledger
    }

    /// How the episode ended, once it has.
    pub const fn outcome(&self) -> Option<EpisodeOutcome> {
        self.outcome
    }

    /// Whether the episode is over.
    pub const fn is_done(&self) -> bool {
        self.phase.is_terminal()
    }

    /// The party that beat the last trainer, on a cleared run.
    pub fn winning_party(&self) -> Option<&[HallOfFameMember]> {
        self.winning_party.as_deref()
    }

    /// Steps taken, rejected ones included.
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Battles resolved.
    pub const fn battles(&self) -> u32 {
        self.battles
    }

    /// Creatures lost in battle.
    pub const fn deaths(&self) -> u32 {
        self.deaths
    }

    /// Whether a submitted battle is still waiting for its result.
    pub const fn battle_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The current observation.
    pub fn observation(&self) -> Observation {
        observation::observe(self)
    }

    // -----------------------------------------------------------------------
    // Stepping
    // -----------------------------------------------------------------------

    /// Take one step, simulating any battle synchronously on `simulator`.
    ///
    /// # Errors
    ///
    /// - [`StepError::EpisodeFinished`] once the episode is over.
    /// - [`StepError::Simulator`] if the simulator fails; the episode is
    ///   aborted first.
    /// - [`StepError::OrderingMismatch`] if the report's mask does not fit
    ///   the submitted party.
    pub fn step(
        &mut self,
        action: GauntletAction,
        simulator: &dyn BattleSimulator,
    ) -> Result<StepOutcome, StepError> {
        match self.submit(action)? {
            Submission::Resolved(outcome) => Ok(*outcome),
            Submission::Battle(request) => match simulator.simulate(&request) {
                Ok(report) => self.resolve_battle(report),
                Err(source) => {
                    self.abandon(&source.to_string());
                    Err(StepError::Simulator { source })
                }
            },
        }
    }

    /// Submit one action. Pre-battle actions with a valid party come back
    /// as a [`Submission::Battle`] to be simulated; everything else is
    /// resolved on the spot.
    ///
    /// # Errors
    ///
    /// [`StepError::EpisodeFinished`] once the episode is over and
    /// [`StepError::BattleInFlight`] while a battle is outstanding.
    pub fn submit(&mut self, action: GauntletAction) -> Result<Submission, StepError> {
        self.ensure_accepting()?;
        if action.phase() != self.phase {
            let phase = self.phase;
            return Ok(Submission::Resolved(Box::new(self.reject(
                phase,
                Rejection::InvalidAction(InvalidActionReason::WrongPhase),
            ))));
        }
        match action {
            GauntletAction::PreBattle(action) => self.submit_pre_battle(action),
            GauntletAction::MoveSelection(action) => Ok(Submission::Resolved(Box::new(
                self.step_move_selection(action)?,
            ))),
            GauntletAction::Encounter(action) => {
                Ok(Submission::Resolved(Box::new(self.step_encounter(action)?)))
            }
        }
    }

    /// Validate a party and risk vector and produce the battle request.
    ///
    /// An invalid party or risk vector is rejected with a penalty and no
    /// state change.
    ///
    /// # Errors
    ///
    /// [`StepError::EpisodeFinished`] once the episode is over and
    /// [`StepError::BattleInFlight`] while a battle is outstanding.
    pub fn submit_pre_battle(&mut self, action: PreBattleAction) -> Result<Submission, StepError> {
        self.ensure_accepting()?;
        if self.phase != Phase::PreBattle {
            let phase = self.phase;
            return Ok(Submission::Resolved(Box::new(self.reject(
                phase,
                Rejection::InvalidAction(InvalidActionReason::WrongPhase),
            ))));
        }

        if let Some(reason) = Self::check_party(&action) {
            return Ok(Submission::Resolved(Box::new(
                self.reject(Phase::PreBattle, Rejection::InvalidAction(reason)),
            )));
        }
        let previous = self.roster.party().to_vec();
        if let Err(err) = self.roster.set_party(&action.party) {
            return match err.invalid_action_reason() {
                Some(reason) => Ok(Submission::Resolved(Box::new(
                    self.reject(Phase::PreBattle, Rejection::InvalidAction(reason)),
                ))),
                None => Err(err.into()),
            };
        }

        let opponent = self
            .spec
            .trainer(self.trainer_idx)
            .cloned()
            .ok_or_else(|| StepError::Setup {
                reason: format!("no trainer at index {}", self.trainer_idx),
            })?;
        let request = BattleRequest {
            episode_id: self.episode_id,
            trainer_index: self.trainer_idx,
            party: self.roster.party_members().into_iter().cloned().collect(),
            opponent,
            risk: action.risk,
            seed: self.rng.random(),
            turn_cap: self.settings.turn_cap,
        };
        debug!(
            episode = %self.episode_id,
            trainer = self.trainer_idx,
            party = ?request.party_order(),
            "battle submitted"
        );
        self.in_flight = Some(request.clone());
        self.party_before_battle = Some(previous);
        Ok(Submission::Battle(Box::new(request)))
    }

    /// Apply the simulator's report for the outstanding battle.
    ///
    /// # Errors
    ///
    /// - [`StepError::NoBattleInFlight`] if nothing was submitted.
    /// - [`StepError::OrderingMismatch`] if the mask does not fit the
    ///   submitted party. Nothing is applied.
    pub fn resolve_battle(&mut self, report: BattleReport) -> Result<StepOutcome, StepError> {
        let request = self.in_flight.take().ok_or(StepError::NoBattleInFlight)?;
        let order = request.party_order();

        let survival = match self.roster.apply_survival(&order, &report.survived) {
            Ok(survival) => survival,
            Err(err) => {
                self.in_flight = Some(request);
                return Err(err.into());
            }
        };

        self.party_before_battle = None;
        let trainer_index = request.trainer_index;
        let items = if report.win {
            self.spec
                .trainer(trainer_index)
                .map(|t| t.rewards.clone())
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        let breakdown = self
            .settings
            .rewards
            .battle_reward(&report, &request.risk, &items);
        let tactical_reward = self.settings.rewards.tactical_reward(&report, &request.risk);

        self.steps = self.steps.saturating_add(1);
        self.battles = self.battles.saturating_add(1);
        let lost = u32::try_from(survival.casualties.len()).unwrap_or(u32::MAX);
        self.deaths = self.deaths.saturating_add(lost);

        if report.win {
            self.trainer_idx = self.trainer_idx.saturating_add(1);
            self.bag.extend(items.iter().map(|i| i.name.clone()));
            self.queue_move_events(trainer_index, &items);
        }

        info!(
            episode = %self.episode_id,
            trainer = trainer_index,
            win = report.win,
            casualties = survival.casualties.len(),
            turn_cap_hit = report.turn_cap_hit,
            reward = %breakdown.total(),
            "battle resolved"
        );

        let battle = BattleSummary {
            trainer_index,
            casualties: survival.casualties.iter().map(|c| c.mon_id).collect(),
            report,
            reward: breakdown,
            tactical_reward,
        };

        let reward = breakdown.total();
        self.ledger.record_step(reward);

        let terminal_reward = if self.roster.alive_count() == 0 {
            self.finish(EpisodeOutcome::Wipe)?
        } else if self.trainer_idx >= self.spec.len() {
            self.winning_party = Some(
                self.roster
                    .party_members()
                    .into_iter()
                    .filter(|m| m.alive)
                    .map(HallOfFameMember::from)
                    .collect(),
            );
            self.finish(EpisodeOutcome::Cleared)?
        } else {
            self.routes.advance(self.trainer_idx);
            self.advance_to_next_decision();
            None
        };

        Ok(StepOutcome {
            observation: self.observation(),
            reward,
            terminal_reward,
            done: self.is_done(),
            info: StepInfo {
                phase: Phase::PreBattle,
                rejection: None,
                battle: Some(battle),
                outcome: self.outcome,
            },
        })
    }

    /// Give up on the episode, e.g. after a simulator failure or timeout.
    ///
    /// Any outstanding battle is dropped without touching the roster, and the
    /// party goes back to what it was before that submission. The episode
    /// ends as [`EpisodeOutcome::Aborted`] with no terminal reward.
    /// Abandoning a finished episode changes nothing.
    pub fn abandon(&mut self, reason: &str) -> StepOutcome {
        let phase = self.phase;
        if !self.is_done() {
            warn!(
                episode = %self.episode_id,
                trainer = self.trainer_idx,
                reason,
                "episode aborted"
            );
            if self.in_flight.take().is_some() {
                self.restore_party();
            }
            self.pending_encounter = None;
            self.phase = Phase::Done;
            self.outcome = Some(EpisodeOutcome::Aborted);
        }
        StepOutcome {
            observation: self.observation(),
            reward: Decimal::ZERO,
            terminal_reward: None,
            done: true,
            info: StepInfo {
                phase,
                rejection: None,
                battle: None,
                outcome: self.outcome,
            },
        }
    }

    fn step_move_selection(&mut self, action: MoveSelectionAction) -> Result<StepOutcome, StepError> {
        let Some(event) = self.move_queue.front().cloned() else {
            // An empty queue in this phase cannot happen; move on.
            self.advance_to_next_decision();
            return Ok(self.accept(Phase::MoveSelection));
        };

        match action {
            MoveSelectionAction::Skip => {
                debug!(mon = %event.target, declined = %event.move_name, "move declined");
            }
            MoveSelectionAction::Replace { slot } => {
                if let Err(err) = self.roster.learn_move(event.target, slot, &event.move_name) {
                    return match err.invalid_action_reason() {
                        Some(reason) => {
                            Ok(self.reject(Phase::MoveSelection, Rejection::InvalidAction(reason)))
                        }
                        None => Err(err.into()),
                    };
                }
            }
        }

        self.move_queue.pop_front();
        if self.move_queue.is_empty() {
            self.advance_to_next_decision();
        }
        Ok(self.accept(Phase::MoveSelection))
    }

    fn step_encounter(&mut self, action: EncounterAction) -> Result<StepOutcome, StepError> {
        let Some(draw) = self.pending_encounter.clone() else {
            self.advance_to_next_decision();
            return Ok(self.accept(Phase::Encounter));
        };

        let mut rejection = None;
        match action {
            EncounterAction::Skip => {
                debug!(route = %draw.route, species = %draw.blueprint.species, "encounter skipped");
            }
            EncounterAction::Catch => {
                if self.roster.capacity_remaining() == 0 {
                    warn!(
                        episode = %self.episode_id,
                        species = %draw.blueprint.species,
                        "catch refused: roster full"
                    );
                    rejection = Some(Rejection::CapacityExceeded);
                } else {
                    self.catch(&draw)?;
                }
            }
            EncounterAction::CatchAndReplace { release } => {
                self.roster.check_instantiable(&draw.blueprint)?;
                if let Err(err) = self.roster.release(release) {
                    return match err.invalid_action_reason() {
                        Some(reason) => {
                            Ok(self.reject(Phase::Encounter, Rejection::InvalidAction(reason)))
                        }
                        None => Err(err.into()),
                    };
                }
                self.catch(&draw)?;
            }
        }

        self.pending_encounter = None;
        self.routes.consume_head();
        self.advance_to_next_decision();

        Ok(match rejection {
            Some(rejection) => self.penalize(Phase::Encounter, rejection),
            None => self.accept(Phase::Encounter),
        })
    }

    fn catch(&mut self, draw: &EncounterDraw) -> Result<(), StepError> {
        let mon = self.roster.instantiate(&draw.blueprint, draw.level)?;
        self.learnsets.insert(mon.id, draw.blueprint.learnset.clone());
        info!(
            episode = %self.episode_id,
            mon = %mon.id,
            species = %mon.species,
            level = mon.level,
            route = %draw.route,
            "creature caught"
        );
        Ok(())
    }

    fn restore_party(&mut self) {
        let Some(previous) = self.party_before_battle.take() else {
            return;
        };
        if let Err(err) = self.roster.set_party(&previous) {
            warn!(
                episode = %self.episode_id,
                error = %err,
                "could not restore the party of the dropped battle"
            );
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Pick the next decision after a battle or a resolved event: pending
    /// moves first, then owed route draws, then the next battle.
    fn advance_to_next_decision(&mut self) {
        if !self.move_queue.is_empty() {
            self.phase = Phase::MoveSelection;
            return;
        }
        let spec = Arc::clone(&self.spec);
        while let Some(index) = self.routes.head() {
            let roster = &self.roster;
            let rng = &mut self.rng;
            let draw = spec.routes.get(index).and_then(|route| {
                draw_encounter(index, route, self.settings.encounters, rng, |species| {
                    roster.owns_species(species)
                })
            });
            if let Some(draw) = draw {
                debug!(
                    route = %draw.route,
                    species = %draw.blueprint.species,
                    level = draw.level,
                    "encounter drawn"
                );
                self.pending_encounter = Some(draw);
                self.phase = Phase::Encounter;
                return;
            }
            self.routes.consume_head();
        }
        self.phase = Phase::PreBattle;
    }

    /// Queue level-up moves unlocked by beating `trainer_index` and moves
    /// taught by the items it handed out. Only living creatures are offered
    /// moves, and never one they already know.
    fn queue_move_events(&mut self, trainer_index: usize, items: &[gauntlet_types::ItemReward]) {
        let mut offered = BTreeSet::new();
        let alive: Vec<_> = self.roster.alive().cloned().collect();

        for mon in &alive {
            let entries = self.learnsets.get(&mon.id).map_or(&[][..], Vec::as_slice);
            for entry in entries.iter().filter(|e| e.after_trainer == trainer_index) {
                if !mon.knows(&entry.move_name)
                    && offered.insert((mon.id, entry.move_name.clone()))
                {
                    self.move_queue.push_back(MoveEvent {
                        target: mon.id,
                        move_name: entry.move_name.clone(),
                        source: MoveSource::LevelUp,
                    });
                }
            }
        }

        for taught in items.iter().filter_map(|i| i.teaches.as_ref()) {
            for mon in &alive {
                if !mon.knows(taught) && offered.insert((mon.id, taught.clone())) {
                    self.move_queue.push_back(MoveEvent {
                        target: mon.id,
                        move_name: taught.clone(),
                        source: MoveSource::ExternalItem,
                    });
                }
            }
        }
    }

    fn finish(&mut self, outcome: EpisodeOutcome) -> Result<Option<Decimal>, StepError> {
        self.phase = Phase::Done;
        self.outcome = Some(outcome);
        self.move_queue.clear();
        self.pending_encounter = None;
        let terminal = self.settings.rewards.terminal_reward(outcome);
        if let Some(term) = terminal {
            self.ledger.record_terminal(term)?;
        }
        info!(
            episode = %self.episode_id,
            %outcome,
            trainers_defeated = self.trainer_idx,
            battles = self.battles,
            deaths = self.deaths,
            total_reward = %self.ledger.total(),
            "episode finished"
        );
        Ok(terminal)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn ensure_accepting(&self) -> Result<(), StepError> {
        if self.is_done() {
            return Err(StepError::EpisodeFinished);
        }
        if self.in_flight.is_some() {
            return Err(StepError::BattleInFlight);
        }
        Ok(())
    }

    /// Risk-vector checks the roster does not cover.
    fn check_party(action: &PreBattleAction) -> Option<InvalidActionReason> {
        if action.party.is_empty() {
            return Some(InvalidActionReason::EmptyParty);
        }
        if action.risk.len() != action.party.len() {
            return Some(InvalidActionReason::RiskLengthMismatch);
        }
        if !action.risk.in_unit_range() {
            return Some(InvalidActionReason::RiskOutOfRange);
        }
        None
    }

    /// Reject an action: penalty, no state change, same phase.
    fn reject(&mut self, phase: Phase, rejection: Rejection) -> StepOutcome {
        warn!(
            episode = %self.episode_id,
            %phase,
            ?rejection,
            "action rejected"
        );
        self.penalize(phase, rejection)
    }

    fn penalize(&mut self, phase: Phase, rejection: Rejection) -> StepOutcome {
        let reward = self.settings.rewards.rejection_reward(rejection);
        self.steps = self.steps.saturating_add(1);
        self.ledger.record_step(reward);
        StepOutcome {
            observation: self.observation(),
            reward,
            terminal_reward: None,
            done: self.is_done(),
            info: StepInfo {
                phase,
                rejection: Some(rejection),
                battle: None,
                outcome: self.outcome,
            },
        }
    }

    fn accept(&mut self, phase: Phase) -> StepOutcome {
        self.steps = self.steps.saturating_add(1);
        self.ledger.record_step(Decimal::ZERO);
        StepOutcome {
            observation: self.observation(),
            reward: Decimal::ZERO,
            terminal_reward: None,
            done: self.is_done(),
            info: StepInfo {
                phase,
                rejection: None,
                battle: None,
                outcome: self.outcome,
            },
        }
    }
}
