//! End-to-end scenarios for the gauntlet state machine.
//!
//! Battles are answered by a scripted simulator so every reward can be
//! asserted exactly.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::arithmetic_side_effects
)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use gauntlet_core::config::EncounterConfig;
use gauntlet_core::machine::{EpisodeSettings, GauntletStateMachine, StepError, Submission};
use gauntlet_core::reward::RewardConfig;
use gauntlet_core::simulator::{BattleSimulator, SimulatorError};
use gauntlet_roster::RosterConfig;
use gauntlet_types::{
    BattleReport, BattleRequest, CreatureBlueprint, EncounterAction, EncounterSlot,
    EpisodeOutcome, GauntletAction, GauntletSpec, InvalidActionReason, ItemReward, LearnsetEntry,
    MonId, MoveSelectionAction, MoveSource, Phase, PreBattleAction, Rejection, RiskVector,
    RouteSpec, TrainerSpec,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// =============================================================================
// Fixtures
// =============================================================================

/// Answers each battle with the next queued report.
struct Scripted {
    reports: Mutex<VecDeque<BattleReport>>,
}

impl Scripted {
    fn new(reports: Vec<BattleReport>) -> Self {
        Self {
            reports: Mutex::new(reports.into()),
        }
    }
}

impl BattleSimulator for Scripted {
    fn simulate(&self, _request: &BattleRequest) -> Result<BattleReport, SimulatorError> {
        self.reports
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| SimulatorError::Unavailable {
                reason: String::from("script exhausted"),
            })
    }
}

/// Always fails.
struct Broken;

impl BattleSimulator for Broken {
    fn simulate(&self, _request: &BattleRequest) -> Result<BattleReport, SimulatorError> {
        Err(SimulatorError::Unavailable {
            reason: String::from("backend crashed"),
        })
    }
}

fn report(win: bool, survived: &[bool]) -> BattleReport {
    BattleReport {
        win,
        survived: survived.to_vec(),
        turns_taken: 12,
        turn_cap_hit: false,
    }
}

fn blueprint(species: &str, level: u32, learnset: &[(usize, &str)]) -> CreatureBlueprint {
    CreatureBlueprint {
        species: species.to_owned(),
        level,
        moves: vec![String::from("tackle"), String::from("growl")],
        item: None,
        ability: None,
        learnset: learnset
            .iter()
            .map(|(after, name)| LearnsetEntry {
                after_trainer: *after,
                move_name: (*name).to_owned(),
            })
            .collect(),
    }
}

fn trainer(name: &str, rewards: Vec<ItemReward>) -> TrainerSpec {
    TrainerSpec {
        name: name.to_owned(),
        team: vec![blueprint("Geodude", 12, &[]), blueprint("Onix", 14, &[])],
        rewards,
    }
}

fn badge(value: Decimal) -> ItemReward {
    ItemReward {
        name: String::from("Boulder Badge"),
        value,
        teaches: None,
    }
}

fn route(name: &str, unlocks_after: usize, species: &str) -> RouteSpec {
    RouteSpec {
        name: name.to_owned(),
        unlocks_after,
        encounters: vec![EncounterSlot {
            blueprint: blueprint(species, 6, &[]),
            probability: Decimal::ONE,
            levels: None,
        }],
    }
}

fn gauntlet(trainers: Vec<TrainerSpec>, routes: Vec<RouteSpec>) -> Arc<GauntletSpec> {
    Arc::new(GauntletSpec {
        id: String::from("pewter-run"),
        trainers,
        routes,
    })
}

fn settings(roster_cap: u32) -> EpisodeSettings {
    EpisodeSettings {
        roster: RosterConfig {
            party_cap: 6,
            roster_cap,
        },
        rewards: RewardConfig::default(),
        encounters: EncounterConfig::default(),
        turn_cap: 100,
    }
}

fn starters() -> Vec<CreatureBlueprint> {
    vec![
        blueprint("Bulbasaur", 5, &[]),
        blueprint("Pidgey", 4, &[]),
        blueprint("Rattata", 4, &[]),
    ]
}

fn fight(party: &[u32], risk: &[Decimal]) -> GauntletAction {
    GauntletAction::PreBattle(PreBattleAction {
        party: party.iter().map(|id| MonId(*id)).collect(),
        risk: RiskVector::new(risk.to_vec()),
    })
}

fn two_trainer_machine() -> GauntletStateMachine {
    let spec = gauntlet(
        vec![trainer("Brock", vec![badge(dec!(0.5))]), trainer("Misty", Vec::new())],
        Vec::new(),
    );
    GauntletStateMachine::with_spec(settings(12), spec, &starters(), 7).unwrap()
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn win_with_one_casualty_pays_progress_minus_one_death() {
    let mut machine = two_trainer_machine();
    let sim = Scripted::new(vec![report(true, &[true, false, true])]);

    let outcome = machine
        .step(fight(&[1, 2, 3], &[dec!(0.2), dec!(0.5), dec!(0.8)]), &sim)
        .unwrap();

    assert!(!machine.roster().is_alive(MonId(2)));
    assert!(machine.roster().is_alive(MonId(1)));
    assert!(machine.roster().is_alive(MonId(3)));
    assert_eq!(machine.trainer_idx(), 1);
    assert_eq!(machine.phase(), Phase::PreBattle);

    let battle = outcome.info.battle.unwrap();
    assert_eq!(battle.casualties, vec![MonId(2)]);
    assert_eq!(battle.reward.progress, dec!(1));
    assert_eq!(battle.reward.item_value, dec!(0.5));
    // Linear between 0.2 at risk 0 and 0.05 at risk 1.
    assert_eq!(battle.reward.death_cost, dec!(0.125));
    assert_eq!(outcome.reward, dec!(1.375));
    assert!(outcome.terminal_reward.is_none());
    assert!(!outcome.done);
    assert_eq!(machine.bag(), &[String::from("Boulder Badge")]);
}

#[test]
fn party_with_dead_member_is_rejected_without_change() {
    let mut machine = two_trainer_machine();
    let sim = Scripted::new(vec![report(true, &[true, false, true])]);
    machine
        .step(fight(&[1, 2, 3], &[dec!(0.3); 3]), &sim)
        .unwrap();
    let party_before = machine.roster().party().to_vec();
    let ledger_steps = machine.ledger().steps().len();

    let outcome = machine.step(fight(&[2, 1], &[dec!(0.3); 2]), &sim).unwrap();

    assert_eq!(
        outcome.info.rejection,
        Some(Rejection::InvalidAction(InvalidActionReason::MonNotAlive))
    );
    assert_eq!(outcome.reward, dec!(-0.1));
    assert_eq!(machine.trainer_idx(), 1);
    assert_eq!(machine.phase(), Phase::PreBattle);
    assert_eq!(machine.roster().party(), party_before.as_slice());
    assert!(!machine.battle_in_flight());
    assert_eq!(machine.ledger().steps().len(), ledger_steps + 1);
}

#[test]
fn catch_with_full_roster_is_refused_and_skipped() {
    let spec = gauntlet(
        vec![trainer("Brock", Vec::new()), trainer("Misty", Vec::new())],
        vec![route("Route 3", 0, "Spearow")],
    );
    let mut machine = GauntletStateMachine::with_spec(settings(3), spec, &starters(), 7).unwrap();
    let sim = Scripted::new(vec![report(true, &[true, true, true])]);
    machine
        .step(fight(&[1, 2, 3], &[dec!(0.3); 3]), &sim)
        .unwrap();

    assert_eq!(machine.phase(), Phase::Encounter);
    assert_eq!(machine.roster().capacity_remaining(), 0);
    assert_eq!(
        machine.pending_encounter().unwrap().blueprint.species,
        "Spearow"
    );

    let outcome = machine
        .step(GauntletAction::Encounter(EncounterAction::Catch), &sim)
        .unwrap();

    assert_eq!(outcome.info.rejection, Some(Rejection::CapacityExceeded));
    assert_eq!(outcome.reward, dec!(-0.05));
    assert_eq!(machine.phase(), Phase::PreBattle);
    assert!(machine.pending_encounter().is_none());
    assert_eq!(machine.roster().all().count(), 3);
    let status = &machine.routes().statuses()[0];
    assert!(status.unlocked && status.consumed && !status.pending);
}

#[test]
fn all_fainted_is_a_wipe_even_after_a_win() {
    let spec = gauntlet(vec![trainer("Brock", Vec::new())], Vec::new());
    let mut machine = GauntletStateMachine::with_spec(settings(12), spec, &starters(), 7).unwrap();
    let sim = Scripted::new(vec![report(true, &[false, false, false])]);

    let outcome = machine
        .step(fight(&[1, 2, 3], &[dec!(1); 3]), &sim)
        .unwrap();

    assert_eq!(machine.phase(), Phase::Done);
    assert_eq!(machine.outcome(), Some(EpisodeOutcome::Wipe));
    assert_eq!(outcome.info.outcome, Some(EpisodeOutcome::Wipe));
    assert_eq!(outcome.terminal_reward, Some(dec!(-5)));
    assert!(outcome.done);
    assert!(machine.winning_party().is_none());
}

#[test]
fn losing_with_everyone_down_ends_in_wipe() {
    let mut machine = two_trainer_machine();
    let sim = Scripted::new(vec![report(false, &[false, false, false])]);

    let outcome = machine
        .step(fight(&[1, 2, 3], &[dec!(0); 3]), &sim)
        .unwrap();

    assert_eq!(machine.outcome(), Some(EpisodeOutcome::Wipe));
    assert_eq!(machine.trainer_idx(), 0);
    // Three deaths at risk 0 cost the full 0.2 each.
    assert_eq!(outcome.reward, dec!(-0.6));
    assert_eq!(outcome.terminal_reward, Some(dec!(-5)));
}

#[test]
fn skipping_every_move_event_leaves_movesets_alone() {
    let spec = gauntlet(
        vec![trainer("Brock", Vec::new()), trainer("Misty", Vec::new())],
        vec![route("Route 3", 0, "Spearow")],
    );
    let party = vec![
        blueprint("Bulbasaur", 5, &[(0, "vine whip")]),
        blueprint("Squirtle", 5, &[(0, "water gun"), (1, "bite")]),
    ];
    let mut machine = GauntletStateMachine::with_spec(settings(12), spec, &party, 7).unwrap();
    let sim = Scripted::new(vec![report(true, &[true, true])]);
    machine
        .step(fight(&[1, 2], &[dec!(0.3); 2]), &sim)
        .unwrap();

    assert_eq!(machine.phase(), Phase::MoveSelection);
    assert_eq!(machine.move_queue().len(), 2);
    assert!(
        machine
            .move_queue()
            .iter()
            .all(|e| e.source == MoveSource::LevelUp)
    );
    let before: Vec<_> = machine.roster().all().map(|m| m.moves.clone()).collect();

    let first = machine
        .step(GauntletAction::MoveSelection(MoveSelectionAction::Skip), &sim)
        .unwrap();
    assert_eq!(first.observation.phase, Phase::MoveSelection);
    assert_eq!(first.observation.queued_moves, 1);

    machine
        .step(GauntletAction::MoveSelection(MoveSelectionAction::Skip), &sim)
        .unwrap();

    let after: Vec<_> = machine.roster().all().map(|m| m.moves.clone()).collect();
    assert_eq!(before, after);
    assert!(machine.move_queue().is_empty());
    assert_eq!(machine.phase(), Phase::Encounter);
}

// =============================================================================
// Move selection and encounters
// =============================================================================

#[test]
fn taught_moves_are_offered_to_every_survivor_who_lacks_them() {
    let tm = ItemReward {
        name: String::from("TM39"),
        value: dec!(0.1),
        teaches: Some(String::from("rock tomb")),
    };
    let spec = gauntlet(
        vec![trainer("Brock", vec![tm]), trainer("Misty", Vec::new())],
        Vec::new(),
    );
    let mut machine = GauntletStateMachine::with_spec(settings(12), spec, &starters(), 7).unwrap();
    let sim = Scripted::new(vec![report(true, &[true, false, true])]);
    machine
        .step(fight(&[1, 2, 3], &[dec!(0.3); 3]), &sim)
        .unwrap();

    let targets: Vec<_> = machine.move_queue().iter().map(|e| e.target).collect();
    assert_eq!(targets, vec![MonId(1), MonId(3)]);
    assert!(
        machine
            .move_queue()
            .iter()
            .all(|e| e.source == MoveSource::ExternalItem && e.move_name == "rock tomb")
    );

    // Slot 3 is free: the move is appended.
    machine
        .step(
            GauntletAction::MoveSelection(MoveSelectionAction::Replace { slot: 3 }),
            &sim,
        )
        .unwrap();
    assert_eq!(
        machine.roster().get(MonId(1)).unwrap().moves,
        vec!["tackle", "growl", "rock tomb"]
    );

    // Out-of-range slot: rejected, the event stays at the head.
    let outcome = machine
        .step(
            GauntletAction::MoveSelection(MoveSelectionAction::Replace { slot: 5 }),
            &sim,
        )
        .unwrap();
    assert_eq!(
        outcome.info.rejection,
        Some(Rejection::InvalidAction(InvalidActionReason::SlotOutOfRange))
    );
    assert_eq!(machine.move_queue().front().unwrap().target, MonId(3));

    // Overwrite slot 1.
    machine
        .step(
            GauntletAction::MoveSelection(MoveSelectionAction::Replace { slot: 1 }),
            &sim,
        )
        .unwrap();
    assert_eq!(
        machine.roster().get(MonId(3)).unwrap().moves,
        vec!["rock tomb", "growl"]
    );
    assert_eq!(machine.phase(), Phase::PreBattle);
    assert!(machine.roster().movesets_hold());
}

#[test]
fn catch_adds_to_the_box() {
    let spec = gauntlet(
        vec![trainer("Brock", Vec::new()), trainer("Misty", Vec::new())],
        vec![route("Route 3", 0, "Spearow")],
    );
    let mut machine = GauntletStateMachine::with_spec(settings(12), spec, &starters(), 7).unwrap();
    let sim = Scripted::new(vec![report(true, &[true, true, true])]);
    machine
        .step(fight(&[1, 2, 3], &[dec!(0.3); 3]), &sim)
        .unwrap();

    let outcome = machine
        .step(GauntletAction::Encounter(EncounterAction::Catch), &sim)
        .unwrap();

    assert!(outcome.info.rejection.is_none());
    let caught = machine.roster().get(MonId(4)).unwrap();
    assert_eq!(caught.species, "Spearow");
    assert!(caught.alive && !caught.in_party);
    assert_eq!(machine.roster().box_ids(), vec![MonId(4)]);
    assert_eq!(machine.phase(), Phase::PreBattle);
}

#[test]
fn catch_and_replace_needs_a_living_target() {
    let spec = gauntlet(
        vec![trainer("Brock", Vec::new()), trainer("Misty", Vec::new())],
        vec![route("Route 3", 0, "Spearow")],
    );
    let mut machine = GauntletStateMachine::with_spec(settings(3), spec, &starters(), 7).unwrap();
    let sim = Scripted::new(vec![report(true, &[true, true, true])]);
    machine
        .step(fight(&[1, 2, 3], &[dec!(0.3); 3]), &sim)
        .unwrap();

    let outcome = machine
        .step(
            GauntletAction::Encounter(EncounterAction::CatchAndReplace { release: MonId(9) }),
            &sim,
        )
        .unwrap();
    assert_eq!(
        outcome.info.rejection,
        Some(Rejection::InvalidAction(InvalidActionReason::UnknownMon))
    );
    assert_eq!(machine.phase(), Phase::Encounter);
    assert!(machine.pending_encounter().is_some());

    machine
        .step(
            GauntletAction::Encounter(EncounterAction::CatchAndReplace { release: MonId(3) }),
            &sim,
        )
        .unwrap();
    assert!(machine.roster().is_released(MonId(3)));
    assert!(machine.roster().is_alive(MonId(4)));
    assert_eq!(machine.roster().capacity_remaining(), 0);
    // A release is not a death.
    assert_eq!(machine.deaths(), 0);
}

#[test]
fn failed_replacement_keeps_the_release_target() {
    let mut bad_route = route("Route 3", 0, "Spearow");
    bad_route.encounters[0].blueprint.moves.clear();
    let spec = gauntlet(
        vec![trainer("Brock", Vec::new()), trainer("Misty", Vec::new())],
        vec![bad_route],
    );
    let mut machine = GauntletStateMachine::with_spec(settings(3), spec, &starters(), 7).unwrap();
    let sim = Scripted::new(vec![report(true, &[true, true, true])]);
    machine
        .step(fight(&[1, 2, 3], &[dec!(0.3); 3]), &sim)
        .unwrap();

    let err = machine
        .step(
            GauntletAction::Encounter(EncounterAction::CatchAndReplace { release: MonId(3) }),
            &sim,
        )
        .unwrap_err();

    assert!(matches!(err, StepError::Roster { .. }));
    assert!(!machine.roster().is_released(MonId(3)));
    assert!(machine.roster().is_alive(MonId(3)));
    assert_eq!(machine.roster().party(), &[MonId(1), MonId(2), MonId(3)]);
    assert!(machine.roster().get(MonId(4)).is_none());
    assert!(machine.roster().partition_holds());
}

#[test]
fn capacity_check_is_pure() {
    let machine = two_trainer_machine();
    let first = machine.roster().capacity_remaining();
    let second = machine.roster().capacity_remaining();
    assert_eq!(first, second);
    assert_eq!(first, 9);
}

// =============================================================================
// Phase discipline and failure handling
// =============================================================================

#[test]
fn action_for_the_wrong_phase_is_rejected() {
    let mut machine = two_trainer_machine();
    let sim = Scripted::new(Vec::new());

    let outcome = machine
        .step(GauntletAction::Encounter(EncounterAction::Catch), &sim)
        .unwrap();

    assert_eq!(
        outcome.info.rejection,
        Some(Rejection::InvalidAction(InvalidActionReason::WrongPhase))
    );
    assert_eq!(outcome.reward, dec!(-0.1));
    assert_eq!(machine.phase(), Phase::PreBattle);
}

#[test]
fn risk_vector_must_fit_the_party() {
    let mut machine = two_trainer_machine();
    let sim = Scripted::new(Vec::new());

    let short = machine.step(fight(&[1, 2], &[dec!(0.5)]), &sim).unwrap();
    assert_eq!(
        short.info.rejection,
        Some(Rejection::InvalidAction(InvalidActionReason::RiskLengthMismatch))
    );

    let wide = machine
        .step(fight(&[1, 2], &[dec!(0.5), dec!(1.5)]), &sim)
        .unwrap();
    assert_eq!(
        wide.info.rejection,
        Some(Rejection::InvalidAction(InvalidActionReason::RiskOutOfRange))
    );
    assert_eq!(machine.trainer_idx(), 0);
}

#[test]
fn clearing_the_gauntlet_records_the_winning_party() {
    let mut machine = two_trainer_machine();
    let sim = Scripted::new(vec![
        report(true, &[true, true, true]),
        report(true, &[true, false]),
    ]);
    machine
        .step(fight(&[1, 2, 3], &[dec!(0.3); 3]), &sim)
        .unwrap();
    let outcome = machine
        .step(fight(&[3, 1], &[dec!(0); 2]), &sim)
        .unwrap();

    assert_eq!(machine.outcome(), Some(EpisodeOutcome::Cleared));
    assert_eq!(outcome.terminal_reward, Some(dec!(10)));
    let party = machine.winning_party().unwrap();
    assert_eq!(party.len(), 1);
    assert_eq!(party[0].species, "Rattata");

    let err = machine
        .step(fight(&[3], &[dec!(0)]), &sim)
        .unwrap_err();
    assert!(matches!(err, StepError::EpisodeFinished));
}

#[test]
fn ledger_balances_to_steps_plus_terminal() {
    let mut machine = two_trainer_machine();
    let sim = Scripted::new(vec![
        report(true, &[true, false, true]),
        report(false, &[false, false]),
    ]);
    let mut paid = Decimal::ZERO;

    let first = machine
        .step(fight(&[1, 2, 3], &[dec!(0.2), dec!(0.5), dec!(0.8)]), &sim)
        .unwrap();
    paid += first.reward;
    let rejected = machine.step(fight(&[2], &[dec!(0)]), &sim).unwrap();
    paid += rejected.reward;
    let last = machine
        .step(fight(&[1, 3], &[dec!(0); 2]), &sim)
        .unwrap();
    paid += last.reward;
    paid += last.terminal_reward.unwrap();

    assert_eq!(machine.ledger().verify().unwrap(), paid);
    assert_eq!(machine.ledger().total(), paid);
}

#[test]
fn simulator_failure_aborts_without_applying_the_battle() {
    let mut machine = two_trainer_machine();

    let err = machine
        .step(fight(&[1, 2, 3], &[dec!(0.3); 3]), &Broken)
        .unwrap_err();

    assert!(matches!(err, StepError::Simulator { .. }));
    assert_eq!(machine.outcome(), Some(EpisodeOutcome::Aborted));
    assert!(machine.is_done());
    assert_eq!(machine.trainer_idx(), 0);
    assert_eq!(machine.roster().alive_count(), 3);
    assert!(machine.ledger().terminal().is_none());
}

#[test]
fn misaligned_mask_is_fatal_and_applies_nothing() {
    let mut machine = two_trainer_machine();
    let sim = Scripted::new(vec![report(true, &[true, false])]);

    let err = machine
        .step(fight(&[1, 2, 3], &[dec!(0.3); 3]), &sim)
        .unwrap_err();

    assert!(matches!(err, StepError::OrderingMismatch { .. }));
    assert_eq!(machine.roster().alive_count(), 3);
    assert_eq!(machine.trainer_idx(), 0);
    assert!(machine.battle_in_flight());
}

#[test]
fn abandoning_leaves_no_terminal_reward() {
    let mut machine = two_trainer_machine();
    let outcome = machine.abandon("operator stop");
    assert!(outcome.done);
    assert!(outcome.terminal_reward.is_none());
    assert_eq!(outcome.info.outcome, Some(EpisodeOutcome::Aborted));
    assert_eq!(machine.phase(), Phase::Done);
}

#[test]
fn abandoning_a_submitted_battle_restores_the_party() {
    let mut machine = two_trainer_machine();
    let submitted = machine.submit(fight(&[2, 1], &[dec!(0.3); 2])).unwrap();
    assert!(matches!(submitted, Submission::Battle(_)));
    assert_eq!(machine.roster().party(), &[MonId(2), MonId(1)]);

    machine.abandon("simulator timed out");

    assert!(!machine.battle_in_flight());
    assert_eq!(machine.roster().party(), &[MonId(1), MonId(2), MonId(3)]);
    assert!(machine.roster().partition_holds());
}

#[test]
fn simulator_failure_restores_the_party() {
    let mut machine = two_trainer_machine();
    machine
        .step(fight(&[3], &[dec!(0.3)]), &Broken)
        .unwrap_err();

    assert_eq!(machine.roster().party(), &[MonId(1), MonId(2), MonId(3)]);
    assert!(machine.roster().box_ids().is_empty());
}

#[test]
fn same_seed_same_episode_id() {
    let a = two_trainer_machine();
    let b = two_trainer_machine();
    assert_eq!(a.episode_id(), b.episode_id());

    let spec = gauntlet(vec![trainer("Brock", Vec::new())], Vec::new());
    let other = GauntletStateMachine::with_spec(settings(12), spec, &starters(), 8).unwrap();
    assert_ne!(a.episode_id(), other.episode_id());
}
