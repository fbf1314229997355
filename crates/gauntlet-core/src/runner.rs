//! Episode and batch runners.
//!
//! [`run_episode`] drives one [`GauntletStateMachine`] to completion with a
//! [`StrategicPolicy`], leasing a simulator backend from the shared
//! [`SimulatorPool`] for each battle. Each simulator call runs on the
//! blocking pool under a deadline; a timeout or backend failure aborts the
//! episode without applying anything from the battle.
//!
//! [`run_batch`] runs many independent episodes concurrently. Episodes share
//! nothing but the read-only catalog and the simulator pool.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use gauntlet_types::{BattleReport, BattleRequest, EpisodeId, EpisodeOutcome, HallOfFameMember};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, GauntletConfig, StarterConfig};
use crate::gauntlet::GauntletCatalog;
use crate::machine::{EpisodeSettings, GauntletStateMachine, StepError, Submission};
use crate::policy::StrategicPolicy;
use crate::simulator::{SimulatorError, SimulatorPool};

/// Errors that stop a run outright.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A step failed in a way that is not the policy's fault.
    #[error("step error: {source}")]
    Step {
        /// The underlying step error.
        #[from]
        source: StepError,
    },

    /// An episode task panicked or was cancelled.
    #[error("episode task failed: {reason}")]
    Join {
        /// Description of the failure.
        reason: String,
    },
}

/// Limits applied to every episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Deadline for a single simulator call.
    pub simulator_timeout: Duration,
    /// Steps after which an episode is aborted.
    pub max_steps: u64,
}

impl RunnerConfig {
    /// Limits from the engine section of the config.
    pub const fn from_engine(engine: &EngineConfig) -> Self {
        Self {
            simulator_timeout: Duration::from_millis(engine.simulator_timeout_ms),
            max_steps: engine.max_steps,
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::from_engine(&EngineConfig::default())
    }
}

/// How one episode went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    /// Episode identifier.
    pub episode_id: EpisodeId,
    /// Seed the episode was started from.
    pub seed: u64,
    /// Gauntlet that was sampled.
    pub gauntlet_id: String,
    /// How it ended.
    pub outcome: EpisodeOutcome,
    /// Trainers beaten.
    pub trainers_defeated: usize,
    /// Trainers in the gauntlet.
    pub gauntlet_len: usize,
    /// Sum of every reward paid, terminal included.
    pub total_reward: Decimal,
    /// Steps taken.
    pub steps: u64,
    /// Battles resolved.
    pub battles: u32,
    /// Creatures lost in battle.
    pub deaths: u32,
    /// The clearing party, on a cleared run.
    pub winning_party: Option<Vec<HallOfFameMember>>,
}

impl EpisodeSummary {
    /// Summarize a finished machine.
    pub fn from_machine(machine: &GauntletStateMachine, seed: u64) -> Self {
        Self {
            episode_id: machine.episode_id(),
            seed,
            gauntlet_id: machine.spec().id.clone(),
            outcome: machine.outcome().unwrap_or(EpisodeOutcome::Aborted),
            trainers_defeated: machine.trainer_idx(),
            gauntlet_len: machine.spec().len(),
            total_reward: machine.ledger().total(),
            steps: machine.steps(),
            battles: machine.battles(),
            deaths: machine.deaths(),
            winning_party: machine.winning_party().map(<[HallOfFameMember]>::to_vec),
        }
    }
}

/// Run one battle on a leased backend under `timeout`.
///
/// Waiting for a free backend is not counted against the deadline. On
/// timeout the blocking call keeps running; its lease goes back to the pool
/// when it finishes.
///
/// # Errors
///
/// [`SimulatorError::Timeout`] past the deadline, otherwise whatever the
/// pool or backend reports.
pub async fn simulate_with_deadline(
    pool: &SimulatorPool,
    request: BattleRequest,
    timeout: Duration,
) -> Result<BattleReport, SimulatorError> {
    let lease = pool.acquire().await?;
    let call = tokio::task::spawn_blocking(move || lease.simulate(&request));
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(SimulatorError::Unavailable {
            reason: join.to_string(),
        }),
        Err(_elapsed) => Err(SimulatorError::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

/// Drive `machine` to the end of its episode.
///
/// Simulator failures, a policy with nothing to say, and the step limit all
/// abort the episode; they are reported through the summary's outcome, not
/// as errors.
///
/// # Errors
///
/// Returns [`RunnerError::Step`] for failures that indicate a defect, such
/// as a survival mask that does not match the submitted party.
pub async fn run_episode(
    machine: &mut GauntletStateMachine,
    policy: &mut dyn StrategicPolicy,
    pool: &SimulatorPool,
    config: RunnerConfig,
    seed: u64,
) -> Result<EpisodeSummary, RunnerError> {
    while !machine.is_done() {
        if machine.steps() >= config.max_steps {
            machine.abandon("step limit reached");
            break;
        }
        let observation = machine.observation();
        let Some(action) = policy.decide(&observation) else {
            machine.abandon("policy had no action");
            break;
        };
        match machine.submit(action)? {
            Submission::Resolved(outcome) => {
                if let Some(rejection) = outcome.info.rejection {
                    debug!(episode = %machine.episode_id(), ?rejection, "policy action rejected");
                }
            }
            Submission::Battle(request) => {
                match simulate_with_deadline(pool, *request, config.simulator_timeout).await {
                    Ok(report) => {
                        machine.resolve_battle(report)?;
                    }
                    Err(err) => {
                        machine.abandon(&err.to_string());
                    }
                }
            }
        }
    }
    Ok(EpisodeSummary::from_machine(machine, seed))
}

/// Everything an episode task needs, shared across the batch.
#[derive(Debug, Clone)]
struct BatchContext {
    settings: EpisodeSettings,
    catalog: Arc<GauntletCatalog>,
    starters: Arc<StarterConfig>,
    pool: SimulatorPool,
    runner: RunnerConfig,
}

/// Run `config.engine.episodes` episodes, at most `config.engine.concurrency`
/// at a time. Episode `i` is seeded with `config.engine.seed + i`.
///
/// Summaries come back in episode order.
///
/// # Errors
///
/// The first [`RunnerError`] from any episode stops the batch; episodes
/// still running are cancelled.
pub async fn run_batch<F>(
    config: &GauntletConfig,
    pool: SimulatorPool,
    make_policy: F,
) -> Result<Vec<EpisodeSummary>, RunnerError>
where
    F: Fn(usize) -> Box<dyn StrategicPolicy>,
{
    let context = BatchContext {
        settings: EpisodeSettings::from_config(config),
        catalog: Arc::new(GauntletCatalog::new(&config.gauntlets)),
        starters: Arc::new(config.starters.clone()),
        pool,
        runner: RunnerConfig::from_engine(&config.engine),
    };
    let total = usize::try_from(config.engine.episodes).unwrap_or(usize::MAX);
    let concurrency = config.engine.concurrency.max(1);

    info!(
        episodes = total,
        concurrency,
        backends = context.pool.size(),
        "batch starting"
    );

    let mut tasks: JoinSet<(usize, Result<EpisodeSummary, RunnerError>)> = JoinSet::new();
    let mut summaries = BTreeMap::new();
    let mut next = 0_usize;

    while next < total || !tasks.is_empty() {
        while next < total && tasks.len() < concurrency {
            let offset = u64::try_from(next).unwrap_or(u64::MAX);
            let seed = config.engine.seed.wrapping_add(offset);
            let policy = make_policy(next);
            let context = context.clone();
            let index = next;
            tasks.spawn(async move { (index, run_seeded(context, policy, seed).await) });
            next = next.saturating_add(1);
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };
        let (index, result) = joined.map_err(|e| RunnerError::Join {
            reason: e.to_string(),
        })?;
        summaries.insert(index, result?);
    }

    let summaries: Vec<EpisodeSummary> = summaries.into_values().collect();
    let stats = BatchStats::from_summaries(&summaries);
    info!(
        episodes = stats.episodes,
        cleared = stats.cleared,
        wiped = stats.wiped,
        aborted = stats.aborted,
        mean_reward = %stats.mean_reward,
        "batch finished"
    );
    Ok(summaries)
}

async fn run_seeded(
    context: BatchContext,
    mut policy: Box<dyn StrategicPolicy>,
    seed: u64,
) -> Result<EpisodeSummary, RunnerError> {
    let mut machine = GauntletStateMachine::start(
        context.settings,
        &context.catalog,
        &context.starters,
        seed,
    )?;
    let summary = run_episode(
        &mut machine,
        policy.as_mut(),
        &context.pool,
        context.runner,
        seed,
    )
    .await?;
    if summary.outcome == EpisodeOutcome::Aborted {
        warn!(episode = %summary.episode_id, seed, "episode aborted");
    }
    Ok(summary)
}

/// Aggregate counts over a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// Episodes run.
    pub episodes: usize,
    /// Cleared runs.
    pub cleared: usize,
    /// Wiped runs.
    pub wiped: usize,
    /// Aborted runs.
    pub aborted: usize,
    /// Mean total reward per episode.
    pub mean_reward: Decimal,
}

impl BatchStats {
    /// Tally `summaries`.
    pub fn from_summaries(summaries: &[EpisodeSummary]) -> Self {
        let mut stats = Self {
            episodes: summaries.len(),
            ..Self::default()
        };
        let mut total = Decimal::ZERO;
        for summary in summaries {
            match summary.outcome {
                EpisodeOutcome::Cleared => stats.cleared = stats.cleared.saturating_add(1),
                EpisodeOutcome::Wipe => stats.wiped = stats.wiped.saturating_add(1),
                EpisodeOutcome::Aborted => stats.aborted = stats.aborted.saturating_add(1),
            }
            total = total.saturating_add(summary.total_reward);
        }
        stats.mean_reward = total
            .checked_div(Decimal::from(summaries.len()))
            .unwrap_or(Decimal::ZERO);
        stats
    }
}
