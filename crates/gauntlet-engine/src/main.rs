//! Batch runner binary for the Nuzlocke gauntlet engine.
//!
//! Loads the configuration, runs a batch of episodes with the scripted
//! policy against the heuristic simulator pool, and writes every cleared
//! run to the hall of fame.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (first argument, `GAUNTLET_CONFIG`, or
//!    `gauntlet-config.yaml`)
//! 2. Initialize structured logging (tracing)
//! 3. Connect to the hall-of-fame database and run migrations
//! 4. Build the simulator pool
//! 5. Run the batch
//! 6. Record cleared runs in the hall of fame

mod error;

use std::path::{Path, PathBuf};

use anyhow::Context;
use gauntlet_core::config::{GauntletConfig, LoggingConfig};
use gauntlet_core::policy::{ScriptedPolicy, StrategicPolicy};
use gauntlet_core::runner::{self, EpisodeSummary};
use gauntlet_core::simulator::SimulatorPool;
use gauntlet_store::{HallOfFameStore, NewHallOfFameEntry, StorePool};
use gauntlet_types::EpisodeOutcome;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Config file used when neither an argument nor `GAUNTLET_CONFIG` is set.
const DEFAULT_CONFIG_PATH: &str = "gauntlet-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the database cannot be
/// opened, or the batch hits a fatal step error.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = config_path();
    let config =
        load_config(&path).with_context(|| format!("failed to load {}", path.display()))?;

    init_logging(&config.logging);
    info!(
        config = %path.display(),
        gauntlets = config.gauntlets.len(),
        episodes = config.engine.episodes,
        concurrency = config.engine.concurrency,
        seed = config.engine.seed,
        "gauntlet-engine starting"
    );

    run(&config)
        .await
        .inspect_err(|e| error!(error = %e, "batch run failed"))
        .context("batch run failed")?;
    Ok(())
}

fn config_path() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os("GAUNTLET_CONFIG"))
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

fn load_config(path: &Path) -> Result<GauntletConfig, EngineError> {
    Ok(GauntletConfig::from_file(path)?)
}

fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

async fn run(config: &GauntletConfig) -> Result<(), EngineError> {
    let store = StorePool::connect_url(&config.engine.database_url).await?;
    store.run_migrations().await?;

    let pool = SimulatorPool::heuristic(config.engine.simulator_backends);
    info!(backends = pool.size(), "simulator pool ready");

    let risk = config.engine.scripted_risk;
    let party_cap = config.roster.party_cap;
    let summaries = runner::run_batch(config, pool, move |_| {
        Box::new(ScriptedPolicy::new(risk, party_cap)) as Box<dyn StrategicPolicy>
    })
    .await?;

    let recorded = record_cleared(&store, &summaries).await?;
    info!(episodes = summaries.len(), recorded, "cleared runs recorded");

    let hall = HallOfFameStore::new(store.pool());
    for entry in &config.gauntlets {
        let total = hall.count_by_gauntlet(&entry.spec.id).await?;
        info!(gauntlet = %entry.spec.id, hall_of_fame = total, "hall of fame");
    }

    store.close().await;
    Ok(())
}

/// Write every cleared run to the hall of fame. Returns how many were
/// recorded.
async fn record_cleared(
    store: &StorePool,
    summaries: &[EpisodeSummary],
) -> Result<usize, EngineError> {
    let hall = HallOfFameStore::new(store.pool());
    let mut recorded = 0_usize;
    for summary in summaries
        .iter()
        .filter(|s| s.outcome == EpisodeOutcome::Cleared)
    {
        let Some(party) = &summary.winning_party else {
            warn!(episode = %summary.episode_id, "cleared run has no winning party");
            continue;
        };
        hall.record(&NewHallOfFameEntry {
            episode_id: summary.episode_id,
            gauntlet_id: summary.gauntlet_id.clone(),
            seed: summary.seed,
            party: party.clone(),
            total_reward: summary.total_reward,
        })
        .await?;
        recorded = recorded.saturating_add(1);
    }
    Ok(recorded)
}
