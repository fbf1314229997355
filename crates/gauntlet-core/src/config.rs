//! Configuration loading and typed config structures for the gauntlet engine.
//!
//! The canonical configuration lives in `gauntlet-config.yaml` at the project
//! root. It carries the weighted gauntlet catalog, the starter pool, roster
//! caps, reward weights, encounter rules, and engine settings. The loader
//! validates everything up front and reports every problem it finds in one
//! [`ConfigError::Malformed`].

use std::collections::BTreeSet;
use std::path::Path;

use gauntlet_roster::RosterConfig;
use gauntlet_types::{CreatureBlueprint, GauntletSpec};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::reward::RewardConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The document parsed but breaks one or more rules.
    #[error("malformed gauntlet configuration: {}", .violations.join("; "))]
    Malformed {
        /// Every rule violation found.
        violations: Vec<String>,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Largest tolerated deviation of a route's probability sum from 1.
const PROBABILITY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 4);

/// Top-level engine configuration. Mirrors `gauntlet-config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GauntletConfig {
    /// Weighted gauntlet catalog. One entry is sampled per episode.
    pub gauntlets: Vec<CatalogEntry>,

    /// Starting party.
    pub starters: StarterConfig,

    /// Party and roster caps.
    #[serde(default)]
    pub roster: RosterConfig,

    /// Reward weights.
    #[serde(default)]
    pub rewards: RewardConfig,

    /// Route encounter rules.
    #[serde(default)]
    pub encounters: EncounterConfig,

    /// Batch and backend settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One gauntlet in the catalog with its sampling weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Relative sampling weight (default: 1).
    #[serde(default = "default_weight")]
    pub weight: u32,

    /// The gauntlet definition.
    #[serde(flatten)]
    pub spec: GauntletSpec,
}

/// How the starting party is built.
///
/// The party is every `fixed` blueprint followed by one blueprint from
/// `choices`, if any are listed. The choice is `pick` when set, otherwise a
/// seeded draw.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarterConfig {
    /// Starters every run begins with.
    #[serde(default)]
    pub fixed: Vec<CreatureBlueprint>,

    /// Starter options; one joins the party.
    #[serde(default)]
    pub choices: Vec<CreatureBlueprint>,

    /// Index into `choices` to always use.
    #[serde(default)]
    pub pick: Option<usize>,
}

impl StarterConfig {
    /// Size of the starting party.
    pub fn party_size(&self) -> usize {
        let chosen = usize::from(!self.choices.is_empty());
        self.fixed.len().saturating_add(chosen)
    }
}

/// Route encounter rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterConfig {
    /// Reroll species the run already owned (default: true).
    #[serde(default = "default_dupes_clause")]
    pub dupes_clause: bool,

    /// Rerolls allowed before the unlock yields nothing (default: 10).
    #[serde(default = "default_max_rerolls")]
    pub max_rerolls: u32,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            dupes_clause: default_dupes_clause(),
            max_rerolls: default_max_rerolls(),
        }
    }
}

/// Batch and simulator backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Episodes to run in a batch (default: 16).
    #[serde(default = "default_episodes")]
    pub episodes: u32,

    /// Episodes allowed to run at once (default: 4).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Simulator backends in the pool (default: 4).
    #[serde(default = "default_simulator_backends")]
    pub simulator_backends: usize,

    /// Per-battle simulator deadline in milliseconds (default: 5000).
    #[serde(default = "default_simulator_timeout_ms")]
    pub simulator_timeout_ms: u64,

    /// Turn cap handed to the simulator (default: 100).
    #[serde(default = "default_turn_cap")]
    pub turn_cap: u32,

    /// Steps after which a stalled episode is aborted (default: 10000).
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,

    /// Base seed. Episode `i` uses `seed + i` (default: 42).
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Uniform risk the scripted policy assigns (default: 0.3).
    #[serde(default = "default_scripted_risk")]
    pub scripted_risk: Decimal,

    /// Hall-of-fame database URL. `DATABASE_URL` overrides it.
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            episodes: default_episodes(),
            concurrency: default_concurrency(),
            simulator_backends: default_simulator_backends(),
            simulator_timeout_ms: default_simulator_timeout_ms(),
            turn_cap: default_turn_cap(),
            max_steps: default_max_steps(),
            seed: default_seed(),
            scripted_risk: default_scripted_risk(),
            database_url: default_database_url(),
        }
    }
}

impl EngineConfig {
    /// Override the database URL from the environment when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DATABASE_URL") {
            self.database_url = val;
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

const fn default_weight() -> u32 {
    1
}

const fn default_dupes_clause() -> bool {
    true
}

const fn default_max_rerolls() -> u32 {
    10
}

const fn default_episodes() -> u32 {
    16
}

const fn default_concurrency() -> usize {
    4
}

const fn default_simulator_backends() -> usize {
    4
}

const fn default_simulator_timeout_ms() -> u64 {
    5_000
}

const fn default_turn_cap() -> u32 {
    100
}

const fn default_max_steps() -> u64 {
    10_000
}

const fn default_seed() -> u64 {
    42
}

fn default_scripted_risk() -> Decimal {
    Decimal::new(3, 1)
}

fn default_database_url() -> String {
    String::from("sqlite://gauntlet-hall-of-fame.db?mode=rwc")
}

fn default_log_level() -> String {
    String::from("info")
}

impl GauntletConfig {
    /// Load configuration from a YAML file, apply environment overrides,
    /// and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, the YAML is
    /// invalid, or the content breaks a rule.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, apply environment
    /// overrides, and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the YAML is invalid or the content breaks
    /// a rule.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.engine.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check every rule and report all violations together.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Malformed`] listing each problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let violations = self.violations();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Malformed { violations })
        }
    }

    /// Every rule this configuration breaks. Empty means valid.
    pub fn violations(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.gauntlets.is_empty() {
            problems.push(String::from("gauntlets: catalog is empty"));
        }
        let mut ids = BTreeSet::new();
        for entry in &self.gauntlets {
            if !ids.insert(entry.spec.id.as_str()) {
                problems.push(format!("gauntlets: duplicate id {}", entry.spec.id));
            }
            if entry.weight == 0 {
                problems.push(format!("gauntlet {}: weight must be positive", entry.spec.id));
            }
            check_gauntlet(&entry.spec, &mut problems);
        }

        let starters = self.starters.party_size();
        if starters == 0 || starters > self.roster.party_cap {
            problems.push(format!(
                "starters: party of {starters} must be within 1..={}",
                self.roster.party_cap
            ));
        }
        if let Some(pick) = self.starters.pick {
            if pick >= self.starters.choices.len() {
                problems.push(format!(
                    "starters.pick {pick} is out of range for {} choices",
                    self.starters.choices.len()
                ));
            }
        }
        for blueprint in self.starters.fixed.iter().chain(&self.starters.choices) {
            check_blueprint("starters", blueprint, &mut problems);
        }

        problems.extend(self.roster.violations());
        problems.extend(self.rewards.violations());

        if self.engine.concurrency == 0 {
            problems.push(String::from("engine.concurrency must be positive"));
        }
        if self.engine.simulator_backends == 0 {
            problems.push(String::from("engine.simulator_backends must be positive"));
        }
        if self.engine.turn_cap == 0 {
            problems.push(String::from("engine.turn_cap must be positive"));
        }
        if self.engine.max_steps == 0 {
            problems.push(String::from("engine.max_steps must be positive"));
        }
        if self.engine.scripted_risk < Decimal::ZERO || self.engine.scripted_risk > Decimal::ONE {
            problems.push(format!(
                "engine.scripted_risk must be within [0, 1], got {}",
                self.engine.scripted_risk
            ));
        }

        problems
    }
}

fn check_gauntlet(spec: &GauntletSpec, problems: &mut Vec<String>) {
    let scope = format!("gauntlet {}", spec.id);
    if spec.is_empty() {
        problems.push(format!("{scope}: no trainers"));
    }
    for trainer in &spec.trainers {
        let trainer_scope = format!("{scope} trainer {}", trainer.name);
        if trainer.team.is_empty() {
            problems.push(format!("{trainer_scope}: empty team"));
        }
        for blueprint in &trainer.team {
            check_blueprint(&trainer_scope, blueprint, problems);
        }
    }

    let mut names = BTreeSet::new();
    for route in &spec.routes {
        let route_scope = format!("{scope} route {}", route.name);
        if !names.insert(route.name.as_str()) {
            problems.push(format!("{scope}: duplicate route name {}", route.name));
        }
        if route.unlocks_after >= spec.len() {
            problems.push(format!(
                "{route_scope}: unlocks_after {} is not a trainer index (gauntlet has {})",
                route.unlocks_after,
                spec.len()
            ));
        }
        if route.encounters.is_empty() {
            problems.push(format!("{route_scope}: empty encounter table"));
        }
        let total: Decimal = route.encounters.iter().map(|s| s.probability).sum();
        if !route.encounters.is_empty() && total.saturating_sub(Decimal::ONE).abs() > PROBABILITY_TOLERANCE {
            problems.push(format!("{route_scope}: probabilities sum to {total}, expected 1"));
        }
        for slot in &route.encounters {
            if slot.probability <= Decimal::ZERO || slot.probability > Decimal::ONE {
                problems.push(format!(
                    "{route_scope}: probability {} for {} is outside (0, 1]",
                    slot.probability, slot.blueprint.species
                ));
            }
            if let Some(levels) = slot.levels {
                if levels.min == 0 || levels.min > levels.max {
                    problems.push(format!(
                        "{route_scope}: level range {}-{} for {} is invalid",
                        levels.min, levels.max, slot.blueprint.species
                    ));
                }
            }
            check_blueprint(&route_scope, &slot.blueprint, problems);
        }
    }
}

fn check_blueprint(scope: &str, blueprint: &CreatureBlueprint, problems: &mut Vec<String>) {
    if blueprint.level == 0 {
        problems.push(format!("{scope}: {} has level 0", blueprint.species));
    }
    if let Err(reason) = gauntlet_roster::moves::validate_moveset(&blueprint.moves) {
        problems.push(format!("{scope}: {}: {reason}", blueprint.species));
    }
    for entry in &blueprint.learnset {
        if entry.move_name.trim().is_empty() {
            problems.push(format!("{scope}: {} has a blank learnset move", blueprint.species));
        }
    }
}
