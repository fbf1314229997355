//! Reward aggregation for both decision layers.
//!
//! The strategic layer is paid once per resolved pre-battle step:
//!
//! ```text
//! reward = progress * [win]
//!        + sum(item values obtained on win)
//!        - sum(death_cost(risk_i) for each fainted slot i)
//!        - turn_limit_penalty * [turn cap hit]
//! ```
//!
//! where `death_cost(r) = max - r * (max - min)`, so a creature flagged as
//! expendable costs less to lose than one the policy meant to protect.
//! Rejections cost a flat penalty. A terminal term (completion bonus or
//! wipe penalty) is reported separately, exactly once per finished
//! episode; aborted episodes get none.
//!
//! The tactical layer gets a win/loss term plus a per-faint cost that uses
//! the same interpolation over its own bounds.
//!
//! Every value is a [`Decimal`] so totals are exact.

use gauntlet_types::{BattleReport, EpisodeOutcome, ItemReward, Rejection, RiskVector};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Reward weights. Mirrors the `rewards` section of `gauntlet-config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Credited when a trainer is defeated (default: 1).
    #[serde(default = "default_progress_reward")]
    pub progress_reward: Decimal,

    /// Death cost for a creature with risk 0 (default: 0.2).
    #[serde(default = "default_death_penalty_max")]
    pub death_penalty_max: Decimal,

    /// Death cost for a creature with risk 1 (default: 0.05).
    #[serde(default = "default_death_penalty_min")]
    pub death_penalty_min: Decimal,

    /// Charged when a battle is cut off by the turn cap (default: 0.5).
    #[serde(default = "default_turn_limit_penalty")]
    pub turn_limit_penalty: Decimal,

    /// Charged for a malformed or out-of-phase action (default: 0.1).
    #[serde(default = "default_invalid_action_penalty")]
    pub invalid_action_penalty: Decimal,

    /// Charged for a catch attempt with a full roster (default: 0.05).
    #[serde(default = "default_capacity_penalty")]
    pub capacity_penalty: Decimal,

    /// Terminal bonus on clearing the gauntlet (default: 10).
    #[serde(default = "default_completion_bonus")]
    pub completion_bonus: Decimal,

    /// Terminal penalty on a wipe, subtracted (default: 5).
    #[serde(default = "default_wipe_penalty")]
    pub wipe_penalty: Decimal,

    /// Tactical-layer weights.
    #[serde(default)]
    pub tactical: TacticalRewardConfig,
}

/// Battle-level reward weights for the tactical layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TacticalRewardConfig {
    /// Credited on a win (default: 1).
    #[serde(default = "default_win_reward")]
    pub win_reward: Decimal,

    /// Subtracted on a loss (default: 1).
    #[serde(default = "default_loss_penalty")]
    pub loss_penalty: Decimal,

    /// Faint cost at risk 0 (default: 0.5).
    #[serde(default = "default_faint_penalty_max")]
    pub faint_penalty_max: Decimal,

    /// Faint cost at risk 1 (default: 0).
    #[serde(default)]
    pub faint_penalty_min: Decimal,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            progress_reward: default_progress_reward(),
            death_penalty_max: default_death_penalty_max(),
            death_penalty_min: default_death_penalty_min(),
            turn_limit_penalty: default_turn_limit_penalty(),
            invalid_action_penalty: default_invalid_action_penalty(),
            capacity_penalty: default_capacity_penalty(),
            completion_bonus: default_completion_bonus(),
            wipe_penalty: default_wipe_penalty(),
            tactical: TacticalRewardConfig::default(),
        }
    }
}

impl Default for TacticalRewardConfig {
    fn default() -> Self {
        Self {
            win_reward: default_win_reward(),
            loss_penalty: default_loss_penalty(),
            faint_penalty_max: default_faint_penalty_max(),
            faint_penalty_min: Decimal::ZERO,
        }
    }
}

fn default_progress_reward() -> Decimal {
    Decimal::ONE
}

fn default_death_penalty_max() -> Decimal {
    Decimal::new(2, 1)
}

fn default_death_penalty_min() -> Decimal {
    Decimal::new(5, 2)
}

fn default_turn_limit_penalty() -> Decimal {
    Decimal::new(5, 1)
}

fn default_invalid_action_penalty() -> Decimal {
    Decimal::new(1, 1)
}

fn default_capacity_penalty() -> Decimal {
    Decimal::new(5, 2)
}

fn default_completion_bonus() -> Decimal {
    Decimal::TEN
}

fn default_wipe_penalty() -> Decimal {
    Decimal::new(5, 0)
}

fn default_win_reward() -> Decimal {
    Decimal::ONE
}

fn default_loss_penalty() -> Decimal {
    Decimal::ONE
}

fn default_faint_penalty_max() -> Decimal {
    Decimal::new(5, 1)
}

impl RewardConfig {
    /// List every rule these weights break. Empty means valid.
    pub fn violations(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let non_negative = [
            ("rewards.progress_reward", self.progress_reward),
            ("rewards.death_penalty_min", self.death_penalty_min),
            ("rewards.turn_limit_penalty", self.turn_limit_penalty),
            ("rewards.invalid_action_penalty", self.invalid_action_penalty),
            ("rewards.capacity_penalty", self.capacity_penalty),
            ("rewards.completion_bonus", self.completion_bonus),
            ("rewards.wipe_penalty", self.wipe_penalty),
            ("rewards.tactical.faint_penalty_min", self.tactical.faint_penalty_min),
        ];
        for (name, value) in non_negative {
            if value.is_sign_negative() && !value.is_zero() {
                problems.push(format!("{name} must not be negative, got {value}"));
            }
        }
        if self.death_penalty_min > self.death_penalty_max {
            problems.push(format!(
                "rewards.death_penalty_min ({}) exceeds rewards.death_penalty_max ({})",
                self.death_penalty_min, self.death_penalty_max
            ));
        }
        if self.tactical.faint_penalty_min > self.tactical.faint_penalty_max {
            problems.push(format!(
                "rewards.tactical.faint_penalty_min ({}) exceeds rewards.tactical.faint_penalty_max ({})",
                self.tactical.faint_penalty_min, self.tactical.faint_penalty_max
            ));
        }
        problems
    }

    /// Strategic cost of losing a creature that carried `risk`.
    ///
    /// Linear from `death_penalty_max` at risk 0 down to
    /// `death_penalty_min` at risk 1.
    pub fn death_cost(&self, risk: Decimal) -> Decimal {
        interpolate(self.death_penalty_max, self.death_penalty_min, risk)
    }

    /// Strategic reward for one resolved battle.
    ///
    /// `items` are the rewards handed out for the defeated trainer; they
    /// only count on a win.
    pub fn battle_reward(
        &self,
        report: &BattleReport,
        risk: &RiskVector,
        items: &[ItemReward],
    ) -> BattleRewardBreakdown {
        let progress = if report.win {
            self.progress_reward
        } else {
            Decimal::ZERO
        };
        let item_value = if report.win {
            items.iter().map(|i| i.value).sum()
        } else {
            Decimal::ZERO
        };
        let death_cost = fainted_risks(report, risk)
            .map(|r| self.death_cost(r))
            .sum();
        let turn_limit = if report.turn_cap_hit {
            self.turn_limit_penalty
        } else {
            Decimal::ZERO
        };
        BattleRewardBreakdown {
            progress,
            item_value,
            death_cost,
            turn_limit,
        }
    }

    /// Penalty for a rejected action, as a negative reward.
    pub fn rejection_reward(&self, rejection: Rejection) -> Decimal {
        match rejection {
            Rejection::InvalidAction(_) => negate(self.invalid_action_penalty),
            Rejection::CapacityExceeded => negate(self.capacity_penalty),
        }
    }

    /// Terminal term for a finished episode. Aborted episodes get none.
    pub fn terminal_reward(&self, outcome: EpisodeOutcome) -> Option<Decimal> {
        match outcome {
            EpisodeOutcome::Cleared => Some(self.completion_bonus),
            EpisodeOutcome::Wipe => Some(negate(self.wipe_penalty)),
            EpisodeOutcome::Aborted => None,
        }
    }

    /// Battle-level reward for the tactical layer.
    pub fn tactical_reward(&self, report: &BattleReport, risk: &RiskVector) -> Decimal {
        let t = &self.tactical;
        let outcome = if report.win {
            t.win_reward
        } else {
            negate(t.loss_penalty)
        };
        let faints: Decimal = fainted_risks(report, risk)
            .map(|r| interpolate(t.faint_penalty_max, t.faint_penalty_min, r))
            .sum();
        outcome.saturating_sub(faints)
    }
}

/// `high - r * (high - low)`.
fn interpolate(high: Decimal, low: Decimal, risk: Decimal) -> Decimal {
    high.saturating_sub(risk.saturating_mul(high.saturating_sub(low)))
}

fn negate(value: Decimal) -> Decimal {
    Decimal::ZERO.saturating_sub(value)
}

/// Risk values of the slots that fainted. A slot with no risk entry counts
/// as fully protected.
fn fainted_risks<'a>(
    report: &'a BattleReport,
    risk: &'a RiskVector,
) -> impl Iterator<Item = Decimal> + 'a {
    report
        .survived
        .iter()
        .enumerate()
        .filter(|(_, alive)| !**alive)
        .map(|(slot, _)| risk.get(slot).unwrap_or(Decimal::ZERO))
}

/// The terms of one battle's strategic reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BattleRewardBreakdown {
    /// Progress credit (zero on a loss).
    pub progress: Decimal,
    /// Sum of item values obtained (zero on a loss).
    pub item_value: Decimal,
    /// Sum of death costs. Subtracted.
    pub death_cost: Decimal,
    /// Turn-cap penalty. Subtracted.
    pub turn_limit: Decimal,
}

impl BattleRewardBreakdown {
    /// Net reward.
    pub fn total(&self) -> Decimal {
        self.progress
            .saturating_add(self.item_value)
            .saturating_sub(self.death_cost)
            .saturating_sub(self.turn_limit)
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Errors raised by the reward ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// A second terminal term was recorded.
    #[error("terminal reward already recorded ({existing})")]
    TerminalAlreadyRecorded {
        /// The term recorded first.
        existing: Decimal,
    },

    /// The running total drifted from the recorded entries.
    #[error("reward total {total} does not match steps {steps} plus terminal {terminal}")]
    Imbalance {
        /// Running total.
        total: Decimal,
        /// Sum of step rewards.
        steps: Decimal,
        /// Terminal term, zero if none.
        terminal: Decimal,
    },
}

/// Per-episode record of every reward paid out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardLedger {
    steps: Vec<Decimal>,
    terminal: Option<Decimal>,
    total: Decimal,
}

impl RewardLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one step reward.
    pub fn record_step(&mut self, reward: Decimal) {
        self.steps.push(reward);
        self.total = self.total.saturating_add(reward);
    }

    /// Record the terminal term.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::TerminalAlreadyRecorded`] on a second call.
    pub fn record_terminal(&mut self, reward: Decimal) -> Result<(), LedgerError> {
        if let Some(existing) = self.terminal {
            return Err(LedgerError::TerminalAlreadyRecorded { existing });
        }
        self.terminal = Some(reward);
        self.total = self.total.saturating_add(reward);
        Ok(())
    }

    /// Step rewards in order.
    pub fn steps(&self) -> &[Decimal] {
        &self.steps
    }

    /// The terminal term, if recorded.
    pub const fn terminal(&self) -> Option<Decimal> {
        self.terminal
    }

    /// Running total.
    pub const fn total(&self) -> Decimal {
        self.total
    }

    /// Check that the running total equals the sum of the steps plus the
    /// terminal term, and return it.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Imbalance`] on a mismatch.
    pub fn verify(&self) -> Result<Decimal, LedgerError> {
        let steps: Decimal = self.steps.iter().copied().sum();
        let terminal = self.terminal.unwrap_or(Decimal::ZERO);
        if steps.saturating_add(terminal) == self.total {
            Ok(self.total)
        } else {
            Err(LedgerError::Imbalance {
                total: self.total,
                steps,
                terminal,
            })
        }
    }
}
