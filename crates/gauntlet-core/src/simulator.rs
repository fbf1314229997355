//! Battle simulator contract, heuristic backend, and backend pool.
//!
//! The engine never resolves combat itself. It hands a [`BattleRequest`]
//! to a [`BattleSimulator`] and gets back a [`BattleReport`] whose survival
//! mask is aligned to the submitted party order. Simulators are stateless
//! per call: everything they need is in the request, including the seed.
//!
//! [`SimulatorPool`] arbitrates a fixed set of backends between concurrent
//! episodes. A [`SimulatorLease`] is held for exactly one call and hands
//! its backend back to the pool when dropped, even if the episode that
//! asked for it has already given up.

use std::sync::{Arc, Mutex, PoisonError};

use gauntlet_types::{BattleReport, BattleRequest};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::encounter::uniform_roll;

/// Errors a simulator call can end with. Either one voids the episode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulatorError {
    /// The backend could not be reached or failed internally.
    #[error("simulator unavailable: {reason}")]
    Unavailable {
        /// What went wrong.
        reason: String,
    },

    /// The call did not finish within the deadline.
    #[error("simulator timed out after {timeout_ms}ms")]
    Timeout {
        /// The deadline in milliseconds.
        timeout_ms: u64,
    },
}

/// A battle resolution backend.
///
/// Implementations must not keep state between calls; two calls with the
/// same request must be interchangeable.
pub trait BattleSimulator: Send + Sync {
    /// Resolve one battle.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError`] if the backend cannot produce a result.
    fn simulate(&self, request: &BattleRequest) -> Result<BattleReport, SimulatorError>;
}

// ---------------------------------------------------------------------------
// Heuristic backend
// ---------------------------------------------------------------------------

/// Level-power battle heuristic for training without a real backend.
///
/// The win probability is the party's share of total levels, pulled toward
/// one half as the mean risk rises: a reckless party gambles. Each slot then
/// survives with a probability that depends on the outcome and drops with
/// the slot's own risk. Battle length grows with the opponent's team size,
/// and a battle that runs past the turn cap counts as a loss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeuristicSimulator {
    /// Survival chance of a risk-0 slot after a win (default: 0.9).
    pub win_survival: Decimal,
    /// Survival chance of a risk-0 slot after a loss (default: 0.3).
    pub loss_survival: Decimal,
    /// How much full risk lowers a slot's survival chance (default: 0.2).
    pub risk_survival_drop: Decimal,
    /// Fewest turns per opposing creature (default: 2).
    pub min_turns_per_opponent: u32,
    /// Most turns per opposing creature (default: 6).
    pub max_turns_per_opponent: u32,
}

impl Default for HeuristicSimulator {
    fn default() -> Self {
        Self {
            win_survival: Decimal::new(9, 1),
            loss_survival: Decimal::new(3, 1),
            risk_survival_drop: Decimal::new(2, 1),
            min_turns_per_opponent: 2,
            max_turns_per_opponent: 6,
        }
    }
}

impl HeuristicSimulator {
    /// Win probability before the coin flip.
    pub fn win_probability(&self, request: &BattleRequest) -> Decimal {
        let own: u64 = request.party.iter().map(|m| u64::from(m.level)).sum();
        let theirs: u64 = request.opponent.team.iter().map(|m| u64::from(m.level)).sum();
        let total = own.saturating_add(theirs);
        let base = if total == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(own)
                .checked_div(Decimal::from(total))
                .unwrap_or(Decimal::ZERO)
        };
        let half = Decimal::new(5, 1);
        let pull = request.risk.mean().saturating_mul(half.saturating_sub(base));
        base.saturating_add(pull)
    }

    fn survival_probability(&self, win: bool, risk: Decimal) -> Decimal {
        let base = if win {
            self.win_survival
        } else {
            self.loss_survival
        };
        base.saturating_sub(risk.saturating_mul(self.risk_survival_drop))
            .max(Decimal::ZERO)
    }
}

impl BattleSimulator for HeuristicSimulator {
    fn simulate(&self, request: &BattleRequest) -> Result<BattleReport, SimulatorError> {
        let mut rng = StdRng::seed_from_u64(request.seed);
        if request.party.is_empty() {
            return Err(SimulatorError::Unavailable {
                reason: String::from("empty party"),
            });
        }

        let mut win = uniform_roll(&mut rng) < self.win_probability(request);

        let opponents = u32::try_from(request.opponent.team.len()).unwrap_or(u32::MAX);
        let low = opponents.saturating_mul(self.min_turns_per_opponent).max(1);
        let high = opponents.saturating_mul(self.max_turns_per_opponent).max(low);
        let mut turns_taken = rng.random_range(low..=high);
        let turn_cap_hit = turns_taken > request.turn_cap;
        if turn_cap_hit {
            turns_taken = request.turn_cap;
            win = false;
        }

        let survived = (0..request.party.len())
            .map(|slot| {
                let risk = request.risk.get(slot).unwrap_or(Decimal::ZERO);
                uniform_roll(&mut rng) < self.survival_probability(win, risk)
            })
            .collect();

        debug!(
            episode = %request.episode_id,
            trainer = request.trainer_index,
            win,
            turns_taken,
            turn_cap_hit,
            "heuristic battle resolved"
        );
        Ok(BattleReport {
            win,
            survived,
            turns_taken,
            turn_cap_hit,
        })
    }
}

// ---------------------------------------------------------------------------
// Backend pool
// ---------------------------------------------------------------------------

struct PoolInner {
    free: Mutex<Vec<Arc<dyn BattleSimulator>>>,
    permits: Arc<Semaphore>,
    size: usize,
}

impl core::fmt::Debug for PoolInner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PoolInner")
            .field("size", &self.size)
            .field("available", &self.permits.available_permits())
            .finish_non_exhaustive()
    }
}

/// A fixed set of simulator backends shared by concurrent episodes.
///
/// Cloning the pool is cheap; clones share the same backends.
#[derive(Debug, Clone)]
pub struct SimulatorPool {
    inner: Arc<PoolInner>,
}

impl SimulatorPool {
    /// Build a pool over `backends`.
    pub fn new(backends: Vec<Arc<dyn BattleSimulator>>) -> Self {
        let size = backends.len();
        Self {
            inner: Arc::new(PoolInner {
                free: Mutex::new(backends),
                permits: Arc::new(Semaphore::new(size)),
                size,
            }),
        }
    }

    /// A pool of `count` default heuristic simulators.
    pub fn heuristic(count: usize) -> Self {
        let backends = (0..count)
            .map(|_| Arc::new(HeuristicSimulator::default()) as Arc<dyn BattleSimulator>)
            .collect();
        Self::new(backends)
    }

    /// Number of backends.
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Backends not currently leased.
    pub fn available(&self) -> usize {
        self.inner.permits.available_permits()
    }

    /// Wait for a free backend.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::Unavailable`] for an empty pool.
    pub async fn acquire(&self) -> Result<SimulatorLease, SimulatorError> {
        if self.inner.size == 0 {
            return Err(SimulatorError::Unavailable {
                reason: String::from("simulator pool has no backends"),
            });
        }
        let permit = Arc::clone(&self.inner.permits)
            .acquire_owned()
            .await
            .map_err(|e| SimulatorError::Unavailable {
                reason: e.to_string(),
            })?;
        let backend = self
            .inner
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .ok_or_else(|| SimulatorError::Unavailable {
                reason: String::from("permit granted but no backend free"),
            })?;
        Ok(SimulatorLease {
            backend: Some(backend),
            pool: Arc::clone(&self.inner),
            _permit: permit,
        })
    }
}

/// Exclusive use of one backend for one call.
///
/// The backend goes back to the pool before the permit is released, so a
/// waiter woken by the permit always finds a backend.
pub struct SimulatorLease {
    backend: Option<Arc<dyn BattleSimulator>>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl core::fmt::Debug for SimulatorLease {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimulatorLease")
            .field("held", &self.backend.is_some())
            .finish_non_exhaustive()
    }
}

impl SimulatorLease {
    /// Run one battle on the leased backend.
    ///
    /// # Errors
    ///
    /// Propagates the backend's [`SimulatorError`].
    pub fn simulate(&self, request: &BattleRequest) -> Result<BattleReport, SimulatorError> {
        match &self.backend {
            Some(backend) => backend.simulate(request),
            None => Err(SimulatorError::Unavailable {
                reason: String::from("lease already returned"),
            }),
        }
    }
}

impl Drop for SimulatorLease {
    fn drop(&mut self) {
        if let Some(backend) = self.backend.take() {
            self.pool
                .free
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(backend);
        }
    }
}
