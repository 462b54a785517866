//! Game configuration, validation, and error types.
//!
//! [`GameConfig`] is read once at startup and never mutated afterwards.
//! [`validate()`](GameConfig::validate) checks structural invariants;
//! [`Game::start`](crate::game::Game::start) calls it (together with
//! [`check_rules`](GameConfig::check_rules)) before spawning any thread.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use claimset_core::{Combinatorics, Outcome};

// ── AgentKind ──────────────────────────────────────────────────────

/// How an agent chooses the slots it marks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentKind {
    /// Marks slots in response to external toggle requests.
    Human,
    /// Marks randomly chosen slots on its own helper thread.
    Autonomous,
}

// ── TimerMode ──────────────────────────────────────────────────────

/// Round timer behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerMode {
    /// Count down to a reshuffle deadline; flag a warning once the
    /// remaining time is at or below `warning`.
    Countdown {
        /// Time from a deal to the forced reshuffle.
        period: Duration,
        /// Remaining-time threshold for the warning flag.
        warning: Duration,
    },
    /// No deadline; display the time elapsed since the last deal.
    Elapsed,
    /// No deadline and no display updates.
    Disabled,
}

impl TimerMode {
    /// Map the signed-millis convention onto a mode: a positive period
    /// counts down, zero shows elapsed time, negative disables the timer.
    pub fn from_millis(period_ms: i64, warning_ms: i64) -> Self {
        match period_ms {
            p if p > 0 => Self::Countdown {
                period: Duration::from_millis(p as u64),
                warning: Duration::from_millis(warning_ms.max(0) as u64),
            },
            0 => Self::Elapsed,
            _ => Self::Disabled,
        }
    }

    /// Whether rounds end on a deadline.
    pub fn has_deadline(&self) -> bool {
        matches!(self, Self::Countdown { .. })
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`GameConfig::validate()`] and game startup.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The agent roster is empty.
    NoAgents,
    /// More agents than fit in an `AgentId`.
    TooManyAgents {
        /// The configured agent count.
        count: usize,
    },
    /// Markers-per-claim is zero.
    ClaimSizeZero,
    /// The grid has fewer slots than a claim needs.
    GridTooSmall {
        /// Configured slot count.
        slots: u32,
        /// Configured markers-per-claim.
        claim_size: usize,
    },
    /// The pool holds no items.
    EmptyPool,
    /// The arbiter tick is zero.
    TickZero,
    /// The countdown warning threshold exceeds the countdown period.
    WarningExceedsPeriod {
        /// Configured period.
        period: Duration,
        /// Configured warning threshold.
        warning: Duration,
    },
    /// The rules disagree with the configured markers-per-claim.
    ClaimSizeMismatch {
        /// Markers-per-claim from the configuration.
        configured: usize,
        /// Claim size reported by the rules.
        rules: usize,
    },
    /// The pool holds items the rules cannot describe.
    PoolExceedsRules {
        /// Pool size from the configuration.
        configured: u32,
        /// Number of items the rules describe.
        rules: u32,
    },
    /// A background thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of which thread failed.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAgents => write!(f, "at least one agent is required"),
            Self::TooManyAgents { count } => write!(f, "{count} agents exceed u32::MAX"),
            Self::ClaimSizeZero => write!(f, "claim_size must be at least 1"),
            Self::GridTooSmall { slots, claim_size } => {
                write!(f, "grid of {slots} slots cannot hold a claim of {claim_size}")
            }
            Self::EmptyPool => write!(f, "pool_size must be at least 1"),
            Self::TickZero => write!(f, "tick must be non-zero"),
            Self::WarningExceedsPeriod { period, warning } => write!(
                f,
                "countdown warning {}ms exceeds period {}ms",
                warning.as_millis(),
                period.as_millis()
            ),
            Self::ClaimSizeMismatch { configured, rules } => write!(
                f,
                "claim_size {configured} does not match rules claim size {rules}"
            ),
            Self::PoolExceedsRules { configured, rules } => write!(
                f,
                "pool_size {configured} exceeds the {rules} items the rules describe"
            ),
            Self::ThreadSpawnFailed { reason } => write!(f, "thread spawn failed: {reason}"),
        }
    }
}

impl Error for ConfigError {}

// ── GameConfig ─────────────────────────────────────────────────────

/// Complete configuration for one game.
#[derive(Clone, Debug)]
pub struct GameConfig {
    /// Agent roster. `AgentId(n)` is `agents[n]`.
    pub agents: Vec<AgentKind>,
    /// Markers per claim. Must equal the rules' claim size.
    pub claim_size: usize,
    /// Number of distinct items. Items are `0..pool_size`.
    pub pool_size: u32,
    /// Number of grid slots. Slots are `0..grid_slots`.
    pub grid_slots: u32,
    /// Round timer behaviour. Default: 60 s countdown, 5 s warning.
    pub timer: TimerMode,
    /// Freeze after a valid claim. Default: 1 s.
    pub point_freeze: Duration,
    /// Freeze after an invalid claim. Default: 3 s.
    pub penalty_freeze: Duration,
    /// Artificial latency per item placement or removal. Default: 100 ms.
    pub placement_delay: Duration,
    /// Arbiter wake-up period for timer display and replenishment.
    /// Default: 100 ms.
    pub tick: Duration,
    /// In deadline-free timer modes, redeal until the grid holds a valid
    /// claim (or provably cannot). Default: false.
    pub require_claim_on_deal: bool,
    /// Log every valid tuple on the grid after each deal. Default: false.
    pub hints: bool,
    /// Seed for dealing and autonomous slot selection.
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            agents: vec![AgentKind::Human, AgentKind::Human],
            claim_size: 3,
            pool_size: 81,
            grid_slots: 12,
            timer: TimerMode::Countdown {
                period: Duration::from_secs(60),
                warning: Duration::from_secs(5),
            },
            point_freeze: Duration::from_secs(1),
            penalty_freeze: Duration::from_secs(3),
            placement_delay: Duration::from_millis(100),
            tick: Duration::from_millis(100),
            require_claim_on_deal: false,
            hints: false,
            seed: 0,
        }
    }
}

impl GameConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. Roster non-empty and addressable.
        if self.agents.is_empty() {
            return Err(ConfigError::NoAgents);
        }
        if u32::try_from(self.agents.len()).is_err() {
            return Err(ConfigError::TooManyAgents {
                count: self.agents.len(),
            });
        }
        // 2. Claims need markers, and the grid must be able to hold one.
        if self.claim_size == 0 {
            return Err(ConfigError::ClaimSizeZero);
        }
        if (self.grid_slots as usize) < self.claim_size {
            return Err(ConfigError::GridTooSmall {
                slots: self.grid_slots,
                claim_size: self.claim_size,
            });
        }
        // 3. Pool non-empty.
        if self.pool_size == 0 {
            return Err(ConfigError::EmptyPool);
        }
        // 4. A zero tick would spin the arbiter.
        if self.tick.is_zero() {
            return Err(ConfigError::TickZero);
        }
        // 5. Warning threshold within the period.
        if let TimerMode::Countdown { period, warning } = self.timer {
            if warning > period {
                return Err(ConfigError::WarningExceedsPeriod { period, warning });
            }
        }
        Ok(())
    }

    /// Check that `rules` agree with this configuration.
    pub fn check_rules(&self, rules: &dyn Combinatorics) -> Result<(), ConfigError> {
        if rules.claim_size() != self.claim_size {
            return Err(ConfigError::ClaimSizeMismatch {
                configured: self.claim_size,
                rules: rules.claim_size(),
            });
        }
        if let Some(limit) = rules.item_limit() {
            if self.pool_size > limit {
                return Err(ConfigError::PoolExceedsRules {
                    configured: self.pool_size,
                    rules: limit,
                });
            }
        }
        Ok(())
    }

    /// Number of agents.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Freeze duration that follows `outcome`.
    pub fn freeze_for(&self, outcome: Outcome) -> Duration {
        match outcome {
            Outcome::Point => self.point_freeze,
            Outcome::Penalty => self.penalty_freeze,
            Outcome::None => Duration::ZERO,
        }
    }
}
