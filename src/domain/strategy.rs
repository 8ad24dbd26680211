//! Strategy records, lifecycle and committee blueprints.
//!
//! A `Strategy` is the unit of work the scheduler evaluates: a committee
//! blueprint plus its accumulated evaluation record. Lifecycle moves
//! DISCOVERED -> QUEUED -> RUNNING -> PROMOTED or CULLED; terminal states
//! never change.

use std::fmt;

use crate::domain::committee::Committee;
use crate::domain::metrics::{NO_EVIDENCE_WIN_RATE, SimulationResult};
use crate::domain::unit::DecisionUnit;
use crate::domain::units::{MeanReversion, PassiveObserver, RiskSentinel, TrendFollower};

/// Minimum closed trades before a result counts as evidence.
pub const PROMOTION_MIN_TRADES: usize = 10;
pub const PROMOTION_MIN_WIN_RATE: f64 = 0.5;
pub const PROMOTION_MIN_SHARPE: f64 = 1.0;
/// Weight assigned on cull, sorting culled strategies below every live one.
pub const CULL_WEIGHT: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Discovered,
    Queued,
    Running,
    Promoted,
    Culled,
}

impl LifecycleState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Promoted | LifecycleState::Culled)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Discovered => "DISCOVERED",
            LifecycleState::Queued => "QUEUED",
            LifecycleState::Running => "RUNNING",
            LifecycleState::Promoted => "PROMOTED",
            LifecycleState::Culled => "CULLED",
        };
        f.write_str(s)
    }
}

/// Blueprint for one committee member. Specs are data, not live units, so a
/// strategy can be rebuilt into a fresh committee for every evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitSpec {
    Trend {
        fast: usize,
        slow: usize,
        weight: f64,
    },
    Reversion {
        lookback: usize,
        entry_z: f64,
        weight: f64,
    },
    Risk {
        max_drawdown_pct: f64,
        max_exposure_fraction: f64,
        weight: f64,
    },
    Passive {
        weight: f64,
    },
}

impl UnitSpec {
    fn build(&self) -> Box<dyn DecisionUnit> {
        match *self {
            UnitSpec::Trend { fast, slow, weight } => {
                Box::new(TrendFollower::new(fast, slow, weight))
            }
            UnitSpec::Reversion {
                lookback,
                entry_z,
                weight,
            } => Box::new(MeanReversion::new(lookback, entry_z, weight)),
            UnitSpec::Risk {
                max_drawdown_pct,
                max_exposure_fraction,
                weight,
            } => Box::new(
                RiskSentinel::new(max_drawdown_pct, weight).with_max_exposure(max_exposure_fraction),
            ),
            UnitSpec::Passive { weight } => Box::new(PassiveObserver::new(weight)),
        }
    }

    fn label(&self) -> String {
        match *self {
            UnitSpec::Trend { fast, slow, .. } => format!("trend({fast},{slow})"),
            UnitSpec::Reversion {
                lookback, entry_z, ..
            } => format!("reversion({lookback},{entry_z})"),
            UnitSpec::Risk {
                max_drawdown_pct, ..
            } => format!("risk({max_drawdown_pct})"),
            UnitSpec::Passive { .. } => "passive".to_string(),
        }
    }
}

/// Committee composition for one strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfiguration {
    pub unit_specs: Vec<UnitSpec>,
    pub confidence_threshold: f64,
}

impl AgentConfiguration {
    /// Instantiate fresh units with empty histories.
    pub fn build_committee(&self) -> Committee {
        let units = self.unit_specs.iter().map(UnitSpec::build).collect();
        Committee::new(units, self.confidence_threshold)
    }

    pub fn pattern(&self) -> String {
        self.unit_specs
            .iter()
            .map(UnitSpec::label)
            .collect::<Vec<_>>()
            .join("+")
    }
}

#[derive(Debug, Clone)]
pub struct Strategy {
    pub id: String,
    /// Human-readable summary of the committee composition.
    pub pattern: String,
    pub configuration: AgentConfiguration,
    pub weight: f64,
    pub win_rate: f64,
    pub avg_pnl: f64,
    pub trade_count: usize,
    pub lifecycle_state: LifecycleState,
    /// Ids of the strategies this one was derived from, if any.
    pub parent_ids: Vec<String>,
}

impl Strategy {
    pub fn new(id: impl Into<String>, configuration: AgentConfiguration) -> Self {
        let pattern = configuration.pattern();
        Strategy {
            id: id.into(),
            pattern,
            configuration,
            weight: 0.0,
            win_rate: NO_EVIDENCE_WIN_RATE,
            avg_pnl: 0.0,
            trade_count: 0,
            lifecycle_state: LifecycleState::Discovered,
            parent_ids: Vec::new(),
        }
    }

    pub fn derived_from(mut self, parent_ids: Vec<String>) -> Self {
        self.parent_ids = parent_ids;
        self
    }

    /// DISCOVERED -> QUEUED. Any other starting state is left untouched.
    pub fn mark_queued(&mut self) {
        if self.lifecycle_state == LifecycleState::Discovered {
            self.lifecycle_state = LifecycleState::Queued;
        }
    }

    /// QUEUED -> RUNNING.
    pub fn mark_running(&mut self) {
        if self.lifecycle_state == LifecycleState::Queued {
            self.lifecycle_state = LifecycleState::Running;
        }
    }

    /// Fold one completed simulation into the record and settle the
    /// lifecycle: promoted when the result clears every bar, culled
    /// otherwise.
    pub fn apply_result(&mut self, result: &SimulationResult) {
        if self.lifecycle_state.is_terminal() {
            return;
        }

        self.trade_count = result.trades.len();
        self.win_rate = result.win_rate;
        self.avg_pnl = if result.trades.is_empty() {
            0.0
        } else {
            result.trades.iter().map(|t| t.pnl).sum::<f64>() / result.trades.len() as f64
        };

        let promoted = self.trade_count >= PROMOTION_MIN_TRADES
            && result.win_rate >= PROMOTION_MIN_WIN_RATE
            && result.sharpe_ratio >= PROMOTION_MIN_SHARPE;

        if promoted {
            self.weight = result.sharpe_ratio * result.win_rate;
            self.lifecycle_state = LifecycleState::Promoted;
        } else {
            self.weight = CULL_WEIGHT;
            self.lifecycle_state = LifecycleState::Culled;
        }
    }
}
