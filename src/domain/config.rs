//! Simulation parameters.

use chrono::{DateTime, Duration, Utc};

use crate::domain::error::QuorumtraderError;

/// Parameters of one backtest run. Immutable once a simulation starts.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub initial_capital: f64,
    pub instruments: Vec<String>,
    pub bar_interval: Duration,
    pub commission_rate: f64,
    pub slippage_rate: f64,
    pub max_concurrent_positions: usize,
    /// Fraction of current equity proposed to units as the entry size basis.
    pub position_fraction: f64,
}

impl SimulationConfig {
    /// Fail-fast validation before any replay work happens.
    pub fn validate(&self) -> Result<(), QuorumtraderError> {
        if self.initial_capital <= 0.0 {
            return Err(QuorumtraderError::ConfigInvalid {
                section: "simulation".into(),
                key: "initial_capital".into(),
                reason: format!("must be positive, got {}", self.initial_capital),
            });
        }
        if self.end <= self.start {
            return Err(QuorumtraderError::ConfigInvalid {
                section: "simulation".into(),
                key: "end".into(),
                reason: format!("end {} must be after start {}", self.end, self.start),
            });
        }
        if self.max_concurrent_positions < 1 {
            return Err(QuorumtraderError::ConfigInvalid {
                section: "simulation".into(),
                key: "max_concurrent_positions".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.commission_rate < 0.0 || self.slippage_rate < 0.0 {
            return Err(QuorumtraderError::ConfigInvalid {
                section: "simulation".into(),
                key: "commission_rate/slippage_rate".into(),
                reason: "rates must be non-negative".into(),
            });
        }
        if self.position_fraction <= 0.0 || self.position_fraction > 1.0 {
            return Err(QuorumtraderError::ConfigInvalid {
                section: "simulation".into(),
                key: "position_fraction".into(),
                reason: format!("must be in (0, 1], got {}", self.position_fraction),
            });
        }
        Ok(())
    }
}
