//! Decision unit interface.
//!
//! A decision unit is a polymorphic capability with one operation: given a
//! market observation, the position currently held and ambient context,
//! produce a [`Vote`]. Units may keep bounded private rolling state (e.g. a
//! price history) but must never read or write state owned by another unit,
//! the committee, or the simulator.

use crate::domain::bar::Bar;
use crate::domain::position::Position;
use crate::domain::vote::Vote;

/// Ambient context supplied to every unit on every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketContext {
    /// Current account equity (cash + marked positions).
    pub equity: f64,
    /// Current drawdown from the equity peak, in percent.
    pub drawdown_pct: f64,
    /// Size the simulator would allocate if the committee votes to enter.
    pub proposed_size: f64,
    /// Bid/ask spread if the feed quotes both sides.
    pub spread: Option<f64>,
}

/// Error raised by a unit during evaluation. The committee catches these,
/// logs them and excludes the vote for that tick; they are never fatal.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unit {unit}: {reason}")]
pub struct UnitError {
    pub unit: String,
    pub reason: String,
}

impl UnitError {
    pub fn new(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        UnitError {
            unit: unit.into(),
            reason: reason.into(),
        }
    }
}

/// The decision-maker capability. Concrete variants (trend-following,
/// risk-limiting, mean-reversion, ...) are composed into a committee as a
/// list of trait objects; the committee never inspects their internals.
pub trait DecisionUnit: Send {
    fn id(&self) -> &str;

    /// Aggregation weight. A property of the unit, not of any single vote.
    fn weight(&self) -> f64;

    fn evaluate(
        &mut self,
        observation: &Bar,
        position: Option<&Position>,
        context: &MarketContext,
    ) -> Result<Vote, UnitError>;
}
