//! Open positions and closed-trade records.

use chrono::{DateTime, Utc};

use crate::domain::vote::TradeAction;

/// An open position. At most one per instrument per simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub instrument: String,
    pub size: f64,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    /// Commission paid on entry, folded into the trade's pnl on exit.
    pub entry_commission: f64,
    pub entry_rationale: String,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.size * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.size * (price - self.entry_price)
    }

    /// Entry notional including commission; the basis for pnl_pct.
    pub fn entry_cost(&self) -> f64 {
        self.size * self.entry_price + self.entry_commission
    }
}

/// A closed-position record. Immutable once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub instrument: String,
    pub action: TradeAction,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub pnl: f64,
    /// pnl relative to entry cost (commission included).
    pub pnl_pct: f64,
    pub rationale: String,
}
