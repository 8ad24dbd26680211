//! Market observation bars and per-instrument series.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// One price/volume observation for an instrument at a point in time.
///
/// The market-data collaborator guarantees each instrument's bars arrive
/// time-ordered and gap-free at the configured interval; the simulator does
/// not re-validate this.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub instrument: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Best bid/ask if the feed provides them; used only to derive spread.
    pub bid: Option<f64>,
    pub ask: Option<f64>,
}

impl Bar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// ask - bid, when both sides are quoted.
    pub fn spread(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }
}

/// Instrument name → time-ordered bars. A `BTreeMap` keeps iteration order
/// stable, which the simulator's determinism contract relies on.
pub type InstrumentSeries = BTreeMap<String, Vec<Bar>>;
