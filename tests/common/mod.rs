//! Shared helpers for integration tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use quorumtrader::domain::bar::{Bar, InstrumentSeries};
use quorumtrader::domain::config::SimulationConfig;
use quorumtrader::domain::position::Position;
use quorumtrader::domain::unit::{DecisionUnit, MarketContext, UnitError};
use quorumtrader::domain::vote::{TradeAction, Vote};

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn bars(instrument: &str, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            instrument: instrument.to_string(),
            timestamp: start_time() + Duration::minutes(i as i64),
            open: close,
            high: close * 1.001,
            low: close * 0.999,
            close,
            volume: 1_000.0,
            bid: None,
            ask: None,
        })
        .collect()
}

pub fn series(instrument: &str, closes: &[f64]) -> InstrumentSeries {
    let mut map = InstrumentSeries::new();
    map.insert(instrument.to_string(), bars(instrument, closes));
    map
}

pub fn sim_config(instruments: Vec<String>) -> SimulationConfig {
    SimulationConfig {
        start: start_time(),
        end: Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap(),
        initial_capital: 100_000.0,
        instruments,
        bar_interval: Duration::minutes(1),
        commission_rate: 0.001,
        slippage_rate: 0.0005,
        max_concurrent_positions: 3,
        position_fraction: 0.25,
    }
}

/// Casts one scripted vote per tick, neutral HOLD once the script runs out.
pub struct ScriptedUnit {
    id: String,
    weight: f64,
    votes: Vec<Vote>,
    tick: usize,
}

impl ScriptedUnit {
    pub fn new(id: &str, weight: f64, votes: Vec<Vote>) -> Self {
        ScriptedUnit {
            id: id.to_string(),
            weight,
            votes,
            tick: 0,
        }
    }

    /// Script that buys on one tick and sells on another, holding otherwise.
    pub fn buy_then_sell(buy_tick: usize, sell_tick: usize, size: f64, ticks: usize) -> Self {
        let votes = (0..ticks)
            .map(|t| {
                if t == buy_tick {
                    Vote::new("scripted", TradeAction::Buy, 0.9, size, "scripted entry")
                } else if t == sell_tick {
                    Vote::new("scripted", TradeAction::Sell, 0.9, size, "scripted exit")
                } else {
                    Vote::hold("scripted", 0.5, "waiting")
                }
            })
            .collect();
        ScriptedUnit::new("scripted", 1.0, votes)
    }
}

impl DecisionUnit for ScriptedUnit {
    fn id(&self) -> &str {
        &self.id
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn evaluate(
        &mut self,
        _observation: &Bar,
        _position: Option<&Position>,
        _context: &MarketContext,
    ) -> Result<Vote, UnitError> {
        let vote = self
            .votes
            .get(self.tick)
            .cloned()
            .unwrap_or_else(|| Vote::hold(&self.id, 0.5, "script exhausted"));
        self.tick += 1;
        Ok(vote)
    }
}
