//! Portfolio state and equity tracking for one simulation.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::domain::position::{Position, Trade};

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

/// Cash, open positions and the closed-trade log. Positions are keyed by
/// instrument in a `BTreeMap` so force-close order is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: BTreeMap<String, Position>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            positions: BTreeMap::new(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn add_position(&mut self, position: Position) {
        self.positions.insert(position.instrument.clone(), position);
    }

    pub fn position(&self, instrument: &str) -> Option<&Position> {
        self.positions.get(instrument)
    }

    pub fn remove_position(&mut self, instrument: &str) -> Option<Position> {
        self.positions.remove(instrument)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn record_trade(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    pub fn record_equity(&mut self, timestamp: DateTime<Utc>, equity: f64) {
        self.equity_curve.push(EquityPoint { timestamp, equity });
    }

    /// Cash plus positions marked at the supplied last-seen prices.
    pub fn total_equity(&self, last_prices: &BTreeMap<String, f64>) -> f64 {
        let position_value: f64 = self
            .positions
            .values()
            .filter_map(|pos| {
                last_prices
                    .get(&pos.instrument)
                    .map(|&price| pos.market_value(price))
            })
            .sum();
        self.cash + position_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vote::TradeAction;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
    }

    fn sample_position(instrument: &str, size: f64) -> Position {
        Position {
            instrument: instrument.to_string(),
            size,
            entry_price: 100.0,
            entry_time: ts(),
            entry_commission: 0.0,
            entry_rationale: String::new(),
        }
    }

    #[test]
    fn new_portfolio() {
        let p = Portfolio::new(100_000.0);
        assert!((p.cash - 100_000.0).abs() < f64::EPSILON);
        assert!(p.positions.is_empty());
        assert!(p.trades.is_empty());
        assert!(p.equity_curve.is_empty());
    }

    #[test]
    fn add_and_remove_position() {
        let mut p = Portfolio::new(100_000.0);
        p.add_position(sample_position("BTC-USD", 2.0));
        assert_eq!(p.position_count(), 1);
        assert!(p.position("BTC-USD").is_some());

        let removed = p.remove_position("BTC-USD");
        assert!(removed.is_some());
        assert_eq!(p.position_count(), 0);
        assert!(p.remove_position("BTC-USD").is_none());
    }

    #[test]
    fn record_trade_appends() {
        let mut p = Portfolio::new(100_000.0);
        p.record_trade(Trade {
            instrument: "BTC-USD".into(),
            action: TradeAction::Sell,
            entry_price: 100.0,
            exit_price: 110.0,
            size: 1.0,
            entry_time: ts(),
            exit_time: ts(),
            pnl: 10.0,
            pnl_pct: 0.1,
            rationale: String::new(),
        });
        assert_eq!(p.trades.len(), 1);
    }

    #[test]
    fn total_equity_marks_positions() {
        let mut p = Portfolio::new(100_000.0);
        p.add_position(sample_position("BTC-USD", 10.0));
        p.cash = 99_000.0;

        let mut prices = BTreeMap::new();
        prices.insert("BTC-USD".to_string(), 150.0);

        assert!((p.total_equity(&prices) - 100_500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn total_equity_without_positions_is_cash() {
        let p = Portfolio::new(42_000.0);
        assert!((p.total_equity(&BTreeMap::new()) - 42_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn positions_iterate_in_instrument_order() {
        let mut p = Portfolio::new(100_000.0);
        p.add_position(sample_position("ETH-USD", 1.0));
        p.add_position(sample_position("BTC-USD", 1.0));
        let keys: Vec<&String> = p.positions.keys().collect();
        assert_eq!(keys, vec!["BTC-USD", "ETH-USD"]);
    }
}
