//! Trend-following decision unit (moving-average crossover).

use std::collections::{BTreeMap, VecDeque};

use crate::domain::bar::Bar;
use crate::domain::position::Position;
use crate::domain::unit::{DecisionUnit, MarketContext, UnitError};
use crate::domain::vote::{TradeAction, Vote};

/// Votes BUY when the fast moving average is above the slow one, SELL when
/// below. Confidence scales with the relative gap between the averages.
/// Maintains a bounded close-price history per instrument.
pub struct TrendFollower {
    id: String,
    weight: f64,
    fast_period: usize,
    slow_period: usize,
    history: BTreeMap<String, VecDeque<f64>>,
}

impl TrendFollower {
    pub fn new(fast_period: usize, slow_period: usize, weight: f64) -> Self {
        TrendFollower {
            id: format!("trend-{fast_period}-{slow_period}"),
            weight,
            fast_period,
            slow_period,
            history: BTreeMap::new(),
        }
    }

    fn sma(window: &VecDeque<f64>, period: usize) -> f64 {
        window.iter().rev().take(period).sum::<f64>() / period as f64
    }
}

impl DecisionUnit for TrendFollower {
    fn id(&self) -> &str {
        &self.id
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn evaluate(
        &mut self,
        observation: &Bar,
        position: Option<&Position>,
        context: &MarketContext,
    ) -> Result<Vote, UnitError> {
        if self.fast_period == 0 || self.fast_period >= self.slow_period {
            return Err(UnitError::new(
                &self.id,
                format!(
                    "invalid periods: fast {} must be in 1..slow {}",
                    self.fast_period, self.slow_period
                ),
            ));
        }

        let window = self.history.entry(observation.instrument.clone()).or_default();
        window.push_back(observation.close);
        while window.len() > self.slow_period {
            window.pop_front();
        }

        if window.len() < self.slow_period {
            return Ok(Vote::hold(
                &self.id,
                0.1,
                format!("warming up ({}/{})", window.len(), self.slow_period),
            ));
        }

        let fast = Self::sma(window, self.fast_period);
        let slow = Self::sma(window, self.slow_period);
        let gap = if slow.abs() > f64::EPSILON {
            (fast - slow) / slow
        } else {
            0.0
        };

        // 1% gap between the averages maps to full confidence.
        let confidence = (gap.abs() * 100.0).clamp(0.0, 1.0);

        if gap > 0.0 && position.is_none() {
            Ok(Vote::new(
                &self.id,
                TradeAction::Buy,
                confidence,
                context.proposed_size,
                format!("fast SMA {fast:.4} above slow {slow:.4}"),
            ))
        } else if gap < 0.0 && position.is_some() {
            Ok(Vote::new(
                &self.id,
                TradeAction::Sell,
                confidence,
                position.map(|p| p.size).unwrap_or(0.0),
                format!("fast SMA {fast:.4} below slow {slow:.4}"),
            ))
        } else {
            Ok(Vote::hold(&self.id, 0.3, "no crossover edge"))
        }
    }
}
