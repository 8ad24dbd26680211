//! Mean-reversion decision unit (rolling z-score).

use std::collections::{BTreeMap, VecDeque};

use crate::domain::bar::Bar;
use crate::domain::position::Position;
use crate::domain::unit::{DecisionUnit, MarketContext, UnitError};
use crate::domain::vote::{TradeAction, Vote};

/// Votes BUY when price is stretched below its rolling mean and SELL when
/// stretched above, measured in standard deviations.
pub struct MeanReversion {
    id: String,
    weight: f64,
    lookback: usize,
    entry_z: f64,
    history: BTreeMap<String, VecDeque<f64>>,
}

impl MeanReversion {
    pub fn new(lookback: usize, entry_z: f64, weight: f64) -> Self {
        MeanReversion {
            id: format!("reversion-{lookback}"),
            weight,
            lookback,
            entry_z,
            history: BTreeMap::new(),
        }
    }
}

impl DecisionUnit for MeanReversion {
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
        if self.lookback < 2 {
            return Err(UnitError::new(&self.id, "lookback must be at least 2"));
        }
        if self.entry_z <= 0.0 {
            return Err(UnitError::new(&self.id, "entry_z must be positive"));
        }

        let window = self.history.entry(observation.instrument.clone()).or_default();
        window.push_back(observation.close);
        while window.len() > self.lookback {
            window.pop_front();
        }

        if window.len() < self.lookback {
            return Ok(Vote::hold(
                &self.id,
                0.1,
                format!("warming up ({}/{})", window.len(), self.lookback),
            ));
        }

        let n = window.len() as f64;
        let mean = window.iter().sum::<f64>() / n;
        let variance = window.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
        let stddev = variance.sqrt();

        if stddev <= f64::EPSILON {
            return Ok(Vote::hold(&self.id, 0.2, "flat window, no dispersion"));
        }

        let z = (observation.close - mean) / stddev;
        let confidence = (z.abs() / (self.entry_z * 2.0)).clamp(0.0, 1.0);

        if z <= -self.entry_z && position.is_none() {
            Ok(Vote::new(
                &self.id,
                TradeAction::Buy,
                confidence,
                context.proposed_size,
                format!("z-score {z:.2} below -{:.2}", self.entry_z),
            ))
        } else if z >= self.entry_z && position.is_some() {
            Ok(Vote::new(
                &self.id,
                TradeAction::Sell,
                confidence,
                position.map(|p| p.size).unwrap_or(0.0),
                format!("z-score {z:.2} above {:.2}", self.entry_z),
            ))
        } else {
            Ok(Vote::hold(&self.id, 0.3, format!("z-score {z:.2} inside band")))
        }
    }
}
