//! Passive observer unit.

use crate::domain::bar::Bar;
use crate::domain::position::Position;
use crate::domain::unit::{DecisionUnit, MarketContext, UnitError};
use crate::domain::vote::Vote;

/// A unit that chooses never to request action: it casts a neutral HOLD vote
/// on every tick. Kept as a legitimate committee member because the aggregate
/// vote list (and its HOLD group) is part of the decision record.
pub struct PassiveObserver {
    id: String,
    weight: f64,
}

impl PassiveObserver {
    pub fn new(weight: f64) -> Self {
        PassiveObserver {
            id: "passive-observer".into(),
            weight,
        }
    }
}

impl DecisionUnit for PassiveObserver {
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
        Ok(Vote::hold(&self.id, 0.5, "observing"))
    }
}
