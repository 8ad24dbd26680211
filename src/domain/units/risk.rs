//! Risk-limiting decision unit with veto power.

use crate::domain::bar::Bar;
use crate::domain::position::Position;
use crate::domain::unit::{DecisionUnit, MarketContext, UnitError};
use crate::domain::vote::Vote;

/// Never initiates trades. Vetoes the whole committee when account drawdown
/// breaches its limit, or when the proposed entry would be too large a share
/// of equity; otherwise casts a neutral HOLD vote.
pub struct RiskSentinel {
    id: String,
    weight: f64,
    /// Drawdown (percent of peak equity) above which all trading is vetoed.
    max_drawdown_pct: f64,
    /// Largest tolerated proposed notional as a fraction of equity.
    max_exposure_fraction: f64,
}

impl RiskSentinel {
    pub fn new(max_drawdown_pct: f64, weight: f64) -> Self {
        RiskSentinel {
            id: "risk-sentinel".into(),
            weight,
            max_drawdown_pct,
            max_exposure_fraction: 0.5,
        }
    }

    pub fn with_max_exposure(mut self, fraction: f64) -> Self {
        self.max_exposure_fraction = fraction;
        self
    }
}

impl DecisionUnit for RiskSentinel {
    fn id(&self) -> &str {
        &self.id
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn evaluate(
        &mut self,
        observation: &Bar,
        _position: Option<&Position>,
        context: &MarketContext,
    ) -> Result<Vote, UnitError> {
        if !context.equity.is_finite() || context.equity <= 0.0 {
            return Err(UnitError::new(
                &self.id,
                format!("unusable equity {}", context.equity),
            ));
        }

        if context.drawdown_pct >= self.max_drawdown_pct {
            return Ok(Vote::veto(
                &self.id,
                format!(
                    "drawdown {:.2}% breaches limit {:.2}%",
                    context.drawdown_pct, self.max_drawdown_pct
                ),
            ));
        }

        let proposed_notional = context.proposed_size * observation.close;
        if proposed_notional > context.equity * self.max_exposure_fraction {
            return Ok(Vote::veto(
                &self.id,
                format!(
                    "proposed notional {:.2} exceeds {:.0}% of equity",
                    proposed_notional,
                    self.max_exposure_fraction * 100.0
                ),
            ));
        }

        Ok(Vote::hold(&self.id, 0.5, "risk within limits"))
    }
}
