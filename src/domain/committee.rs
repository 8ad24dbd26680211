//! Vote aggregation: weighted-confidence voting with veto override.

use tracing::warn;

use crate::domain::bar::Bar;
use crate::domain::position::Position;
use crate::domain::unit::{DecisionUnit, MarketContext};
use crate::domain::vote::{Decision, TradeAction, Vote};

/// Aggregates votes from a list of decision units into one trade decision.
pub struct Committee {
    units: Vec<Box<dyn DecisionUnit>>,
    confidence_threshold: f64,
}

impl Committee {
    pub fn new(units: Vec<Box<dyn DecisionUnit>>, confidence_threshold: f64) -> Self {
        Committee {
            units,
            confidence_threshold: confidence_threshold.clamp(0.0, 1.0),
        }
    }

    /// Minimum decision confidence for the simulator to act on a non-HOLD
    /// decision.
    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Produce the committee decision for one tick.
    ///
    /// 1. Every unit votes; a unit error is logged and its vote excluded.
    /// 2. Any surviving veto short-circuits to a vetoed HOLD decision.
    /// 3. Votes are grouped by action; each group gets a weighted confidence
    ///    of Σ(unit_weight × confidence) / Σ(unit_weight).
    /// 4. The strictly highest group wins; ties resolve BUY, then SELL, then
    ///    HOLD.
    /// 5. Decision size is the arithmetic mean of the winning group's
    ///    suggested sizes.
    pub fn decide(
        &mut self,
        observation: &Bar,
        position: Option<&Position>,
        context: &MarketContext,
    ) -> Decision {
        let mut votes: Vec<(f64, Vote)> = Vec::with_capacity(self.units.len());
        for unit in &mut self.units {
            match unit.evaluate(observation, position, context) {
                Ok(vote) => votes.push((unit.weight(), vote)),
                Err(e) => warn!(
                    unit = unit.id(),
                    instrument = %observation.instrument,
                    error = %e,
                    "decision unit failed, vote excluded for this tick"
                ),
            }
        }

        let vetoes: Vec<&Vote> = votes.iter().map(|(_, v)| v).filter(|v| v.veto).collect();
        if !vetoes.is_empty() {
            let rationale = vetoes
                .iter()
                .map(|v| v.rationale.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            let all_votes = votes.iter().map(|(_, v)| v.clone()).collect();
            return Decision::hold(rationale, all_votes, true);
        }

        if votes.is_empty() {
            return Decision::hold("no surviving votes", Vec::new(), false);
        }

        let mut winner: Option<(TradeAction, f64)> = None;
        for action in TradeAction::TIE_BREAK_ORDER {
            let group: Vec<&(f64, Vote)> =
                votes.iter().filter(|(_, v)| v.action == action).collect();
            if group.is_empty() {
                continue;
            }
            let weight_sum: f64 = group.iter().map(|(w, _)| w).sum();
            let confidence = if weight_sum > 0.0 {
                group
                    .iter()
                    .map(|(w, v)| w * v.confidence)
                    .sum::<f64>()
                    / weight_sum
            } else {
                0.0
            };
            // Strict comparison preserves the BUY > SELL > HOLD tie-break.
            match winner {
                Some((_, best)) if confidence <= best => {}
                _ => winner = Some((action, confidence)),
            }
        }

        let Some((action, confidence)) = winner else {
            // Unreachable with a non-empty vote set, but HOLD is the safe
            // answer either way.
            let all_votes = votes.iter().map(|(_, v)| v.clone()).collect();
            return Decision::hold("no winning action", all_votes, false);
        };

        let winning_sizes: Vec<f64> = votes
            .iter()
            .filter(|(_, v)| v.action == action)
            .map(|(_, v)| v.suggested_size)
            .collect();
        let size = winning_sizes.iter().sum::<f64>() / winning_sizes.len() as f64;

        let rationale = votes
            .iter()
            .filter(|(_, v)| v.action == action)
            .map(|(_, v)| format!("{}: {}", v.source_id, v.rationale))
            .collect::<Vec<_>>()
            .join("; ");

        Decision {
            action,
            confidence,
            size,
            fill_price: None,
            rationale,
            contributing_votes: votes.into_iter().map(|(_, v)| v).collect(),
            vetoed: false,
        }
    }
}
