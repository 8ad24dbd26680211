//! Votes cast by decision units and the committee's aggregate decision.

/// Trade action requested by a vote or decision.
///
/// The order of the variants is the committee's tie-break order: when two
/// action groups end up with equal weighted confidence, BUY wins over SELL
/// and SELL over HOLD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl TradeAction {
    /// All actions in tie-break precedence order.
    pub const TIE_BREAK_ORDER: [TradeAction; 3] =
        [TradeAction::Buy, TradeAction::Sell, TradeAction::Hold];
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
            TradeAction::Hold => write!(f, "HOLD"),
        }
    }
}

/// A single decision unit's opinion on one tick. Produced fresh every tick
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Vote {
    pub source_id: String,
    pub action: TradeAction,
    /// Always within [0, 1]; clamped on construction.
    pub confidence: f64,
    /// Requested position size, non-negative.
    pub suggested_size: f64,
    pub rationale: String,
    pub veto: bool,
}

impl Vote {
    pub fn new(
        source_id: impl Into<String>,
        action: TradeAction,
        confidence: f64,
        suggested_size: f64,
        rationale: impl Into<String>,
    ) -> Self {
        Vote {
            source_id: source_id.into(),
            action,
            confidence: confidence.clamp(0.0, 1.0),
            suggested_size: suggested_size.max(0.0),
            rationale: rationale.into(),
            veto: false,
        }
    }

    /// A vote that forbids any trade this tick. Vetoes always carry
    /// `action = HOLD, confidence = 0`.
    pub fn veto(source_id: impl Into<String>, rationale: impl Into<String>) -> Self {
        Vote {
            source_id: source_id.into(),
            action: TradeAction::Hold,
            confidence: 0.0,
            suggested_size: 0.0,
            rationale: rationale.into(),
            veto: true,
        }
    }

    /// A neutral HOLD vote. Units that choose never to initiate trades still
    /// cast these so they remain visible in the aggregate vote list.
    pub fn hold(
        source_id: impl Into<String>,
        confidence: f64,
        rationale: impl Into<String>,
    ) -> Self {
        Vote::new(source_id, TradeAction::Hold, confidence, 0.0, rationale)
    }
}

/// The committee's aggregate decision for one tick, derived deterministically
/// from the surviving votes.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: TradeAction,
    pub confidence: f64,
    pub size: f64,
    /// Set by the simulator once (and only if) the decision is executed.
    pub fill_price: Option<f64>,
    pub rationale: String,
    pub contributing_votes: Vec<Vote>,
    pub vetoed: bool,
}

impl Decision {
    /// The decision produced when a veto is present or no votes survive.
    pub fn hold(rationale: impl Into<String>, votes: Vec<Vote>, vetoed: bool) -> Self {
        Decision {
            action: TradeAction::Hold,
            confidence: 0.0,
            size: 0.0,
            fill_price: None,
            rationale: rationale.into(),
            contributing_votes: votes,
            vetoed,
        }
    }
}
