//! Concrete decision units composed into committees.

pub mod passive;
pub mod reversion;
pub mod risk;
pub mod trend;

pub use passive::PassiveObserver;
pub use reversion::MeanReversion;
pub use risk::RiskSentinel;
pub use trend::TrendFollower;
