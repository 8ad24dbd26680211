//! Market data access port.

use chrono::{DateTime, Utc};

use crate::domain::bar::{Bar, InstrumentSeries};
use crate::domain::config::SimulationConfig;
use crate::domain::error::QuorumtraderError;

/// Supplies historical bars for one instrument over a time window. Bars come
/// back sorted by timestamp ascending.
pub trait MarketDataPort: Send + Sync {
    fn fetch(
        &self,
        instrument: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, QuorumtraderError>;

    /// Fetch every instrument named in the config. Fails on the first
    /// instrument with no bars in the window.
    fn fetch_series(
        &self,
        config: &SimulationConfig,
    ) -> Result<InstrumentSeries, QuorumtraderError> {
        let mut series = InstrumentSeries::new();
        for instrument in &config.instruments {
            let bars = self.fetch(instrument, config.start, config.end)?;
            if bars.is_empty() {
                return Err(QuorumtraderError::NoData {
                    instrument: instrument.clone(),
                });
            }
            series.insert(instrument.clone(), bars);
        }
        Ok(series)
    }
}
