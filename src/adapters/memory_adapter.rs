//! In-memory market data adapter, used for synthetic data and in tests.

use chrono::{DateTime, Utc};

use crate::domain::bar::{Bar, InstrumentSeries};
use crate::domain::error::QuorumtraderError;
use crate::ports::data_port::MarketDataPort;

pub struct MemoryDataAdapter {
    series: InstrumentSeries,
}

impl MemoryDataAdapter {
    pub fn new(series: InstrumentSeries) -> Self {
        Self { series }
    }
}

impl MarketDataPort for MemoryDataAdapter {
    fn fetch(
        &self,
        instrument: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, QuorumtraderError> {
        let bars = self
            .series
            .get(instrument)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.timestamp >= start && b.timestamp <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(minute: u32, close: f64) -> Bar {
        Bar {
            instrument: "BTC-USD".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 0, minute, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 100.0,
            bid: None,
            ask: None,
        }
    }

    #[test]
    fn fetch_filters_by_window() {
        let mut series = InstrumentSeries::new();
        series.insert("BTC-USD".into(), vec![bar(0, 1.0), bar(5, 2.0), bar(10, 3.0)]);
        let adapter = MemoryDataAdapter::new(series);

        let start = Utc.with_ymd_and_hms(2024, 1, 15, 0, 1, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 15, 0, 9, 0).unwrap();
        let bars = adapter.fetch("BTC-USD", start, end).unwrap();
        assert_eq!(bars.len(), 1);
        assert!((bars[0].close - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_instrument_yields_empty() {
        let adapter = MemoryDataAdapter::new(InstrumentSeries::new());
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        assert!(adapter.fetch("ETH-USD", start, end).unwrap().is_empty());
    }
}
