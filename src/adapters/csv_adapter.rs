//! CSV file market data adapter.
//!
//! One file per instrument at `<base_path>/<instrument>.csv`, with a header
//! row and columns `timestamp,open,high,low,close,volume[,bid,ask]`.
//! Timestamps are RFC 3339.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use csv::StringRecord;

use crate::domain::bar::Bar;
use crate::domain::error::QuorumtraderError;
use crate::ports::data_port::MarketDataPort;

pub struct CsvDataAdapter {
    base_path: PathBuf,
}

impl CsvDataAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, instrument: &str) -> PathBuf {
        self.base_path.join(format!("{instrument}.csv"))
    }
}

fn field<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, QuorumtraderError> {
    record.get(idx).ok_or_else(|| QuorumtraderError::Data {
        reason: format!("missing {name} column"),
    })
}

fn parse_f64(record: &StringRecord, idx: usize, name: &str) -> Result<f64, QuorumtraderError> {
    field(record, idx, name)?
        .parse()
        .map_err(|e| QuorumtraderError::Data {
            reason: format!("invalid {name} value: {e}"),
        })
}

fn parse_optional_f64(record: &StringRecord, idx: usize) -> Option<f64> {
    record
        .get(idx)
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| s.parse().ok())
}

impl MarketDataPort for CsvDataAdapter {
    fn fetch(
        &self,
        instrument: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, QuorumtraderError> {
        let path = self.csv_path(instrument);
        let content = fs::read_to_string(&path).map_err(|e| QuorumtraderError::Data {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| QuorumtraderError::Data {
                reason: format!("CSV parse error: {e}"),
            })?;

            let timestamp = DateTime::parse_from_rfc3339(field(&record, 0, "timestamp")?)
                .map_err(|e| QuorumtraderError::Data {
                    reason: format!("invalid timestamp: {e}"),
                })?
                .with_timezone(&Utc);

            if timestamp < start || timestamp > end {
                continue;
            }

            bars.push(Bar {
                instrument: instrument.to_string(),
                timestamp,
                open: parse_f64(&record, 1, "open")?,
                high: parse_f64(&record, 2, "high")?,
                low: parse_f64(&record, 3, "low")?,
                close: parse_f64(&record, 4, "close")?,
                volume: parse_f64(&record, 5, "volume")?,
                bid: parse_optional_f64(&record, 6),
                ask: parse_optional_f64(&record, 7),
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}
