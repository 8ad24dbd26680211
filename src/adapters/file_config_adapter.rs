//! INI file configuration adapter.
//!
//! Implements `ConfigPort` over an INI file and knows how to assemble the
//! typed `[simulation]` and `[scheduler]` configs from it.

use std::path::Path;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use configparser::ini::Ini;

use crate::domain::config::SimulationConfig;
use crate::domain::error::QuorumtraderError;
use crate::ports::config_port::ConfigPort;
use crate::scheduler::SchedulerConfig;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, QuorumtraderError> {
        let mut config = Ini::new();
        config
            .load(&path)
            .map_err(|e| QuorumtraderError::ConfigParse {
                file: path.as_ref().display().to_string(),
                reason: e,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, QuorumtraderError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|e| QuorumtraderError::ConfigParse {
                file: "<inline>".into(),
                reason: e,
            })?;
        Ok(Self { config })
    }

    /// Build the `[simulation]` section into a validated config.
    pub fn simulation_config(&self) -> Result<SimulationConfig, QuorumtraderError> {
        let start = self.require_date("simulation", "start")?;
        let end = self.require_date("simulation", "end")?;

        let instruments: Vec<String> = self
            .require_string("simulation", "instruments")?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if instruments.is_empty() {
            return Err(QuorumtraderError::ConfigInvalid {
                section: "simulation".into(),
                key: "instruments".into(),
                reason: "at least one instrument required".into(),
            });
        }

        let config = SimulationConfig {
            start,
            end,
            initial_capital: self.get_double("simulation", "initial_capital", 100_000.0),
            instruments,
            bar_interval: Duration::seconds(self.get_int("simulation", "bar_interval_secs", 60)),
            commission_rate: self.get_double("simulation", "commission_rate", 0.001),
            slippage_rate: self.get_double("simulation", "slippage_rate", 0.0005),
            max_concurrent_positions: self.get_int("simulation", "max_concurrent_positions", 3)
                as usize,
            position_fraction: self.get_double("simulation", "position_fraction", 0.25),
        };
        config.validate()?;
        Ok(config)
    }

    /// Build the `[scheduler]` section; every key has a usable default.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        let report_secs = self.get_int("scheduler", "report_interval_secs", 30);
        SchedulerConfig {
            workers: self.get_int("scheduler", "workers", 4).max(1) as usize,
            report_interval: if report_secs > 0 {
                Some(StdDuration::from_secs(report_secs as u64))
            } else {
                None
            },
        }
    }

    fn require_string(&self, section: &str, key: &str) -> Result<String, QuorumtraderError> {
        self.get_string(section, key)
            .ok_or_else(|| QuorumtraderError::ConfigMissing {
                section: section.into(),
                key: key.into(),
            })
    }

    fn require_date(
        &self,
        section: &str,
        key: &str,
    ) -> Result<chrono::DateTime<Utc>, QuorumtraderError> {
        let raw = self.require_string(section, key)?;
        let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
            QuorumtraderError::ConfigInvalid {
                section: section.into(),
                key: key.into(),
                reason: format!("expected YYYY-MM-DD, got {raw}: {e}"),
            }
        })?;
        match date.and_hms_opt(0, 0, 0) {
            Some(naive) => Ok(Utc.from_utc_datetime(&naive)),
            None => Err(QuorumtraderError::ConfigInvalid {
                section: section.into(),
                key: key.into(),
                reason: format!("unusable date {raw}"),
            }),
        }
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}
