//! Domain error types.

/// Top-level error type for quorumtrader.
#[derive(Debug, thiserror::Error)]
pub enum QuorumtraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no market data supplied for any instrument")]
    EmptySeries,

    #[error("no data for instrument {instrument}")]
    NoData { instrument: String },

    #[error("market data error: {reason}")]
    Data { reason: String },

    #[error("scheduler is stopped")]
    SchedulerStopped,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&QuorumtraderError> for std::process::ExitCode {
    fn from(err: &QuorumtraderError) -> Self {
        let code: u8 = match err {
            QuorumtraderError::Io(_) => 1,
            QuorumtraderError::ConfigParse { .. }
            | QuorumtraderError::ConfigMissing { .. }
            | QuorumtraderError::ConfigInvalid { .. } => 2,
            QuorumtraderError::Data { .. } => 3,
            QuorumtraderError::EmptySeries | QuorumtraderError::NoData { .. } => 5,
            QuorumtraderError::SchedulerStopped => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_strings() {
        let e = QuorumtraderError::ConfigMissing {
            section: "simulation".into(),
            key: "start".into(),
        };
        assert_eq!(e.to_string(), "missing config key [simulation] start");

        let e = QuorumtraderError::NoData {
            instrument: "BTC-USD".into(),
        };
        assert_eq!(e.to_string(), "no data for instrument BTC-USD");
    }
}
