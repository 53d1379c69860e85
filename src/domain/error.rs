//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for sigtrader.
#[derive(Debug, thiserror::Error)]
pub enum SigtraderError {
    #[error("data error: {reason}")]
    Data { reason: String },

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

    #[error("column {column} not found in dataset")]
    MissingColumn { column: String },

    #[error("no rows in window {from} to {to}")]
    EmptyWindow { from: NaiveDate, to: NaiveDate },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SigtraderError> for std::process::ExitCode {
    fn from(err: &SigtraderError) -> Self {
        let code: u8 = match err {
            SigtraderError::Io(_) | SigtraderError::Report { .. } => 1,
            SigtraderError::ConfigParse { .. }
            | SigtraderError::ConfigMissing { .. }
            | SigtraderError::ConfigInvalid { .. } => 2,
            SigtraderError::Data { .. } => 3,
            SigtraderError::MissingColumn { .. } | SigtraderError::EmptyWindow { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
