//! Error types for application managers.

use std::path::PathBuf;

use tb_core::TbError;
use tb_fuzzy::FuzzyError;
use thiserror::Error;

/// Result type for manager operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors raised by managers, controllers and their collaborators.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Invalid argument provided to a setter or constructor.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// A setter received NaN or an infinity.
    #[error("Non-finite value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    /// The manager cannot start with the current wiring.
    #[error("Configuration error: {what}")]
    Configuration { what: String },

    /// The data log could not be opened or written.
    #[error("Data log error for '{}': {source}", .path.display())]
    DataLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The fuzzy engine rejected its inputs or rule base.
    #[error("Inference error: {0}")]
    Inference(#[from] FuzzyError),

    /// The fuzzy engine produced NaN or an infinity.
    #[error("Non-finite {variable} for VM {vm}: {value}")]
    NonFiniteOutput {
        vm: String,
        variable: &'static str,
        value: f64,
    },

    /// A sensor or VM driver reported a failure.
    #[error("Driver error: {what}")]
    Driver { what: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<TbError> for ControlError {
    fn from(err: TbError) -> Self {
        match err {
            TbError::InvalidArg { what } => ControlError::InvalidArg { what },
            TbError::NonFinite { what, value } => ControlError::NonFinite { what, value },
            TbError::UnknownCategory { name } => ControlError::Configuration {
                what: format!("unknown performance category '{name}'"),
            },
        }
    }
}
