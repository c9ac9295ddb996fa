//! Error types for fuzzy engine assembly and inference.

use thiserror::Error;

/// Result type for fuzzy engine operations.
pub type FuzzyResult<T> = Result<T, FuzzyError>;

/// Errors that can occur while building or running a fuzzy engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FuzzyError {
    /// Invalid argument provided to a constructor.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Two variables share a name.
    #[error("Duplicate variable: {name}")]
    DuplicateVariable { name: String },

    /// Variable name not known to the engine.
    #[error("Unknown variable: {name}")]
    UnknownVariable { name: String },

    /// Malformed rule text.
    #[error("Cannot parse rule '{rule}': {what}")]
    Parse { rule: String, what: String },

    /// An input carries NaN or an infinity at inference time.
    #[error("Non-finite input value for {variable}: {value}")]
    NonFiniteInput { variable: String, value: f64 },

    /// Engine is missing variables or rules.
    #[error("Engine not ready: {what}")]
    NotReady { what: &'static str },
}
