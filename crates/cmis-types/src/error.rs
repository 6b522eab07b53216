use thiserror::Error;

/// Errors produced while constructing or validating value types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("object id must not be empty")]
    EmptyObjectId,

    #[error("change token must not be empty")]
    EmptyChangeToken,

    #[error("malformed filter {filter:?}: {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("unknown {kind} value: {value:?}")]
    UnknownValue { kind: &'static str, value: String },

    #[error("declared content length {declared} does not match payload length {actual}")]
    LengthMismatch { declared: u64, actual: u64 },
}
