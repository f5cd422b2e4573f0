//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid flight key: {0}")]
    InvalidFlightKey(String),

    #[error("invalid hemisphere letter {0:?} (expected N, S, E or W)")]
    InvalidHemisphere(char),

    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("invalid {field} field: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
