//! Flight store error types.

use thiserror::Error;

/// Flight store operation errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("flight {flight_date}/{flight_code} already ingested")]
    DuplicateFlight {
        flight_date: String,
        flight_code: String,
    },

    #[error("invalid identifier {0:?}: identifiers must be ASCII alphanumeric/underscore and must not start with a digit")]
    InvalidIdentifier(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for flight store operations.
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;
