//! Pipeline error taxonomy.

use crate::validate::ConsistencyFailure;
use hangar_metadata::MetadataError;
use hangar_storage::StorageError;
use thiserror::Error;

/// Failures surfaced to the external orchestrator.
///
/// Every failure aborts the current invocation; the pipeline performs no
/// internal retry. Only `Database` can leave the store touched, and then only
/// through the store's own atomic-commit guarantee.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Listing, download, or connection failure. Retryable by the
    /// orchestrator, never retried here.
    #[error("infrastructure failure: {0}")]
    Infrastructure(#[from] StorageError),

    #[error("missing artifacts: {}", .missing.join(", "))]
    MissingFile { missing: Vec<String> },

    #[error("parse failure in {artifact}: {reason}")]
    Parse { artifact: String, reason: String },

    #[error("inconsistent upload: {0}")]
    Inconsistent(#[from] ConsistencyFailure),

    #[error("database failure: {0}")]
    Database(#[from] MetadataError),
}

impl PipelineError {
    pub(crate) fn parse(artifact: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            artifact: artifact.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
