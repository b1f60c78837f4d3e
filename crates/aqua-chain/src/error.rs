use crate::verify::VerificationError;
use aqua_model::RevisionId;
use aqua_store::{StoreError, WitnessError};
use thiserror::Error;

/// Errors raised by chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("chain inconsistent at revision {rev_id}: {reason}")]
    Inconsistent { rev_id: RevisionId, reason: String },

    #[error("external witness service unavailable: {0}")]
    ExternalUnavailable(#[from] WitnessError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("revision {0} is already signed")]
    AlreadySigned(RevisionId),

    #[error("verification failed: {0}")]
    Verification(#[from] VerificationError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl ChainError {
    pub(crate) fn revision_not_found(rev_id: RevisionId) -> Self {
        ChainError::NotFound(format!("revision {rev_id}"))
    }
}
