use aqua_model::{RevisionId, WitnessEventId};
use thiserror::Error;

/// Errors raised by storage collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("revision {0} not found")]
    RevisionNotFound(RevisionId),

    #[error("page {0} not found")]
    PageNotFound(String),

    #[error("witness event {0} not found")]
    WitnessEventNotFound(WitnessEventId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by the external witness oracle.
#[derive(Debug, Error)]
pub enum WitnessError {
    #[error("witness oracle unavailable: {0}")]
    Unavailable(String),
}
