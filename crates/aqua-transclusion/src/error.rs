use aqua_model::RevisionId;
use aqua_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransclusionError {
    #[error("revision {0} has no transclusion-hashes slot")]
    NoTransclusionSlot(RevisionId),

    #[error("revision {rev_id} does not embed {title}")]
    UnknownResource { rev_id: RevisionId, title: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
