use crate::tree::ChangeType;
use aqua_chain::ChainError;
use aqua_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InboxError {
    #[error("cannot fast-forward: histories diverge ({0})")]
    Diverged(ChangeType),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
