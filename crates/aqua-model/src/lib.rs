//! Data model for verified revisions.
//!
//! This crate holds the value objects shared by every part of the chain engine:
//! page references, revisions with their tagged slot content, the
//! [`VerificationEntity`] snapshot of one revision's verification record, and
//! the storage shapes exchanged with the persistence and witness collaborators.

mod entity;
mod page;
mod revision;
mod slot;
mod storage;

pub use entity::{SignatureMaterial, SourceTag, VerificationEntity, VerificationHashes};
pub use page::{PageRef, PageRefError, NS_CATEGORY, NS_FILE, NS_MAIN, NS_TEMPLATE};
pub use revision::{Revision, RevisionId};
pub use slot::{
    FileHashContent, JsonContent, Slot, SlotContent, SlotRole, TextContent,
    TransclusionHashes, TransclusionRecord,
};
pub use storage::{RevisionVerificationData, WitnessData, WitnessEventId};
