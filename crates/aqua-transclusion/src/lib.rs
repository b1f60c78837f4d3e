//! Hashes of embedded resources.
//!
//! When a page is saved, [`TransclusionHashExtractor`] records the current
//! verification hash of every file, template and link it references. Later,
//! [`TransclusionManager`] compares those recorded hashes with the resources'
//! current state so an editor can see what changed underneath the page.

mod error;
mod extractor;
mod manager;

pub use error::TransclusionError;
pub use extractor::TransclusionHashExtractor;
pub use manager::{TransclusionManager, TransclusionState, TransclusionStatus};
