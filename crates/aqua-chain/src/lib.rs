//! The verification-hash chain engine.
//!
//! Every saved revision gets a [`VerificationEntity`](aqua_model::VerificationEntity)
//! whose `verification_hash` commits to the revision's content, its metadata
//! (domain, timestamp and the parent's verification hash), the parent's
//! signature and the parent's witness event. Changing anything in history
//! changes every later hash.
//!
//! # Example
//!
//! ```
//! use aqua_chain::{save_revision, verify_page};
//! use aqua_hash::HashingService;
//! use aqua_model::{PageRef, Slot, SlotRole};
//! use aqua_store::InMemoryStore;
//! use chrono::Utc;
//! use std::collections::BTreeMap;
//!
//! let mut store = InMemoryStore::new();
//! let hashing = HashingService::new("a1b2c3d4e5");
//! let page = PageRef::parse("Main Page").unwrap();
//!
//! let slots = BTreeMap::from([(SlotRole::Main, Slot::text("Hello"))]);
//! let first = save_revision(&mut store, &hashing, &page, slots, Utc::now()).unwrap();
//! let slots = BTreeMap::from([(SlotRole::Main, Slot::text("Hello, world"))]);
//! let second = save_revision(&mut store, &hashing, &page, slots, Utc::now()).unwrap();
//!
//! assert!(first.is_genesis());
//! assert_eq!(second.previous_verification_hash(), first.verification_hash());
//! assert!(verify_page(&store, &page).is_ok());
//! ```

mod builder;
mod cascade;
mod error;
mod export;
mod manipulator;
mod pipeline;
mod signing;
mod verify;
mod witness;

pub use builder::{compute_entity, RevisionVerificationBuilder};
pub use error::ChainError;
pub use export::{
    export_page, import_export, parse_export, ExportFile, ExportedContent, ExportedMetadata,
    ExportedPage, ExportedParent, ExportedRevision, ExportedSignature, ImportReport, SiteInfo,
};
pub use manipulator::{ManipulationReport, RevisionManipulator};
pub use pipeline::save_revision;
pub use signing::{
    sign_revision, signature_message, verify_entity_signature, wallet_address, SignerKey,
};
pub use verify::{verify_page, VerificationError, VerificationReport};
pub use witness::{record_witness_event, WitnessReceipt};

use aqua_store::{RevisionStore, RevisionVerificationRepo, VerificationLookup, WitnessOracle};

/// Everything the chain operations need from a store.
pub trait ChainStore:
    RevisionStore + RevisionVerificationRepo + VerificationLookup + WitnessOracle
{
}

impl<T> ChainStore for T where
    T: RevisionStore + RevisionVerificationRepo + VerificationLookup + WitnessOracle
{
}
