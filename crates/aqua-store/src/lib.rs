//! Persistence boundary of the verification chain.
//!
//! The chain engine never talks to a database directly. It consumes the
//! collaborator traits defined here:
//!
//! - [`RevisionVerificationRepo`]: read a parent's stored verification data
//!   and upsert new entities.
//! - [`VerificationLookup`]: resolve entities by revision, title or query and
//!   walk the chain.
//! - [`WitnessOracle`] / [`WitnessEventStore`]: external witness events.
//! - [`RevisionStore`]: the host's page and revision storage.
//!
//! [`InMemoryStore`] implements all of them and persists to a JSON file.

mod error;
mod memory;
mod query;
mod traits;

pub use error::{StoreError, WitnessError};
pub use memory::InMemoryStore;
pub use query::VerificationQuery;
pub use traits::{
    RevisionStore, RevisionVerificationRepo, VerificationLookup, WitnessEventStore,
    WitnessOracle,
};
