//! Full re-verification of a page's chain.

use crate::builder::compute_entity;
use crate::cascade::parent_witness;
use crate::error::ChainError;
use crate::signing::verify_entity_signature;
use crate::ChainStore;
use aqua_hash::HashingService;
use aqua_model::{PageRef, RevisionId, RevisionVerificationData};
use thiserror::Error;

/// Ways a stored chain can fail verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Revision {0} has no verification record")]
    MissingEntity(RevisionId),

    #[error("Revision {rev_id} links to {found:?}, expected {expected:?}")]
    BrokenLink {
        rev_id: RevisionId,
        expected: String,
        found: String,
    },

    #[error("Revision {rev_id} has mismatching {field}: stored {stored}, computed {computed}")]
    HashMismatch {
        rev_id: RevisionId,
        field: &'static str,
        stored: String,
        computed: String,
    },

    #[error("Revision {0} carries a signature that does not verify")]
    InvalidSignature(RevisionId),
}

/// Summary of a successfully verified page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub page: PageRef,
    pub revisions: usize,
    pub signed: usize,
    pub witnessed: usize,
}

/// Recompute every record of `page` from its revisions and compare.
///
/// Each revision is hashed against the stored record of the revision before
/// it, with the domain id recorded on its own entity. An empty page verifies
/// trivially.
pub fn verify_page<S: ChainStore + ?Sized>(
    store: &S,
    page: &PageRef,
) -> Result<VerificationReport, ChainError> {
    let mut report = VerificationReport {
        page: page.clone(),
        revisions: 0,
        signed: 0,
        witnessed: 0,
    };
    let mut parent = RevisionVerificationData::default();

    for revision in store.page_revisions(page)? {
        let rev_id = revision.id();
        let stored = store
            .verification_entity_from_rev_id(rev_id)?
            .ok_or(VerificationError::MissingEntity(rev_id))?;

        if stored.previous_verification_hash() != parent.verification_hash {
            return Err(VerificationError::BrokenLink {
                rev_id,
                expected: parent.verification_hash.clone(),
                found: stored.previous_verification_hash().to_string(),
            }
            .into());
        }

        let hashing = HashingService::new(stored.domain_id());
        let witness = parent_witness(store, &parent)?;
        let computed = compute_entity(&hashing, &revision, &parent, witness.as_ref());
        let fields = [
            ("content_hash", stored.content_hash(), computed.content_hash()),
            ("metadata_hash", stored.metadata_hash(), computed.metadata_hash()),
            ("signature_hash", stored.signature_hash(), computed.signature_hash()),
            (
                "verification_hash",
                stored.verification_hash(),
                computed.verification_hash(),
            ),
            ("genesis_hash", stored.genesis_hash(), computed.genesis_hash()),
        ];
        for (field, stored_hash, computed_hash) in fields {
            if stored_hash != computed_hash {
                return Err(VerificationError::HashMismatch {
                    rev_id,
                    field,
                    stored: stored_hash.to_string(),
                    computed: computed_hash.to_string(),
                }
                .into());
            }
        }

        if stored.is_signed() {
            if !verify_entity_signature(&stored) {
                return Err(VerificationError::InvalidSignature(rev_id).into());
            }
            report.signed += 1;
        }
        if stored.witness_event_id().is_some() {
            report.witnessed += 1;
        }
        report.revisions += 1;
        parent = stored.to_verification_data();
    }

    Ok(report)
}
