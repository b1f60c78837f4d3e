//! Re-derivation of chain segments after history changes.
//!
//! Every function here only computes; callers write the returned entities
//! once the whole segment has been derived, so a failed lookup halfway
//! through leaves the store untouched.

use crate::builder::compute_entity;
use crate::error::ChainError;
use crate::ChainStore;
use aqua_hash::HashingService;
use aqua_model::{
    PageRef, Revision, RevisionId, RevisionVerificationData, SignatureMaterial, VerificationEntity,
    WitnessData,
};
use tracing::{debug, warn};

/// Witness data of the parent's event, if it has one.
pub(crate) fn parent_witness<S: ChainStore + ?Sized>(
    store: &S,
    parent: &RevisionVerificationData,
) -> Result<Option<WitnessData>, ChainError> {
    match parent.witness_event_id {
        Some(event_id) => Ok(store.get_witness_data(event_id)?),
        None => Ok(None),
    }
}

/// Stored data of `rev_id`, which must have a record.
pub(crate) fn required_parent_data<S: ChainStore + ?Sized>(
    store: &S,
    rev_id: RevisionId,
) -> Result<RevisionVerificationData, ChainError> {
    match store.verification_entity_from_rev_id(rev_id)? {
        Some(entity) => Ok(entity.to_verification_data()),
        None => Err(ChainError::Inconsistent {
            rev_id,
            reason: "predecessor has no verification record".to_string(),
        }),
    }
}

/// Recompute `revisions` in order, each against the one before it.
///
/// Existing records keep their witness link, context, source and domain id;
/// only the hashes are re-derived. A signature survives only if the record's
/// verification hash is unchanged. Revisions without a record are hashed with
/// `fallback`.
pub(crate) fn rederive<S: ChainStore + ?Sized>(
    store: &S,
    fallback: &HashingService,
    revisions: &[Revision],
    mut parent: RevisionVerificationData,
) -> Result<Vec<VerificationEntity>, ChainError> {
    let mut entities = Vec::with_capacity(revisions.len());
    for revision in revisions {
        let existing = store.verification_entity_from_rev_id(revision.id())?;
        let witness = parent_witness(store, &parent)?;
        let entity = match existing {
            Some(existing) => {
                let hashing = HashingService::new(existing.domain_id());
                let derived = compute_entity(&hashing, revision, &parent, witness.as_ref());
                // A signature covers one verification hash and lapses when it moves.
                let signature = if derived.verification_hash() == existing.verification_hash() {
                    existing.signature_material().clone()
                } else {
                    if existing.is_signed() {
                        warn!(rev_id = revision.id(), "hash changed, dropping signature");
                    }
                    SignatureMaterial::default()
                };
                derived
                    .with_signature(signature)
                    .with_witness_event(existing.witness_event_id())
                    .with_context(existing.verification_context().clone())
                    .with_source(existing.source())
            }
            None => compute_entity(fallback, revision, &parent, witness.as_ref()),
        };
        debug!(
            rev_id = revision.id(),
            verification_hash = %entity.verification_hash(),
            "re-derived verification entity"
        );
        parent = entity.to_verification_data();
        entities.push(entity);
    }
    Ok(entities)
}

/// Re-derive every revision of `page` after `rev_id`, given the new data of `rev_id`.
pub(crate) fn rederive_after<S: ChainStore + ?Sized>(
    store: &S,
    fallback: &HashingService,
    page: &PageRef,
    rev_id: RevisionId,
    parent: RevisionVerificationData,
) -> Result<Vec<VerificationEntity>, ChainError> {
    let later: Vec<Revision> = store
        .page_revisions(page)?
        .into_iter()
        .filter(|r| r.id() > rev_id)
        .collect();
    rederive(store, fallback, &later, parent)
}

/// Write re-derived entities back.
pub(crate) fn commit<S: ChainStore + ?Sized>(
    store: &mut S,
    entities: Vec<VerificationEntity>,
) -> Result<(), ChainError> {
    for entity in entities {
        store.upsert_verification_entity(entity)?;
    }
    Ok(())
}
