//! Derivation of a revision's verification entity.

use crate::error::ChainError;
use aqua_hash::{timestamp_string, HashingService};
use aqua_model::{
    Revision, RevisionVerificationData, VerificationEntity, VerificationHashes, WitnessData,
};
use aqua_store::{RevisionVerificationRepo, WitnessOracle};
use tracing::debug;

/// Builds the verification entity of a freshly saved revision.
///
/// The builder reads the parent's stored record through the repo and the
/// parent's witness event through the oracle. It writes nothing; the caller
/// persists the returned entity.
pub struct RevisionVerificationBuilder<'a, R: ?Sized, O: ?Sized> {
    repo: &'a R,
    oracle: &'a O,
    hashing: &'a HashingService,
}

impl<'a, R, O> RevisionVerificationBuilder<'a, R, O>
where
    R: RevisionVerificationRepo + ?Sized,
    O: WitnessOracle + ?Sized,
{
    pub fn new(repo: &'a R, oracle: &'a O, hashing: &'a HashingService) -> Self {
        Self {
            repo,
            oracle,
            hashing,
        }
    }

    /// Compute the entity for `revision` against its parent's stored record.
    ///
    /// A missing parent, or a parent without a record, is the genesis case and
    /// hashes against empty strings. Witness oracle failures propagate.
    pub fn build_verification_data(
        &self,
        revision: &Revision,
    ) -> Result<VerificationEntity, ChainError> {
        let parent = match revision.parent_id() {
            Some(parent_id) => self.repo.get_revision_verification_data(parent_id)?,
            None => RevisionVerificationData::default(),
        };
        let witness = match parent.witness_event_id {
            Some(event_id) => self.oracle.get_witness_data(event_id)?,
            None => None,
        };
        let entity = compute_entity(self.hashing, revision, &parent, witness.as_ref());
        debug!(
            rev_id = revision.id(),
            parent_id = ?revision.parent_id(),
            verification_hash = %entity.verification_hash(),
            "built verification data"
        );
        Ok(entity)
    }
}

/// Pure hash derivation for `revision` given its parent's data.
///
/// The signature hash consumes the parent's signature material: a revision is
/// saved unsigned and signed afterwards, and that later signature is sealed
/// into the next revision's hash. The returned entity has `source = default`
/// and empty signature fields.
pub fn compute_entity(
    hashing: &HashingService,
    revision: &Revision,
    parent: &RevisionVerificationData,
    parent_witness: Option<&WitnessData>,
) -> VerificationEntity {
    let content_hash = hashing.calculate_content_hash(revision.slot_serializations());
    let metadata_hash = hashing.calculate_metadata_hash(
        &timestamp_string(revision.timestamp()),
        &parent.verification_hash,
    );
    let signature_hash = hashing.calculate_signature_hash(&parent.signature, &parent.public_key);
    let witness_hash = parent_witness
        .map(|w| {
            hashing.calculate_witness_hash(
                &w.domain_manifest_verification_hash,
                &w.merkle_root,
                &w.witness_network,
                &w.witness_event_transaction_hash,
            )
        })
        .unwrap_or_default();
    let verification_hash = hashing.calculate_verification_hash(
        &content_hash,
        &metadata_hash,
        &signature_hash,
        &witness_hash,
    );
    let genesis_hash = if parent.is_empty() {
        verification_hash.clone()
    } else {
        parent.genesis_hash.clone()
    };

    VerificationEntity::new(
        revision.page().clone(),
        revision.id(),
        hashing.domain_id(),
        VerificationHashes {
            content_hash,
            metadata_hash,
            signature_hash,
            previous_verification_hash: parent.verification_hash.clone(),
            verification_hash,
            genesis_hash,
        },
        *revision.timestamp(),
    )
}
