//! Collaborator contracts consumed by the chain engine.

use crate::error::{StoreError, WitnessError};
use crate::query::VerificationQuery;
use aqua_model::{
    PageRef, Revision, RevisionId, RevisionVerificationData, VerificationEntity, WitnessData,
    WitnessEventId,
};

/// Read and write access to stored verification records.
pub trait RevisionVerificationRepo {
    /// Stored data for `rev_id`, or all-empty defaults when there is none.
    fn get_revision_verification_data(
        &self,
        rev_id: RevisionId,
    ) -> Result<RevisionVerificationData, StoreError>;

    /// Insert or replace the record keyed by the entity's revision id.
    fn upsert_verification_entity(&mut self, entity: VerificationEntity) -> Result<(), StoreError>;
}

/// Query layer over stored verification entities.
///
/// Multi-entity results are ordered by revision id ascending.
pub trait VerificationLookup {
    fn verification_entity_from_rev_id(
        &self,
        rev_id: RevisionId,
    ) -> Result<Option<VerificationEntity>, StoreError>;

    fn all_verification_entities_from_query(
        &self,
        query: &VerificationQuery,
    ) -> Result<Vec<VerificationEntity>, StoreError>;

    fn get_all_revision_ids(&self, page: &PageRef) -> Result<Vec<RevisionId>, StoreError>;

    /// Returns whether a record was removed.
    fn delete_for_rev_id(&mut self, rev_id: RevisionId) -> Result<bool, StoreError>;

    /// The entity of the page's latest revision.
    fn verification_entity_from_title(
        &self,
        page: &PageRef,
    ) -> Result<Option<VerificationEntity>, StoreError> {
        Ok(self
            .all_verification_entities_from_query(&VerificationQuery::for_page(page))?
            .pop())
    }

    /// First entity (lowest revision id) matching `query`.
    fn verification_entity_from_query(
        &self,
        query: &VerificationQuery,
    ) -> Result<Option<VerificationEntity>, StoreError> {
        Ok(self
            .all_verification_entities_from_query(query)?
            .into_iter()
            .next())
    }

    /// Walk `previous_verification_hash` links back to genesis, nearest first.
    fn ancestors(&self, rev_id: RevisionId) -> Result<Vec<VerificationEntity>, StoreError> {
        let mut chain = Vec::new();
        let Some(mut current) = self.verification_entity_from_rev_id(rev_id)? else {
            return Ok(chain);
        };
        while !current.is_genesis() {
            let query = VerificationQuery::for_page(current.page())
                .with_verification_hash(current.previous_verification_hash());
            match self.verification_entity_from_query(&query)? {
                Some(parent) if parent.rev_id() < current.rev_id() => {
                    chain.push(parent.clone());
                    current = parent;
                }
                _ => break,
            }
        }
        Ok(chain)
    }

    /// Walk forward to the page's tip, nearest first.
    fn descendants(&self, rev_id: RevisionId) -> Result<Vec<VerificationEntity>, StoreError> {
        let mut chain = Vec::new();
        let Some(mut current) = self.verification_entity_from_rev_id(rev_id)? else {
            return Ok(chain);
        };
        loop {
            let query = VerificationQuery::for_page(current.page())
                .with_previous_verification_hash(current.verification_hash());
            let next = self
                .all_verification_entities_from_query(&query)?
                .into_iter()
                .find(|e| e.rev_id() > current.rev_id());
            match next {
                Some(child) => {
                    chain.push(child.clone());
                    current = child;
                }
                None => break,
            }
        }
        Ok(chain)
    }
}

/// The external witness oracle, treated as opaque and fallible.
pub trait WitnessOracle {
    fn get_witness_data(
        &self,
        witness_event_id: WitnessEventId,
    ) -> Result<Option<WitnessData>, WitnessError>;
}

/// Local record of witness events.
pub trait WitnessEventStore {
    /// Store `data` and return its event id.
    ///
    /// Storing the same transaction hash twice returns the existing id
    /// instead of creating a second event.
    fn store_witness_event(&mut self, data: WitnessData) -> Result<WitnessEventId, StoreError>;
}

/// Page and revision storage of the host document store.
pub trait RevisionStore {
    fn revision(&self, rev_id: RevisionId) -> Result<Option<Revision>, StoreError>;

    /// All revisions of `page`, ascending by id.
    fn page_revisions(&self, page: &PageRef) -> Result<Vec<Revision>, StoreError>;

    fn latest_revision_id(&self, page: &PageRef) -> Result<Option<RevisionId>, StoreError>;

    fn pages(&self) -> Result<Vec<PageRef>, StoreError>;

    /// Reserve a fresh revision id, greater than every id handed out before.
    fn allocate_revision_id(&mut self) -> Result<RevisionId, StoreError>;

    /// Insert or replace a revision keyed by its id.
    fn put_revision(&mut self, revision: Revision) -> Result<(), StoreError>;

    fn delete_revision(&mut self, rev_id: RevisionId) -> Result<(), StoreError>;

    /// Move the page's latest pointer; `None` removes the page.
    fn set_latest(&mut self, page: &PageRef, latest: Option<RevisionId>) -> Result<(), StoreError>;

    fn revision_or_err(&self, rev_id: RevisionId) -> Result<Revision, StoreError> {
        self.revision(rev_id)?
            .ok_or(StoreError::RevisionNotFound(rev_id))
    }
}
