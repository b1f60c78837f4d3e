//! In-memory implementation of every storage collaborator.

use crate::error::{StoreError, WitnessError};
use crate::query::VerificationQuery;
use crate::traits::{
    RevisionStore, RevisionVerificationRepo, VerificationLookup, WitnessEventStore,
    WitnessOracle,
};
use aqua_model::{
    PageRef, Revision, RevisionId, RevisionVerificationData, VerificationEntity, WitnessData,
    WitnessEventId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PageRecord {
    page: PageRef,
    latest: RevisionId,
}

/// A document store held in memory and saved as one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryStore {
    #[serde(default)]
    pages: BTreeMap<String, PageRecord>,
    #[serde(default)]
    revisions: BTreeMap<RevisionId, Revision>,
    #[serde(default)]
    verification: BTreeMap<RevisionId, VerificationEntity>,
    #[serde(default)]
    witness_events: BTreeMap<WitnessEventId, WitnessData>,
    #[serde(default)]
    last_revision_id: RevisionId,
    /// Event ids that the oracle reports as unreachable.
    #[serde(skip)]
    offline_events: Vec<WitnessEventId>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let contents = fs::read_to_string(path)?;
        let store: Self = serde_json::from_str(&contents)?;
        Ok(store)
    }

    /// Load `path` if it exists, otherwise start empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Make the oracle fail for `witness_event_id`, simulating an outage.
    pub fn mark_witness_offline(&mut self, witness_event_id: WitnessEventId) {
        self.offline_events.push(witness_event_id);
    }

    pub fn witness_events(&self) -> impl Iterator<Item = (&WitnessEventId, &WitnessData)> {
        self.witness_events.iter()
    }
}

impl RevisionVerificationRepo for InMemoryStore {
    fn get_revision_verification_data(
        &self,
        rev_id: RevisionId,
    ) -> Result<RevisionVerificationData, StoreError> {
        Ok(self
            .verification
            .get(&rev_id)
            .map(VerificationEntity::to_verification_data)
            .unwrap_or_default())
    }

    fn upsert_verification_entity(&mut self, entity: VerificationEntity) -> Result<(), StoreError> {
        debug!(
            rev_id = entity.rev_id(),
            verification_hash = %entity.verification_hash(),
            "upsert verification entity"
        );
        self.verification.insert(entity.rev_id(), entity);
        Ok(())
    }
}

impl VerificationLookup for InMemoryStore {
    fn verification_entity_from_rev_id(
        &self,
        rev_id: RevisionId,
    ) -> Result<Option<VerificationEntity>, StoreError> {
        Ok(self.verification.get(&rev_id).cloned())
    }

    fn all_verification_entities_from_query(
        &self,
        query: &VerificationQuery,
    ) -> Result<Vec<VerificationEntity>, StoreError> {
        // BTreeMap iteration is already ascending by revision id.
        Ok(self
            .verification
            .values()
            .filter(|e| query.matches(e))
            .cloned()
            .collect())
    }

    fn get_all_revision_ids(&self, page: &PageRef) -> Result<Vec<RevisionId>, StoreError> {
        Ok(self
            .revisions
            .values()
            .filter(|r| r.page() == page)
            .map(Revision::id)
            .collect())
    }

    fn delete_for_rev_id(&mut self, rev_id: RevisionId) -> Result<bool, StoreError> {
        Ok(self.verification.remove(&rev_id).is_some())
    }

    fn verification_entity_from_title(
        &self,
        page: &PageRef,
    ) -> Result<Option<VerificationEntity>, StoreError> {
        match self.latest_revision_id(page)? {
            Some(latest) => self.verification_entity_from_rev_id(latest),
            None => Ok(None),
        }
    }
}

impl WitnessOracle for InMemoryStore {
    fn get_witness_data(
        &self,
        witness_event_id: WitnessEventId,
    ) -> Result<Option<WitnessData>, WitnessError> {
        if self.offline_events.contains(&witness_event_id) {
            return Err(WitnessError::Unavailable(format!(
                "event {witness_event_id} is unreachable"
            )));
        }
        Ok(self.witness_events.get(&witness_event_id).cloned())
    }
}

impl WitnessEventStore for InMemoryStore {
    fn store_witness_event(&mut self, data: WitnessData) -> Result<WitnessEventId, StoreError> {
        if let Some((id, _)) = self.witness_events.iter().find(|(_, existing)| {
            existing.witness_event_transaction_hash == data.witness_event_transaction_hash
        }) {
            return Ok(*id);
        }
        let id = self
            .witness_events
            .last_key_value()
            .map_or(1, |(last, _)| last + 1);
        self.witness_events.insert(id, data);
        Ok(id)
    }
}

impl RevisionStore for InMemoryStore {
    fn revision(&self, rev_id: RevisionId) -> Result<Option<Revision>, StoreError> {
        Ok(self.revisions.get(&rev_id).cloned())
    }

    fn page_revisions(&self, page: &PageRef) -> Result<Vec<Revision>, StoreError> {
        Ok(self
            .revisions
            .values()
            .filter(|r| r.page() == page)
            .cloned()
            .collect())
    }

    fn latest_revision_id(&self, page: &PageRef) -> Result<Option<RevisionId>, StoreError> {
        Ok(self
            .pages
            .get(&page.prefixed_dbkey())
            .map(|record| record.latest))
    }

    fn pages(&self) -> Result<Vec<PageRef>, StoreError> {
        Ok(self.pages.values().map(|r| r.page.clone()).collect())
    }

    fn allocate_revision_id(&mut self) -> Result<RevisionId, StoreError> {
        self.last_revision_id += 1;
        Ok(self.last_revision_id)
    }

    fn put_revision(&mut self, revision: Revision) -> Result<(), StoreError> {
        self.last_revision_id = self.last_revision_id.max(revision.id());
        self.revisions.insert(revision.id(), revision);
        Ok(())
    }

    fn delete_revision(&mut self, rev_id: RevisionId) -> Result<(), StoreError> {
        self.revisions
            .remove(&rev_id)
            .map(|_| ())
            .ok_or(StoreError::RevisionNotFound(rev_id))
    }

    fn set_latest(&mut self, page: &PageRef, latest: Option<RevisionId>) -> Result<(), StoreError> {
        let key = page.prefixed_dbkey();
        match latest {
            Some(latest) => {
                self.pages.insert(
                    key,
                    PageRecord {
                        page: page.clone(),
                        latest,
                    },
                );
            }
            None => {
                self.pages.remove(&key);
            }
        }
        Ok(())
    }
}
