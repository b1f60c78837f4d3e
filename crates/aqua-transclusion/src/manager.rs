use crate::error::TransclusionError;
use aqua_model::{PageRef, Revision, Slot, TransclusionRecord};
use aqua_store::{VerificationLookup, VerificationQuery};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// How an embedded resource relates to the hash recorded by its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransclusionState {
    /// The resource does not exist (never created, or deleted).
    NoRecord,
    /// The resource's latest hash is the recorded one.
    Unchanged,
    /// The resource moved on from a hash that is still part of its history.
    NewVersion,
    /// The recorded hash is not part of the resource's history.
    Invalid,
}

impl fmt::Display for TransclusionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransclusionState::NoRecord => "NO_RECORD",
            TransclusionState::Unchanged => "UNCHANGED",
            TransclusionState::NewVersion => "NEW_VERSION",
            TransclusionState::Invalid => "INVALID",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransclusionStatus {
    pub title: String,
    pub page: PageRef,
    pub state: TransclusionState,
    pub stored_hash: Option<String>,
    pub current_hash: Option<String>,
}

/// Reconciles a revision's transclusion records with the current store.
pub struct TransclusionManager<'a, L: ?Sized> {
    lookup: &'a L,
}

impl<'a, L: VerificationLookup + ?Sized> TransclusionManager<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    /// State of every resource recorded on `revision`, in record order.
    ///
    /// A revision without a transclusion-hashes slot embeds nothing.
    pub fn get_transclusion_state(
        &self,
        revision: &Revision,
    ) -> Result<Vec<TransclusionStatus>, TransclusionError> {
        let Some(hashes) = revision.transclusions() else {
            return Ok(Vec::new());
        };
        hashes
            .records()
            .iter()
            .map(|record| self.classify(record))
            .collect()
    }

    /// New transclusion content for the next revision, with `page`'s record
    /// pointing at the resource's current hash.
    pub fn update_transclusion_hash(
        &self,
        revision: &Revision,
        page: &PageRef,
    ) -> Result<Slot, TransclusionError> {
        let hashes = revision
            .transclusions()
            .ok_or(TransclusionError::NoTransclusionSlot(revision.id()))?;
        if hashes.find(page).is_none() {
            return Err(TransclusionError::UnknownResource {
                rev_id: revision.id(),
                title: page.prefixed_dbkey(),
            });
        }
        let current = self
            .lookup
            .verification_entity_from_title(page)?
            .map(|entity| entity.verification_hash().to_string());
        Ok(Slot::TransclusionHashes(hashes.with_updated(page, current)))
    }

    fn classify(
        &self,
        record: &TransclusionRecord,
    ) -> Result<TransclusionStatus, TransclusionError> {
        let page = record.page();
        let current = self
            .lookup
            .verification_entity_from_title(&page)?
            .map(|entity| entity.verification_hash().to_string());

        let state = match (&record.verification_hash, &current) {
            (_, None) => TransclusionState::NoRecord,
            (Some(stored), Some(current)) if stored == current => TransclusionState::Unchanged,
            // Created after the host recorded it as missing.
            (None, Some(_)) => TransclusionState::NewVersion,
            (Some(stored), Some(_)) => {
                let query = VerificationQuery::for_page(&page).with_verification_hash(stored);
                if self.lookup.verification_entity_from_query(&query)?.is_some() {
                    TransclusionState::NewVersion
                } else {
                    warn!(
                        resource = %page,
                        stored = %stored,
                        "recorded hash not in resource history"
                    );
                    TransclusionState::Invalid
                }
            }
        };

        Ok(TransclusionStatus {
            title: page.prefixed_dbkey(),
            page,
            state,
            stored_hash: record.verification_hash.clone(),
            current_hash: current,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqua_chain::{save_revision, RevisionManipulator};
    use aqua_hash::HashingService;
    use aqua_model::{SlotRole, TransclusionHashes};
    use aqua_store::{InMemoryStore, RevisionStore};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn hashing() -> HashingService {
        HashingService::new("a1b2c3d4e5")
    }

    fn page(title: &str) -> PageRef {
        PageRef::parse(title).unwrap()
    }

    fn save(store: &mut InMemoryStore, title: &str, text: &str) -> String {
        let slots = BTreeMap::from([(SlotRole::Main, Slot::text(text))]);
        save_revision(store, &hashing(), &page(title), slots, Utc::now())
            .unwrap()
            .verification_hash()
            .to_string()
    }

    fn host(store: &mut InMemoryStore, records: Vec<TransclusionRecord>) -> Revision {
        let slots = BTreeMap::from([
            (SlotRole::Main, Slot::text("host")),
            (
                SlotRole::TransclusionHashes,
                Slot::TransclusionHashes(TransclusionHashes(records)),
            ),
        ]);
        let entity = save_revision(store, &hashing(), &page("Host"), slots, Utc::now()).unwrap();
        store.revision(entity.rev_id()).unwrap().unwrap()
    }

    fn states(store: &InMemoryStore, revision: &Revision) -> Vec<TransclusionState> {
        TransclusionManager::new(store)
            .get_transclusion_state(revision)
            .unwrap()
            .into_iter()
            .map(|s| s.state)
            .collect()
    }

    #[test]
    fn test_unchanged_when_hash_matches() {
        let mut store = InMemoryStore::new();
        let nav = save(&mut store, "Template:Nav", "v1");
        let rev = host(&mut store, vec![TransclusionRecord::new(&page("Template:Nav"), Some(nav))]);
        assert_eq!(states(&store, &rev), vec![TransclusionState::Unchanged]);
    }

    #[test]
    fn test_new_version_when_stored_hash_is_historical() {
        let mut store = InMemoryStore::new();
        let v1 = save(&mut store, "Template:Nav", "v1");
        let rev = host(&mut store, vec![TransclusionRecord::new(&page("Template:Nav"), Some(v1))]);
        save(&mut store, "Template:Nav", "v2");
        assert_eq!(states(&store, &rev), vec![TransclusionState::NewVersion]);
    }

    #[test]
    fn test_invalid_when_stored_hash_resolves_to_nothing() {
        let mut store = InMemoryStore::new();
        save(&mut store, "Template:Nav", "v1");
        let bogus = "f".repeat(128);
        let rev = host(
            &mut store,
            vec![TransclusionRecord::new(&page("Template:Nav"), Some(bogus))],
        );
        assert_eq!(states(&store, &rev), vec![TransclusionState::Invalid]);
    }

    #[test]
    fn test_hash_of_another_resource_is_invalid() {
        let mut store = InMemoryStore::new();
        let other = save(&mut store, "Template:Other", "x");
        save(&mut store, "Template:Nav", "v1");
        let rev = host(
            &mut store,
            vec![TransclusionRecord::new(&page("Template:Nav"), Some(other))],
        );
        assert_eq!(states(&store, &rev), vec![TransclusionState::Invalid]);
    }

    #[test]
    fn test_no_record_for_missing_and_deleted_resources() {
        let mut store = InMemoryStore::new();
        let gone = save(&mut store, "File:Gone.png", "bytes");
        let gone_id = store.latest_revision_id(&page("File:Gone.png")).unwrap().unwrap();
        let rev = host(
            &mut store,
            vec![
                TransclusionRecord::new(&page("Never"), None),
                TransclusionRecord::new(&page("File:Gone.png"), Some(gone)),
            ],
        );
        let hashing = hashing();
        RevisionManipulator::new(&mut store, &hashing)
            .delete_revisions(&[gone_id])
            .unwrap();
        assert_eq!(
            states(&store, &rev),
            vec![TransclusionState::NoRecord, TransclusionState::NoRecord]
        );
    }

    #[test]
    fn test_resource_created_after_scan_is_new_version() {
        let mut store = InMemoryStore::new();
        let rev = host(&mut store, vec![TransclusionRecord::new(&page("Later"), None)]);
        save(&mut store, "Later", "now exists");
        assert_eq!(states(&store, &rev), vec![TransclusionState::NewVersion]);
    }

    #[test]
    fn test_revision_without_slot_has_no_states() {
        let mut store = InMemoryStore::new();
        save(&mut store, "Plain", "text");
        let id = store.latest_revision_id(&page("Plain")).unwrap().unwrap();
        let rev = store.revision(id).unwrap().unwrap();
        assert!(states(&store, &rev).is_empty());
    }

    #[test]
    fn test_update_bumps_single_record() {
        let mut store = InMemoryStore::new();
        let v1 = save(&mut store, "Template:Nav", "v1");
        let logo = save(&mut store, "File:Logo.png", "png");
        let rev = host(
            &mut store,
            vec![
                TransclusionRecord::new(&page("Template:Nav"), Some(v1)),
                TransclusionRecord::new(&page("File:Logo.png"), Some(logo.clone())),
            ],
        );
        let v2 = save(&mut store, "Template:Nav", "v2");

        let manager = TransclusionManager::new(&store);
        let slot = manager
            .update_transclusion_hash(&rev, &page("Template:Nav"))
            .unwrap();
        let hashes = slot.as_transclusions().unwrap();
        assert_eq!(
            hashes.find(&page("Template:Nav")).unwrap().verification_hash,
            Some(v2)
        );
        assert_eq!(
            hashes.find(&page("File:Logo.png")).unwrap().verification_hash,
            Some(logo)
        );
        // The source revision is untouched.
        assert_eq!(states(&store, &rev)[0], TransclusionState::NewVersion);
    }

    #[test]
    fn test_update_rejects_unknown_resource() {
        let mut store = InMemoryStore::new();
        let rev = host(&mut store, vec![]);
        let err = TransclusionManager::new(&store)
            .update_transclusion_hash(&rev, &page("Nope"))
            .unwrap_err();
        assert!(matches!(err, TransclusionError::UnknownResource { .. }));
    }
}
