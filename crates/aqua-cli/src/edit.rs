//! Saving page text together with its transclusion hashes, and file uploads.

use anyhow::{bail, Result};
use aqua_chain::{save_revision, ChainStore};
use aqua_hash::HashingService;
use aqua_model::{PageRef, Revision, Slot, SlotRole, VerificationEntity, NS_FILE};
use aqua_transclusion::TransclusionHashExtractor;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Save `text` as the next revision of `page`.
///
/// The revision gets a main slot with the text and a transclusion-hashes
/// slot recording the current hash of everything the text embeds.
pub fn edit_page<S: ChainStore + ?Sized>(
    store: &mut S,
    hashing: &HashingService,
    page: &PageRef,
    text: &str,
    timestamp: DateTime<Utc>,
) -> Result<VerificationEntity> {
    let transclusions =
        TransclusionHashExtractor::new(text, page.clone(), None, &*store).to_slot()?;
    let slots = BTreeMap::from([
        (SlotRole::Main, Slot::text(text)),
        (SlotRole::TransclusionHashes, transclusions),
    ]);
    Ok(save_revision(store, hashing, page, slots, timestamp)?)
}

/// Save a revision of the `File:` page `page` for an uploaded file.
///
/// `description` is handled like page text; the file's digest goes into the
/// file-verification slot.
pub fn upload_file<S: ChainStore + ?Sized>(
    store: &mut S,
    hashing: &HashingService,
    page: &PageRef,
    bytes: &[u8],
    description: &str,
    timestamp: DateTime<Utc>,
) -> Result<VerificationEntity> {
    if page.namespace != NS_FILE {
        bail!("{page} is not a File: page");
    }
    let transclusions =
        TransclusionHashExtractor::new(description, page.clone(), None, &*store).to_slot()?;
    let slots = BTreeMap::from([
        (SlotRole::Main, Slot::text(description)),
        (SlotRole::TransclusionHashes, transclusions),
        (SlotRole::FileVerification, Slot::file_hash(bytes)),
    ]);
    Ok(save_revision(store, hashing, page, slots, timestamp)?)
}

/// Save a copy of `base`'s content with the `role` slot replaced.
pub fn save_with_slot<S: ChainStore + ?Sized>(
    store: &mut S,
    hashing: &HashingService,
    base: &Revision,
    role: SlotRole,
    slot: Slot,
    timestamp: DateTime<Utc>,
) -> Result<VerificationEntity> {
    let mut slots = base.slots().clone();
    slots.insert(role, slot);
    Ok(save_revision(store, hashing, base.page(), slots, timestamp)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqua_store::{InMemoryStore, RevisionStore};
    use aqua_transclusion::{TransclusionManager, TransclusionState};

    #[test]
    fn test_edit_records_embedded_hashes() {
        let mut store = InMemoryStore::new();
        let hashing = HashingService::new("a1b2c3d4e5");
        let nav = PageRef::parse("Template:Nav").unwrap();
        let host = PageRef::parse("Host").unwrap();

        let nav_entity = edit_page(&mut store, &hashing, &nav, "nav v1", Utc::now()).unwrap();
        let host_entity =
            edit_page(&mut store, &hashing, &host, "{{Nav}} [[Missing]]", Utc::now()).unwrap();

        let revision = store.revision(host_entity.rev_id()).unwrap().unwrap();
        let records = revision.transclusions().unwrap().records();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].verification_hash.as_deref(),
            Some(nav_entity.verification_hash())
        );
        assert_eq!(records[1].verification_hash, None);
    }

    #[test]
    fn test_bumping_a_resource_makes_it_unchanged() {
        let mut store = InMemoryStore::new();
        let hashing = HashingService::new("a1b2c3d4e5");
        let nav = PageRef::parse("Template:Nav").unwrap();
        let host = PageRef::parse("Host").unwrap();

        edit_page(&mut store, &hashing, &nav, "v1", Utc::now()).unwrap();
        let saved = edit_page(&mut store, &hashing, &host, "{{Nav}}", Utc::now()).unwrap();
        edit_page(&mut store, &hashing, &nav, "v2", Utc::now()).unwrap();

        let revision = store.revision(saved.rev_id()).unwrap().unwrap();
        let slot = TransclusionManager::new(&store)
            .update_transclusion_hash(&revision, &nav)
            .unwrap();
        let bumped = save_with_slot(
            &mut store,
            &hashing,
            &revision,
            SlotRole::TransclusionHashes,
            slot,
            Utc::now(),
        )
        .unwrap();

        let revision = store.revision(bumped.rev_id()).unwrap().unwrap();
        let states = TransclusionManager::new(&store)
            .get_transclusion_state(&revision)
            .unwrap();
        assert_eq!(states[0].state, TransclusionState::Unchanged);
        assert_eq!(revision.main_text(), Some("{{Nav}}"));
    }

    #[test]
    fn test_upload_hashes_raw_bytes() {
        let mut store = InMemoryStore::new();
        let hashing = HashingService::new("a1b2c3d4e5");
        let logo = PageRef::parse("File:Logo.png").unwrap();

        let first =
            upload_file(&mut store, &hashing, &logo, &[0xff, 0x00], "", Utc::now()).unwrap();
        let second =
            upload_file(&mut store, &hashing, &logo, &[0xfe, 0x00], "", Utc::now()).unwrap();
        assert_ne!(first.content_hash(), second.content_hash());

        let revision = store.revision(second.rev_id()).unwrap().unwrap();
        assert_eq!(
            revision.slot(&SlotRole::FileVerification),
            Some(&Slot::file_hash(&[0xfe, 0x00]))
        );
    }

    #[test]
    fn test_upload_needs_a_file_page() {
        let mut store = InMemoryStore::new();
        let hashing = HashingService::new("a1b2c3d4e5");
        let page = PageRef::parse("Logo").unwrap();
        assert!(upload_file(&mut store, &hashing, &page, b"png", "", Utc::now()).is_err());
    }
}
