use crate::builder::RevisionVerificationBuilder;
use crate::error::ChainError;
use crate::ChainStore;
use aqua_hash::HashingService;
use aqua_model::{PageRef, Revision, Slot, SlotRole, VerificationEntity};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::info;

/// Save a new revision of `page` and record its verification entity.
///
/// The new revision's parent is the page's current latest revision. The
/// store's `&mut` borrow serializes concurrent saves, so the parent cannot
/// move between the lookup and the write.
pub fn save_revision<S: ChainStore + ?Sized>(
    store: &mut S,
    hashing: &HashingService,
    page: &PageRef,
    slots: BTreeMap<SlotRole, Slot>,
    timestamp: DateTime<Utc>,
) -> Result<VerificationEntity, ChainError> {
    if slots.is_empty() {
        return Err(ChainError::Validation(
            "a revision needs at least one slot".to_string(),
        ));
    }
    let parent_id = store.latest_revision_id(page)?;
    let rev_id = store.allocate_revision_id()?;
    let revision = Revision::new(rev_id, page.clone(), parent_id, timestamp, slots);

    let entity = {
        let builder = RevisionVerificationBuilder::new(&*store, &*store, hashing);
        builder.build_verification_data(&revision)?
    };

    store.put_revision(revision)?;
    store.upsert_verification_entity(entity.clone())?;
    store.set_latest(page, Some(rev_id))?;
    info!(
        page = %page,
        rev_id,
        verification_hash = %entity.verification_hash(),
        "saved revision"
    );
    Ok(entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqua_store::{InMemoryStore, RevisionStore, VerificationLookup};
    use chrono::TimeZone;

    fn slots(text: &str) -> BTreeMap<SlotRole, Slot> {
        BTreeMap::from([(SlotRole::Main, Slot::text(text))])
    }

    #[test]
    fn consecutive_saves_form_a_chain() {
        let mut store = InMemoryStore::new();
        let hashing = HashingService::new("dom");
        let page = PageRef::main("Chain").unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

        let mut previous = String::new();
        for i in 0..5 {
            let entity =
                save_revision(&mut store, &hashing, &page, slots(&format!("v{i}")), ts).unwrap();
            assert_eq!(entity.previous_verification_hash(), previous);
            previous = entity.verification_hash().to_string();
        }

        let latest = store.latest_revision_id(&page).unwrap().unwrap();
        let tip = store.verification_entity_from_title(&page).unwrap().unwrap();
        assert_eq!(tip.rev_id(), latest);
        assert_eq!(tip.verification_hash(), previous);
    }

    #[test]
    fn empty_slots_are_rejected() {
        let mut store = InMemoryStore::new();
        let hashing = HashingService::new("dom");
        let page = PageRef::main("Chain").unwrap();
        let err = save_revision(&mut store, &hashing, &page, BTreeMap::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, ChainError::Validation(_)));
        assert!(store.pages().unwrap().is_empty());
    }
}
