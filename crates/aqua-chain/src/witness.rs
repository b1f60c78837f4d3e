//! Linking page tips to an external witness event.

use crate::error::ChainError;
use crate::ChainStore;
use aqua_hash::{digest_parts, merkle_root};
use aqua_model::{PageRef, RevisionId, WitnessData, WitnessEventId};
use aqua_store::WitnessEventStore;
use tracing::info;

/// Result of recording a witness event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessReceipt {
    pub witness_event_id: WitnessEventId,
    pub data: WitnessData,
    /// Revisions newly linked to the event; empty on a repeated call.
    pub linked: Vec<RevisionId>,
}

/// Record that the latest revisions of `pages` were committed to a ledger in
/// transaction `transaction_hash` on `network`.
///
/// The ledger submission itself happens outside this crate. The event is
/// keyed by transaction hash, so retrying with the same transaction returns
/// the existing event and links nothing twice.
pub fn record_witness_event<S>(
    store: &mut S,
    pages: &[PageRef],
    network: &str,
    transaction_hash: &str,
) -> Result<WitnessReceipt, ChainError>
where
    S: ChainStore + WitnessEventStore + ?Sized,
{
    if pages.is_empty() {
        return Err(ChainError::Validation(
            "a witness event needs at least one page".to_string(),
        ));
    }
    if transaction_hash.is_empty() {
        return Err(ChainError::Validation(
            "a witness event needs a transaction hash".to_string(),
        ));
    }

    let mut tips = Vec::with_capacity(pages.len());
    for page in pages {
        let tip = store
            .verification_entity_from_title(page)?
            .ok_or_else(|| ChainError::NotFound(format!("page {page}")))?;
        tips.push(tip);
    }

    let leaves: Vec<&str> = tips.iter().map(|t| t.verification_hash()).collect();
    let manifest: Vec<String> = tips
        .iter()
        .map(|t| format!("{}{}", t.page().prefixed_dbkey(), t.verification_hash()))
        .collect();
    let manifest_refs: Vec<&str> = manifest.iter().map(String::as_str).collect();
    let data = WitnessData {
        domain_manifest_verification_hash: digest_parts(&manifest_refs),
        merkle_root: merkle_root(&leaves),
        witness_network: network.to_string(),
        witness_event_transaction_hash: transaction_hash.to_string(),
    };

    let witness_event_id = store.store_witness_event(data.clone())?;
    let mut linked = Vec::new();
    for tip in tips {
        if tip.witness_event_id() == Some(witness_event_id) {
            continue;
        }
        let rev_id = tip.rev_id();
        store.upsert_verification_entity(tip.with_witness_event(Some(witness_event_id)))?;
        linked.push(rev_id);
    }

    info!(
        witness_event_id,
        network,
        linked = linked.len(),
        "recorded witness event"
    );
    Ok(WitnessReceipt {
        witness_event_id,
        data,
        linked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::save_revision;
    use crate::verify::verify_page;
    use aqua_hash::HashingService;
    use aqua_model::{Slot, SlotRole};
    use aqua_store::{InMemoryStore, VerificationLookup, WitnessOracle};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn save(store: &mut InMemoryStore, page: &PageRef, text: &str) {
        let hashing = HashingService::new("dom");
        let slots = BTreeMap::from([(SlotRole::Main, Slot::text(text))]);
        save_revision(store, &hashing, page, slots, Utc::now()).unwrap();
    }

    #[test]
    fn witness_links_tips_and_is_idempotent() {
        let mut store = InMemoryStore::new();
        let a = PageRef::main("A").unwrap();
        let b = PageRef::main("B").unwrap();
        save(&mut store, &a, "a1");
        save(&mut store, &b, "b1");

        let pages = [a.clone(), b.clone()];
        let receipt = record_witness_event(&mut store, &pages, "sepolia", "0xfeed").unwrap();
        assert_eq!(receipt.linked, vec![1, 2]);
        assert_eq!(
            store.get_witness_data(receipt.witness_event_id).unwrap(),
            Some(receipt.data.clone())
        );
        let tip = store.verification_entity_from_title(&a).unwrap().unwrap();
        assert_eq!(tip.witness_event_id(), Some(receipt.witness_event_id));

        let again = record_witness_event(&mut store, &pages, "sepolia", "0xfeed").unwrap();
        assert_eq!(again.witness_event_id, receipt.witness_event_id);
        assert!(again.linked.is_empty());
    }

    #[test]
    fn next_revision_seals_witness_hash() {
        let mut store = InMemoryStore::new();
        let page = PageRef::main("A").unwrap();
        save(&mut store, &page, "a1");
        let receipt =
            record_witness_event(&mut store, &[page.clone()], "sepolia", "0xbeef").unwrap();
        save(&mut store, &page, "a2");

        let child = store.verification_entity_from_rev_id(2).unwrap().unwrap();
        let hashing = HashingService::new("dom");
        let witness_hash = hashing.calculate_witness_hash(
            &receipt.data.domain_manifest_verification_hash,
            &receipt.data.merkle_root,
            "sepolia",
            "0xbeef",
        );
        assert_eq!(
            child.verification_hash(),
            hashing.calculate_verification_hash(
                child.content_hash(),
                child.metadata_hash(),
                child.signature_hash(),
                &witness_hash,
            )
        );
        assert_eq!(verify_page(&store, &page).unwrap().witnessed, 1);
    }

    #[test]
    fn witness_requires_existing_pages() {
        let mut store = InMemoryStore::new();
        let missing = PageRef::main("Missing").unwrap();
        let err = record_witness_event(&mut store, &[missing], "sepolia", "0x1").unwrap_err();
        assert!(matches!(err, ChainError::NotFound(_)));
    }
}
