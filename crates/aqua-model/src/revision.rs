//! Revisions as supplied by the host document store.

use crate::page::PageRef;
use crate::slot::{Slot, SlotContent, SlotRole, TransclusionHashes};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type RevisionId = u64;

/// One saved revision of a page.
///
/// Revisions are values: structural edits produce a new `Revision` through
/// the `with_*` methods instead of mutating an existing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    id: RevisionId,
    page: PageRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_id: Option<RevisionId>,
    timestamp: DateTime<Utc>,
    slots: BTreeMap<SlotRole, Slot>,
}

impl Revision {
    pub fn new(
        id: RevisionId,
        page: PageRef,
        parent_id: Option<RevisionId>,
        timestamp: DateTime<Utc>,
        slots: BTreeMap<SlotRole, Slot>,
    ) -> Self {
        Self {
            id,
            page,
            parent_id,
            timestamp,
            slots,
        }
    }

    pub fn id(&self) -> RevisionId {
        self.id
    }

    pub fn page(&self) -> &PageRef {
        &self.page
    }

    pub fn parent_id(&self) -> Option<RevisionId> {
        self.parent_id
    }

    pub fn timestamp(&self) -> &DateTime<Utc> {
        &self.timestamp
    }

    /// Slots in hashing order.
    pub fn slots(&self) -> &BTreeMap<SlotRole, Slot> {
        &self.slots
    }

    pub fn slot(&self, role: &SlotRole) -> Option<&Slot> {
        self.slots.get(role)
    }

    pub fn main_text(&self) -> Option<&str> {
        self.slot(&SlotRole::Main).and_then(Slot::as_text)
    }

    pub fn transclusions(&self) -> Option<&TransclusionHashes> {
        self.slot(&SlotRole::TransclusionHashes)
            .and_then(Slot::as_transclusions)
    }

    /// Serialized slot contents in role order, as fed into the content hash.
    pub fn slot_serializations(&self) -> Vec<String> {
        self.slots.values().map(SlotContent::serialized).collect()
    }

    pub fn with_id(mut self, id: RevisionId) -> Self {
        self.id = id;
        self
    }

    pub fn with_page(mut self, page: PageRef) -> Self {
        self.page = page;
        self
    }

    pub fn with_parent(mut self, parent_id: Option<RevisionId>) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_slot(mut self, role: SlotRole, slot: Slot) -> Self {
        self.slots.insert(role, slot);
        self
    }
}
