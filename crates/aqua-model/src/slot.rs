//! Tagged slot content.
//!
//! A revision stores one [`Slot`] per [`SlotRole`]. Each variant wraps its own
//! content type implementing [`SlotContent`], the capability set the chain
//! engine needs from content: a deterministic serialization for hashing, an
//! item count for display, and whether the content still needs user action.

use crate::page::PageRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Capabilities every slot content type provides.
pub trait SlotContent {
    /// Deterministic serialization fed into the content hash.
    fn serialized(&self) -> String;

    fn item_count(&self) -> usize;

    fn requires_action(&self) -> bool;
}

/// Role of a slot within a revision.
///
/// The derived ordering fixes the order slots are hashed in: the main slot
/// first, then the engine's own slots, then any other role by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SlotRole {
    Main,
    TransclusionHashes,
    FileVerification,
    Other(String),
}

impl SlotRole {
    pub fn as_str(&self) -> &str {
        match self {
            SlotRole::Main => "main",
            SlotRole::TransclusionHashes => "transclusion-hashes",
            SlotRole::FileVerification => "file-verification",
            SlotRole::Other(name) => name,
        }
    }
}

impl From<String> for SlotRole {
    fn from(value: String) -> Self {
        match value.as_str() {
            "main" => SlotRole::Main,
            "transclusion-hashes" => SlotRole::TransclusionHashes,
            "file-verification" => SlotRole::FileVerification,
            _ => SlotRole::Other(value),
        }
    }
}

impl From<SlotRole> for String {
    fn from(value: SlotRole) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SlotRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plain wikitext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent(pub String);

impl SlotContent for TextContent {
    fn serialized(&self) -> String {
        self.0.clone()
    }

    fn item_count(&self) -> usize {
        self.0.lines().count()
    }

    fn requires_action(&self) -> bool {
        false
    }
}

/// Structured JSON content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonContent(pub serde_json::Value);

impl SlotContent for JsonContent {
    fn serialized(&self) -> String {
        // serde_json::Value keeps object keys sorted, so this is stable.
        self.0.to_string()
    }

    fn item_count(&self) -> usize {
        match &self.0 {
            serde_json::Value::Object(map) => map.len(),
            serde_json::Value::Array(items) => items.len(),
            serde_json::Value::Null => 0,
            _ => 1,
        }
    }

    fn requires_action(&self) -> bool {
        false
    }
}

/// Digest of an uploaded file's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHashContent(pub String);

impl FileHashContent {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(aqua_hash::digest_bytes(bytes))
    }
}

impl SlotContent for FileHashContent {
    fn serialized(&self) -> String {
        self.0.clone()
    }

    fn item_count(&self) -> usize {
        usize::from(!self.0.is_empty())
    }

    fn requires_action(&self) -> bool {
        self.0.is_empty()
    }
}

/// Expected hash of one embedded resource at the time the host was scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransclusionRecord {
    pub dbkey: String,
    pub ns: i32,
    /// `None` when the resource did not exist at scan time.
    pub verification_hash: Option<String>,
}

impl TransclusionRecord {
    pub fn new(page: &PageRef, verification_hash: Option<String>) -> Self {
        Self {
            dbkey: page.dbkey.clone(),
            ns: page.namespace,
            verification_hash,
        }
    }

    pub fn page(&self) -> PageRef {
        PageRef {
            namespace: self.ns,
            dbkey: self.dbkey.clone(),
        }
    }
}

/// The transclusion records of a hosting revision.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransclusionHashes(pub Vec<TransclusionRecord>);

impl TransclusionHashes {
    pub fn records(&self) -> &[TransclusionRecord] {
        &self.0
    }

    pub fn find(&self, page: &PageRef) -> Option<&TransclusionRecord> {
        self.0
            .iter()
            .find(|r| r.ns == page.namespace && r.dbkey == page.dbkey)
    }

    /// New content with the record for `page` pointing at `hash`.
    ///
    /// Records for other resources are carried over unchanged; an unknown
    /// resource is appended.
    pub fn with_updated(&self, page: &PageRef, hash: Option<String>) -> Self {
        let mut records = self.0.clone();
        match records
            .iter_mut()
            .find(|r| r.ns == page.namespace && r.dbkey == page.dbkey)
        {
            Some(record) => record.verification_hash = hash,
            None => records.push(TransclusionRecord::new(page, hash)),
        }
        Self(records)
    }
}

impl SlotContent for TransclusionHashes {
    fn serialized(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_default()
    }

    fn item_count(&self) -> usize {
        self.0.len()
    }

    fn requires_action(&self) -> bool {
        self.0.iter().any(|r| r.verification_hash.is_none())
    }
}

/// Content stored in one slot of a revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", content = "data", rename_all = "kebab-case")]
pub enum Slot {
    Text(TextContent),
    Json(JsonContent),
    FileHash(FileHashContent),
    TransclusionHashes(TransclusionHashes),
}

impl Slot {
    pub fn text(text: impl Into<String>) -> Self {
        Slot::Text(TextContent(text.into()))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Slot::Text(TextContent(text)) => Some(text),
            _ => None,
        }
    }

    pub fn file_hash(bytes: &[u8]) -> Self {
        Slot::FileHash(FileHashContent::from_bytes(bytes))
    }

    pub fn as_transclusions(&self) -> Option<&TransclusionHashes> {
        match self {
            Slot::TransclusionHashes(hashes) => Some(hashes),
            _ => None,
        }
    }

    fn content(&self) -> &dyn SlotContent {
        match self {
            Slot::Text(c) => c,
            Slot::Json(c) => c,
            Slot::FileHash(c) => c,
            Slot::TransclusionHashes(c) => c,
        }
    }
}

impl SlotContent for Slot {
    fn serialized(&self) -> String {
        self.content().serialized()
    }

    fn item_count(&self) -> usize {
        self.content().item_count()
    }

    fn requires_action(&self) -> bool {
        self.content().requires_action()
    }
}
