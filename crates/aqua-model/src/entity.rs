//! The verification record of one revision.

use crate::page::PageRef;
use crate::revision::RevisionId;
use crate::storage::{RevisionVerificationData, WitnessEventId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The six hashes stored per revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationHashes {
    pub content_hash: String,
    pub metadata_hash: String,
    pub signature_hash: String,
    pub previous_verification_hash: String,
    pub verification_hash: String,
    pub genesis_hash: String,
}

/// Where an entity came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    #[default]
    Default,
    Import,
    Verify,
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceTag::Default => "default",
            SourceTag::Import => "import",
            SourceTag::Verify => "verify",
        };
        f.write_str(name)
    }
}

/// Signature fields of an entity. All empty while the revision is unsigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureMaterial {
    pub signature: String,
    pub public_key: String,
    pub wallet_address: String,
}

impl SignatureMaterial {
    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }
}

/// Immutable snapshot of one revision's verification record.
///
/// Persisted entities are never edited in place; a recomputation or signing
/// step derives a new entity with the `with_*` methods and the store replaces
/// the row keyed by revision id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationEntity {
    page: PageRef,
    rev_id: RevisionId,
    domain_id: String,
    hashes: VerificationHashes,
    time_stamp: DateTime<Utc>,
    #[serde(default)]
    signature: SignatureMaterial,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    witness_event_id: Option<WitnessEventId>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    verification_context: serde_json::Value,
    #[serde(default)]
    source: SourceTag,
}

impl VerificationEntity {
    pub fn new(
        page: PageRef,
        rev_id: RevisionId,
        domain_id: impl Into<String>,
        hashes: VerificationHashes,
        time_stamp: DateTime<Utc>,
    ) -> Self {
        Self {
            page,
            rev_id,
            domain_id: domain_id.into(),
            hashes,
            time_stamp,
            signature: SignatureMaterial::default(),
            witness_event_id: None,
            verification_context: serde_json::Value::Null,
            source: SourceTag::Default,
        }
    }

    pub fn page(&self) -> &PageRef {
        &self.page
    }

    pub fn rev_id(&self) -> RevisionId {
        self.rev_id
    }

    pub fn domain_id(&self) -> &str {
        &self.domain_id
    }

    pub fn hashes(&self) -> &VerificationHashes {
        &self.hashes
    }

    pub fn content_hash(&self) -> &str {
        &self.hashes.content_hash
    }

    pub fn metadata_hash(&self) -> &str {
        &self.hashes.metadata_hash
    }

    pub fn signature_hash(&self) -> &str {
        &self.hashes.signature_hash
    }

    pub fn previous_verification_hash(&self) -> &str {
        &self.hashes.previous_verification_hash
    }

    pub fn verification_hash(&self) -> &str {
        &self.hashes.verification_hash
    }

    pub fn genesis_hash(&self) -> &str {
        &self.hashes.genesis_hash
    }

    pub fn is_genesis(&self) -> bool {
        self.hashes.previous_verification_hash.is_empty()
    }

    pub fn time_stamp(&self) -> &DateTime<Utc> {
        &self.time_stamp
    }

    pub fn signature_material(&self) -> &SignatureMaterial {
        &self.signature
    }

    pub fn signature(&self) -> &str {
        &self.signature.signature
    }

    pub fn public_key(&self) -> &str {
        &self.signature.public_key
    }

    pub fn wallet_address(&self) -> &str {
        &self.signature.wallet_address
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_signed()
    }

    pub fn witness_event_id(&self) -> Option<WitnessEventId> {
        self.witness_event_id
    }

    pub fn verification_context(&self) -> &serde_json::Value {
        &self.verification_context
    }

    pub fn source(&self) -> SourceTag {
        self.source
    }

    /// The subset of this record a child revision hashes against.
    pub fn to_verification_data(&self) -> RevisionVerificationData {
        RevisionVerificationData {
            verification_hash: self.hashes.verification_hash.clone(),
            signature: self.signature.signature.clone(),
            public_key: self.signature.public_key.clone(),
            wallet_address: self.signature.wallet_address.clone(),
            witness_event_id: self.witness_event_id,
            genesis_hash: self.hashes.genesis_hash.clone(),
        }
    }

    pub fn with_hashes(mut self, hashes: VerificationHashes) -> Self {
        self.hashes = hashes;
        self
    }

    pub fn with_rev_id(mut self, rev_id: RevisionId) -> Self {
        self.rev_id = rev_id;
        self
    }

    pub fn with_page(mut self, page: PageRef) -> Self {
        self.page = page;
        self
    }

    pub fn with_signature(mut self, signature: SignatureMaterial) -> Self {
        self.signature = signature;
        self
    }

    pub fn with_witness_event(mut self, witness_event_id: Option<WitnessEventId>) -> Self {
        self.witness_event_id = witness_event_id;
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.verification_context = context;
        self
    }

    pub fn with_source(mut self, source: SourceTag) -> Self {
        self.source = source;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn entity() -> VerificationEntity {
        let hashes = VerificationHashes {
            verification_hash: "vh".into(),
            genesis_hash: "gh".into(),
            ..Default::default()
        };
        VerificationEntity::new(
            PageRef::main("Test").unwrap(),
            4,
            "dom",
            hashes,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn witness_event_accessor_returns_event_id_not_wallet() {
        let signed = entity()
            .with_signature(SignatureMaterial {
                signature: "sig".into(),
                public_key: "pk".into(),
                wallet_address: "0xwallet".into(),
            })
            .with_witness_event(Some(42));

        assert_eq!(signed.witness_event_id(), Some(42));
        assert_eq!(signed.wallet_address(), "0xwallet");
        assert_eq!(signed.to_verification_data().witness_event_id, Some(42));
    }

    #[test]
    fn new_entity_is_unsigned_default_source() {
        let e = entity();
        assert!(!e.is_signed());
        assert_eq!(e.source(), SourceTag::Default);
        assert_eq!(e.witness_event_id(), None);
        assert!(e.is_genesis());
    }

    #[test]
    fn with_methods_leave_original_untouched() {
        let original = entity();
        let imported = original.clone().with_source(SourceTag::Import);
        assert_eq!(original.source(), SourceTag::Default);
        assert_eq!(imported.source(), SourceTag::Import);
    }

    #[test]
    fn serde_round_trip_keeps_context() {
        let e = entity().with_context(json!({"imported_from": "remote"}));
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"source\":\"default\""));
        let back: VerificationEntity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn verification_data_carries_parent_fields() {
        let data = entity().to_verification_data();
        assert_eq!(data.verification_hash, "vh");
        assert_eq!(data.genesis_hash, "gh");
        assert!(data.signature.is_empty());
    }
}
