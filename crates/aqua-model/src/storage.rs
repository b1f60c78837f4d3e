//! Shapes exchanged with the storage and witness collaborators.

use serde::{Deserialize, Serialize};

pub type WitnessEventId = u64;

/// Stored verification data of one revision as read back by the builder.
///
/// `Default` is the genesis case: a revision whose parent has no record is
/// hashed against empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionVerificationData {
    pub verification_hash: String,
    pub signature: String,
    pub public_key: String,
    pub wallet_address: String,
    pub witness_event_id: Option<WitnessEventId>,
    #[serde(default)]
    pub genesis_hash: String,
}

impl RevisionVerificationData {
    pub fn is_empty(&self) -> bool {
        self.verification_hash.is_empty()
    }
}

/// Witness material of one witness event as returned by the oracle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessData {
    pub domain_manifest_verification_hash: String,
    pub merkle_root: String,
    pub witness_network: String,
    pub witness_event_transaction_hash: String,
}
