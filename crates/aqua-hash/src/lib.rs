//! Hashing primitives for the Aqua verification chain.
//!
//! Every hash in the chain is a SHA3-512 digest over the UTF-8 concatenation of
//! its inputs, rendered as 128 lowercase hex characters. Inputs are joined
//! without separators; existing chains depend on this exact layout, so the
//! order of fields passed to each `calculate_*` function must never change.
//!
//! # Example
//!
//! ```
//! use aqua_hash::HashingService;
//!
//! let hashing = HashingService::new("a1b2c3d4e5");
//! let content = hashing.calculate_content_hash(["Hello"]);
//! let metadata = hashing.calculate_metadata_hash("20240101120000", "");
//! let signature = hashing.calculate_signature_hash("", "");
//! let verification =
//!     hashing.calculate_verification_hash(&content, &metadata, &signature, "");
//! assert_eq!(verification.len(), aqua_hash::DIGEST_HEX_LEN);
//! ```

use chrono::{DateTime, Utc};
use sha3::{Digest, Sha3_512};

/// Length of a hex-encoded SHA3-512 digest.
pub const DIGEST_HEX_LEN: usize = 128;

/// Timestamp layout mixed into the metadata hash (`YYYYMMDDHHMMSS`).
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Digest a single string.
pub fn digest(input: &str) -> String {
    digest_parts(&[input])
}

/// Digest the concatenation of `parts` with no delimiter between them.
pub fn digest_parts(parts: &[&str]) -> String {
    let mut hasher = Sha3_512::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Digest raw bytes, such as an uploaded file.
pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha3_512::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Whether `value` looks like a digest produced by this crate.
pub fn is_digest(value: &str) -> bool {
    value.len() == DIGEST_HEX_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Render a timestamp the way it is fed into the metadata hash.
pub fn timestamp_string(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Merkle root over a list of leaf digests.
///
/// Leaves are paired left to right and each pair is digested as one
/// concatenation. An odd trailing leaf is promoted to the next level unchanged.
/// An empty list has an empty root.
pub fn merkle_root<S: AsRef<str>>(leaves: &[S]) -> String {
    if leaves.is_empty() {
        return String::new();
    }
    let mut level: Vec<String> = leaves.iter().map(|l| l.as_ref().to_string()).collect();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => digest_parts(&[left.as_str(), right.as_str()]),
                [single] => single.clone(),
                _ => unreachable!("chunks(2) yields one or two items"),
            })
            .collect();
    }
    level.remove(0)
}

/// Composes the primitives into the four per-revision hashes.
///
/// The service is bound to the domain id of the deployment producing the
/// chain and is otherwise stateless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashingService {
    domain_id: String,
}

impl HashingService {
    pub fn new(domain_id: impl Into<String>) -> Self {
        Self {
            domain_id: domain_id.into(),
        }
    }

    pub fn domain_id(&self) -> &str {
        &self.domain_id
    }

    /// Digest of every slot serialization concatenated in the given order.
    pub fn calculate_content_hash<I, S>(&self, slots: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut hasher = Sha3_512::new();
        for slot in slots {
            hasher.update(slot.as_ref().as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// `digest(domain_id + timestamp + previous_verification_hash)`.
    pub fn calculate_metadata_hash(
        &self,
        timestamp: &str,
        previous_verification_hash: &str,
    ) -> String {
        digest_parts(&[self.domain_id.as_str(), timestamp, previous_verification_hash])
    }

    /// `digest(signature + public_key)`. Unsigned revisions pass two empty
    /// strings and get the constant empty-signature digest.
    pub fn calculate_signature_hash(&self, signature: &str, public_key: &str) -> String {
        digest_parts(&[signature, public_key])
    }

    pub fn calculate_witness_hash(
        &self,
        genesis_hash: &str,
        merkle_root: &str,
        network: &str,
        tx_hash: &str,
    ) -> String {
        digest_parts(&[genesis_hash, merkle_root, network, tx_hash])
    }

    pub fn calculate_verification_hash(
        &self,
        content_hash: &str,
        metadata_hash: &str,
        signature_hash: &str,
        witness_hash: &str,
    ) -> String {
        digest_parts(&[content_hash, metadata_hash, signature_hash, witness_hash])
    }
}
