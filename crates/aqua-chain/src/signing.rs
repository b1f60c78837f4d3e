//! Ed25519 signing of revisions.
//!
//! A revision is saved unsigned. Signing later moves it from `Unsigned` to
//! `Signed`: only the signature fields of its own record change, and because
//! each child's signature hash consumes its parent's signature, every later
//! revision of the page is re-derived.

use crate::cascade;
use crate::error::ChainError;
use crate::ChainStore;
use aqua_hash::HashingService;
use aqua_model::{RevisionId, SignatureMaterial, VerificationEntity};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use sha3::{Digest, Sha3_256};
use tracing::info;

/// An Ed25519 signing identity and the wallet address its signatures carry.
#[derive(Clone)]
pub struct SignerKey {
    signing_key: SigningKey,
}

impl SignerKey {
    /// Fresh identity from the thread-local RNG.
    pub fn generate() -> Self {
        let mut private_bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut private_bytes);
        Self::from_private_bytes(&private_bytes)
    }

    pub fn from_private_bytes(private_key: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(private_key),
        }
    }

    pub fn private_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn public_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn wallet_address(&self) -> String {
        wallet_address(&self.public_bytes())
    }

    fn sign_hash(&self, verification_hash: &str) -> SignatureMaterial {
        let signature = self
            .signing_key
            .sign(signature_message(verification_hash).as_bytes());
        SignatureMaterial {
            signature: hex::encode(signature.to_bytes()),
            public_key: hex::encode(self.public_bytes()),
            wallet_address: self.wallet_address(),
        }
    }
}

impl std::fmt::Debug for SignerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerKey")
            .field("wallet_address", &self.wallet_address())
            .finish_non_exhaustive()
    }
}

/// The message a signer commits to for a given verification hash.
pub fn signature_message(verification_hash: &str) -> String {
    format!("I sign the following page verification_hash: [0x{verification_hash}]")
}

/// Wallet address derived from a public key: `0x` and the last 20 bytes of
/// its SHA3-256 digest.
pub fn wallet_address(public_key: &[u8; 32]) -> String {
    let digest = Sha3_256::digest(public_key);
    format!("0x{}", hex::encode(&digest[12..]))
}

/// Sign revision `rev_id` as `signer`.
///
/// Fails with [`ChainError::AlreadySigned`] if the revision carries a
/// signature. Later revisions are re-derived before anything is written.
pub fn sign_revision<S: ChainStore + ?Sized>(
    store: &mut S,
    hashing: &HashingService,
    rev_id: RevisionId,
    signer: &SignerKey,
) -> Result<VerificationEntity, ChainError> {
    let entity = store
        .verification_entity_from_rev_id(rev_id)?
        .ok_or_else(|| ChainError::revision_not_found(rev_id))?;
    if entity.is_signed() {
        return Err(ChainError::AlreadySigned(rev_id));
    }

    let signed = entity
        .clone()
        .with_signature(signer.sign_hash(entity.verification_hash()));

    let page = signed.page().clone();
    let descendants = cascade::rederive_after(
        &*store,
        hashing,
        &page,
        rev_id,
        signed.to_verification_data(),
    )?;
    let rederived = descendants.len();

    store.upsert_verification_entity(signed.clone())?;
    cascade::commit(store, descendants)?;
    info!(
        rev_id,
        wallet = %signed.wallet_address(),
        rederived,
        "signed revision"
    );
    Ok(signed)
}

/// Whether the entity's signature verifies against its public key and hash.
///
/// Unsigned entities and malformed signature material return `false`.
pub fn verify_entity_signature(entity: &VerificationEntity) -> bool {
    let Ok(sig_bytes) = hex::decode(entity.signature()) else {
        return false;
    };
    let Ok(sig_array) = <[u8; 64]>::try_from(sig_bytes.as_slice()) else {
        return false;
    };
    let Ok(key_bytes) = hex::decode(entity.public_key()) else {
        return false;
    };
    let Ok(key_array) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&key_array) else {
        return false;
    };
    if entity.wallet_address() != wallet_address(&key_array) {
        return false;
    }
    let signature = ed25519_dalek::Signature::from_bytes(&sig_array);
    verifying_key
        .verify(
            signature_message(entity.verification_hash()).as_bytes(),
            &signature,
        )
        .is_ok()
}
