//! Commands that rewrite or annotate page history.

use crate::commands::parse_title;
use crate::workspace::Workspace;
use anyhow::{bail, Context, Result};
use aqua_chain::{
    record_witness_event, sign_revision, ManipulationReport, RevisionManipulator, SignerKey,
};
use aqua_model::RevisionId;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Keypair file written by `aqua keygen` and read by `aqua sign`.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeyFile {
    pub private_key: String,
    pub public_key: String,
    pub wallet_address: String,
}

impl KeyFile {
    pub fn from_signer(signer: &SignerKey) -> Self {
        Self {
            private_key: hex::encode(signer.private_bytes()),
            public_key: hex::encode(signer.public_bytes()),
            wallet_address: signer.wallet_address(),
        }
    }

    /// Rebuild the signer, checking the stored public key and wallet against it.
    pub fn signer(&self) -> Result<SignerKey> {
        let bytes = hex::decode(&self.private_key).context("private key is not valid hex")?;
        let Ok(private_key) = <[u8; 32]>::try_from(bytes.as_slice()) else {
            bail!("private key must be 32 bytes");
        };
        let signer = SignerKey::from_private_bytes(&private_key);
        if hex::encode(signer.public_bytes()) != self.public_key {
            bail!("public key does not belong to the private key");
        }
        if signer.wallet_address() != self.wallet_address {
            bail!("wallet address does not belong to the private key");
        }
        Ok(signer)
    }
}

/// Handle `aqua keygen`.
pub fn cmd_keygen(output: Option<PathBuf>) -> Result<()> {
    let signer = SignerKey::generate();
    let key_file = KeyFile::from_signer(&signer);

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&key_file)?;
        fs::write(&path, json)
            .with_context(|| format!("failed to write keypair to {}", path.display()))?;
        println!("{} Keypair written to {}", "✓".green(), path.display());
        println!("  {}: {}", "Wallet".bold(), key_file.wallet_address);
    } else {
        println!("{}", "Generated Signer Identity".bold().underline());
        println!("{}: {}", "Wallet".bold().cyan(), key_file.wallet_address);
        println!("{}: {}", "Public Key".bold().green(), key_file.public_key);
        println!("{}: {}", "Private Key".bold().red(), key_file.private_key);
        println!();
        println!("{}", "Signatures made with this key show the wallet above.".yellow());
    }

    Ok(())
}

/// Read the signer from a key file written by `aqua keygen`.
pub fn read_signer(path: &Path) -> Result<SignerKey> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read key file {}", path.display()))?;
    let key_file: KeyFile = serde_json::from_str(&json).context("failed to parse key file")?;
    key_file.signer()
}

/// Handle `aqua sign`.
pub fn cmd_sign(ws: &mut Workspace, rev_id: RevisionId, key_file: &Path) -> Result<()> {
    let signer = read_signer(key_file)?;
    let entity = sign_revision(&mut ws.store, &ws.hashing, rev_id, &signer)
        .with_context(|| format!("failed to sign revision {rev_id}"))?;
    ws.save()?;

    println!("{} Signed revision {}", "✓".green(), rev_id.to_string().cyan());
    println!("  {}: {}", "Wallet".bold(), entity.wallet_address());
    println!("  {}: {}", "Verification Hash".bold(), entity.verification_hash());
    Ok(())
}

/// Handle `aqua delete`.
pub fn cmd_delete(ws: &mut Workspace, ids: &[RevisionId]) -> Result<()> {
    let report = RevisionManipulator::new(&mut ws.store, &ws.hashing)
        .delete_revisions(ids)
        .context("failed to delete revisions")?;
    ws.save()?;
    print_report("Deleted", &report);
    Ok(())
}

/// Handle `aqua squash`.
pub fn cmd_squash(ws: &mut Workspace, ids: &[RevisionId]) -> Result<()> {
    let report = RevisionManipulator::new(&mut ws.store, &ws.hashing)
        .squash_revisions(ids)
        .context("failed to squash revisions")?;
    ws.save()?;
    print_report("Squashed", &report);
    Ok(())
}

fn print_report(action: &str, report: &ManipulationReport) {
    let removed: Vec<String> = report.removed.iter().map(ToString::to_string).collect();
    println!(
        "{} {} revisions [{}] of {}",
        "✓".green(),
        action,
        removed.join(", "),
        report.page
    );
    println!("  {}: {}", "Re-derived".bold(), report.rederived.len());
    match report.latest {
        Some(id) => println!("  {}: {}", "Latest".bold(), id),
        None => println!("  {}: {}", "Latest".bold(), "page removed".yellow()),
    }
}

/// Handle `aqua witness`.
pub fn cmd_witness(
    ws: &mut Workspace,
    titles: &[String],
    transaction_hash: &str,
    network: Option<String>,
) -> Result<()> {
    let pages = titles
        .iter()
        .map(|t| parse_title(t))
        .collect::<Result<Vec<_>>>()?;
    let network = network.unwrap_or_else(|| ws.config.witness_network.clone());
    let receipt = record_witness_event(&mut ws.store, &pages, &network, transaction_hash)
        .context("failed to record witness event")?;
    ws.save()?;

    println!(
        "{} Witness event {}",
        "✓".green(),
        receipt.witness_event_id.to_string().cyan()
    );
    println!("  {}: {}", "Network".bold(), receipt.data.witness_network);
    println!("  {}: {}", "Merkle Root".bold(), receipt.data.merkle_root);
    if receipt.linked.is_empty() {
        println!("  {}: {}", "Linked".bold(), "already recorded".yellow());
    } else {
        let linked: Vec<String> = receipt.linked.iter().map(ToString::to_string).collect();
        println!("  {}: [{}]", "Linked".bold(), linked.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_key_file_round_trip_keeps_wallet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("key.json");
        cmd_keygen(Some(path.clone())).unwrap();

        let stored: KeyFile = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let signer = read_signer(&path).unwrap();
        assert_eq!(signer.wallet_address(), stored.wallet_address);
        assert_ne!(signer.private_bytes(), [0u8; 32]);
    }

    #[test]
    fn test_read_signer_rejects_short_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("key.json");
        fs::write(
            &path,
            r#"{"private_key": "abcd", "public_key": "", "wallet_address": ""}"#,
        )
        .unwrap();
        assert!(read_signer(&path).is_err());
    }

    #[test]
    fn test_read_signer_rejects_mismatched_wallet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("key.json");
        let mut key_file = KeyFile::from_signer(&SignerKey::generate());
        key_file.wallet_address = SignerKey::generate().wallet_address();
        fs::write(&path, serde_json::to_string(&key_file).unwrap()).unwrap();
        assert!(read_signer(&path).is_err());
    }
}
