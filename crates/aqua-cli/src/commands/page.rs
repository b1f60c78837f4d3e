//! Page editing and inspection commands.

use crate::commands::parse_title;
use crate::edit::{edit_page, save_with_slot, upload_file};
use crate::workspace::Workspace;
use anyhow::{anyhow, Context, Result};
use aqua_chain::verify_page;
use aqua_hash::timestamp_string;
use aqua_model::{RevisionId, SlotRole, VerificationEntity, WitnessEventId};
use aqua_store::{RevisionStore, VerificationLookup, VerificationQuery};
use aqua_transclusion::{TransclusionManager, TransclusionState};
use chrono::Utc;
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// The `GET /verify_page/{rev_id}` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyPageResponse {
    pub rev_id: RevisionId,
    pub domain_id: String,
    pub verification_hash: String,
    pub time_stamp: String,
    pub signature: String,
    pub public_key: String,
    pub wallet_address: String,
    pub witness_event_id: Option<WitnessEventId>,
}

impl From<&VerificationEntity> for VerifyPageResponse {
    fn from(entity: &VerificationEntity) -> Self {
        Self {
            rev_id: entity.rev_id(),
            domain_id: entity.domain_id().to_string(),
            verification_hash: entity.verification_hash().to_string(),
            time_stamp: timestamp_string(entity.time_stamp()),
            signature: entity.signature().to_string(),
            public_key: entity.public_key().to_string(),
            wallet_address: entity.wallet_address().to_string(),
            witness_event_id: entity.witness_event_id(),
        }
    }
}

/// Handle `aqua edit`.
pub fn cmd_edit(
    ws: &mut Workspace,
    title: &str,
    text: Option<String>,
    file: Option<PathBuf>,
) -> Result<()> {
    let page = parse_title(title)?;
    let text = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => anyhow::bail!("pass --text or --file"),
    };
    let entity = edit_page(&mut ws.store, &ws.hashing, &page, &text, Utc::now())?;
    ws.save()?;

    println!(
        "{} Saved revision {} of {}",
        "✓".green(),
        entity.rev_id().to_string().cyan(),
        page
    );
    println!("  {}: {}", "Verification Hash".bold(), entity.verification_hash());
    Ok(())
}

/// Handle `aqua upload`.
pub fn cmd_upload(ws: &mut Workspace, title: &str, file: &Path, description: &str) -> Result<()> {
    let page = parse_title(title)?;
    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let entity = upload_file(&mut ws.store, &ws.hashing, &page, &bytes, description, Utc::now())?;
    ws.save()?;

    println!(
        "{} Saved revision {} of {} ({} bytes)",
        "✓".green(),
        entity.rev_id().to_string().cyan(),
        page,
        bytes.len()
    );
    println!("  {}: {}", "Content Hash".bold(), entity.content_hash());
    Ok(())
}

/// Handle `aqua log`.
pub fn cmd_log(ws: &Workspace, title: &str) -> Result<()> {
    let page = parse_title(title)?;
    let entities = ws
        .store
        .all_verification_entities_from_query(&VerificationQuery::for_page(&page))?;
    if entities.is_empty() {
        println!("{}", "No revisions".yellow());
        return Ok(());
    }

    println!("{}", format!("Revisions of {page}").bold().underline());
    for entity in &entities {
        println!(
            "{} {}",
            "Revision".bold().cyan(),
            entity.rev_id().to_string().cyan()
        );
        println!("  {}: {}", "Timestamp".bold(), timestamp_string(entity.time_stamp()));
        println!("  {}: {}", "Verification Hash".bold(), entity.verification_hash());
        if entity.is_genesis() {
            println!("  {}: {}", "Previous".bold(), "genesis".yellow());
        } else {
            println!("  {}: {}", "Previous".bold(), entity.previous_verification_hash());
        }
        if entity.is_signed() {
            println!("  {}: {}", "Signed By".bold(), entity.wallet_address().green());
        } else {
            println!("  {}: {}", "Signature".bold(), "none".yellow());
        }
        if let Some(id) = entity.witness_event_id() {
            println!("  {}: {}", "Witness Event".bold(), id);
        }
        println!("  {}: {}", "Source".bold(), entity.source());
        println!();
    }
    Ok(())
}

/// Handle `aqua show`, printing the verify-page JSON for one revision.
pub fn cmd_show(ws: &Workspace, rev_id: RevisionId) -> Result<()> {
    let entity = ws
        .store
        .verification_entity_from_rev_id(rev_id)?
        .ok_or_else(|| anyhow!("revision {rev_id} not found"))?;
    let body = VerifyPageResponse::from(&entity);
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

/// Handle `aqua verify`.
pub fn cmd_verify(ws: &Workspace, title: &str) -> Result<()> {
    let page = parse_title(title)?;
    let report = verify_page(&ws.store, &page).context("chain verification failed")?;

    println!("{} Hash chain valid", "✓".green().bold());
    println!();
    println!("{}", "Summary:".bold().underline());
    println!("  {}: {}", "Page".bold(), report.page);
    println!("  {}: {}", "Revisions".bold(), report.revisions);
    println!("  {}: {}", "Signed".bold(), report.signed);
    println!("  {}: {}", "Witnessed".bold(), report.witnessed);
    println!("  {}: {}", "Status".bold(), "VALID".green().bold());
    Ok(())
}

/// Handle `aqua transclusions`.
pub fn cmd_transclusions(ws: &Workspace, title: &str, rev_id: Option<RevisionId>) -> Result<()> {
    let page = parse_title(title)?;
    let rev_id = match rev_id {
        Some(id) => id,
        None => ws
            .store
            .latest_revision_id(&page)?
            .ok_or_else(|| anyhow!("page {page} has no revisions"))?,
    };
    let revision = ws.store.revision_or_err(rev_id)?;
    let states = TransclusionManager::new(&ws.store).get_transclusion_state(&revision)?;
    if states.is_empty() {
        println!("{}", "No embedded resources".yellow());
        return Ok(());
    }

    println!("{}", format!("Embedded in revision {rev_id}").bold().underline());
    for status in &states {
        let state = match status.state {
            TransclusionState::Unchanged => status.state.to_string().green(),
            TransclusionState::NewVersion => status.state.to_string().yellow(),
            TransclusionState::NoRecord => status.state.to_string().dimmed(),
            TransclusionState::Invalid => status.state.to_string().red().bold(),
        };
        println!("  {:<40} {}", status.title, state);
    }
    Ok(())
}

/// Handle `aqua refresh`: save a new revision of `title` recording the
/// current hash of `resource`.
pub fn cmd_refresh(ws: &mut Workspace, title: &str, resource: &str) -> Result<()> {
    let page = parse_title(title)?;
    let resource = parse_title(resource)?;
    let latest = ws
        .store
        .latest_revision_id(&page)?
        .ok_or_else(|| anyhow!("page {page} has no revisions"))?;
    let revision = ws.store.revision_or_err(latest)?;
    let slot = TransclusionManager::new(&ws.store).update_transclusion_hash(&revision, &resource)?;
    let entity = save_with_slot(
        &mut ws.store,
        &ws.hashing,
        &revision,
        SlotRole::TransclusionHashes,
        slot,
        Utc::now(),
    )?;
    ws.save()?;

    println!(
        "{} Recorded current hash of {} in revision {}",
        "✓".green(),
        resource,
        entity.rev_id().to_string().cyan()
    );
    Ok(())
}
