//! Command handlers for the `aqua` binary.

pub mod exchange;
pub mod history;
pub mod page;

use crate::config::AquaConfig;
use anyhow::{bail, Context, Result};
use aqua_model::PageRef;
use colored::Colorize;
use std::path::Path;

pub fn parse_title(title: &str) -> Result<PageRef> {
    PageRef::parse(title).with_context(|| format!("invalid page title {title:?}"))
}

/// Handle `aqua init`.
pub fn cmd_init(config_path: &Path, domain_id: Option<String>, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            config_path.display()
        );
    }
    let mut config = AquaConfig::generate();
    if let Some(domain_id) = domain_id {
        config.domain_id = domain_id;
    }
    config.validate()?;
    config.save(config_path)?;

    println!("{} Wrote {}", "✓".green(), config_path.display());
    println!("  {}: {}", "Domain ID".bold(), config.domain_id);
    println!(
        "  {}: {}",
        "Store".bold(),
        config.resolve_store_path(config_path).display()
    );
    Ok(())
}
