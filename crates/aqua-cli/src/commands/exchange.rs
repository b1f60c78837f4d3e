//! Moving page histories between installations.

use crate::commands::parse_title;
use crate::workspace::Workspace;
use anyhow::{Context, Result};
use aqua_chain::{export_page, import_export, parse_export};
use aqua_inbox::{fast_forward, NodeSource, TreeBuilder};
use aqua_model::RevisionId;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

/// Handle `aqua export`.
pub fn cmd_export(
    ws: &Workspace,
    title: &str,
    range: Option<(RevisionId, RevisionId)>,
    output: Option<PathBuf>,
) -> Result<()> {
    let page = parse_title(title)?;
    let file = export_page(&ws.store, &page, range, &ws.config.domain_id)
        .with_context(|| format!("failed to export {page}"))?;
    let json = serde_json::to_string_pretty(&file)?;
    match output {
        Some(path) => {
            fs::write(&path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            let count = file.pages.iter().map(|p| p.revisions.len()).sum::<usize>();
            println!(
                "{} Exported {} revisions of {} to {}",
                "✓".green(),
                count,
                page,
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Handle `aqua import`.
pub fn cmd_import(ws: &mut Workspace, path: &Path, title: Option<&str>) -> Result<()> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file = parse_export(&json).context("invalid export file")?;
    let target = title.map(parse_title).transpose()?;
    let reports =
        import_export(&mut ws.store, &file, target.as_ref()).context("import failed")?;
    ws.save()?;

    for report in &reports {
        println!(
            "{} Imported {} revisions into {}",
            "✓".green(),
            report.imported.len(),
            report.page
        );
        for (exported, local) in &report.imported {
            println!("  {} → {}", exported, local.to_string().cyan());
        }
    }
    Ok(())
}

/// Handle `aqua tree`.
pub fn cmd_tree(ws: &Workspace, remote: &str, local: &str, json: bool) -> Result<()> {
    let remote = parse_title(remote)?;
    let local = parse_title(local)?;
    let tree = TreeBuilder::new(&ws.store).build_pre_import_tree(&remote, &local)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
        return Ok(());
    }

    println!("{}", format!("{remote} → {local}").bold().underline());
    for node in &tree.nodes {
        let ids: Vec<String> = node.revisions.iter().map(ToString::to_string).collect();
        let marker = match (node.diff, node.source) {
            (false, _) => "=".normal(),
            (true, NodeSource::Local) => "L".yellow().bold(),
            (true, NodeSource::Remote) => "R".cyan().bold(),
        };
        println!("  {} {} [{}]", marker, node.verification_hash, ids.join(", "));
    }
    match tree.change_type {
        Some(change) => println!("  {}: {}", "Change".bold(), change),
        None => println!("  {}: {}", "Change".bold(), "in sync".green()),
    }
    Ok(())
}

/// Handle `aqua fast-forward`.
pub fn cmd_fast_forward(ws: &mut Workspace, remote: &str, local: &str) -> Result<()> {
    let remote = parse_title(remote)?;
    let local = parse_title(local)?;
    let outcome = fast_forward(&mut ws.store, &remote, &local)
        .with_context(|| format!("failed to fast-forward {local}"))?;
    ws.save()?;

    if outcome.imported.is_empty() {
        println!("{} {} is up to date", "✓".green(), local);
    } else {
        println!(
            "{} Appended {} revisions to {}",
            "✓".green(),
            outcome.imported.len(),
            local
        );
    }
    Ok(())
}
