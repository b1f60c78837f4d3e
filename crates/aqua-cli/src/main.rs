use anyhow::Result;
use aqua_cli::commands::{self, exchange, history, page};
use aqua_cli::config::{AquaConfig, CONFIG_FILE};
use aqua_cli::workspace::Workspace;
use aqua_model::RevisionId;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Verified page histories: every revision carries a hash chained to the one
/// before it.
#[derive(Parser, Debug)]
#[command(name = "aqua", version)]
struct Cli {
    /// Path to the config file.
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a config file with a fresh domain id
    Init {
        /// Use this domain id instead of a random one
        #[arg(long)]
        domain_id: Option<String>,
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Save a new revision of a page
    Edit {
        title: String,
        /// Page text
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,
        /// Read the page text from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Save a revision of a File: page recording the digest of a local file
    Upload {
        title: String,
        file: PathBuf,
        /// Description text for the file page
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Show a page's verification history
    Log { title: String },
    /// Print the verification record of a revision as JSON
    Show { rev_id: RevisionId },
    /// Recompute and check a page's hash chain
    Verify { title: String },
    /// Generate a new Ed25519 keypair
    Keygen {
        /// Optional output path for the keypair (default: prints to stdout)
        output: Option<PathBuf>,
    },
    /// Sign a revision
    Sign {
        rev_id: RevisionId,
        /// Keypair file written by `aqua keygen`
        #[arg(long)]
        key: PathBuf,
    },
    /// Delete revisions and re-link the rest of the chain
    Delete {
        #[arg(required = true)]
        ids: Vec<RevisionId>,
    },
    /// Collapse a contiguous range of revisions into one
    Squash {
        #[arg(required = true)]
        ids: Vec<RevisionId>,
    },
    /// Record a ledger transaction covering the latest revision of pages
    Witness {
        #[arg(required = true)]
        titles: Vec<String>,
        /// Transaction hash on the ledger
        #[arg(long)]
        tx: String,
        /// Ledger network (default: from config)
        #[arg(long)]
        network: Option<String>,
    },
    /// Export a page's history as JSON
    Export {
        title: String,
        /// First revision id to include
        #[arg(long, requires = "to")]
        from: Option<RevisionId>,
        /// Last revision id to include
        #[arg(long, requires = "from")]
        to: Option<RevisionId>,
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Import an exported history
    Import {
        file: PathBuf,
        /// Import into this page instead of the exported title
        #[arg(long)]
        title: Option<String>,
    },
    /// Compare a received page's chain with a local page
    Tree {
        remote: String,
        local: String,
        #[arg(long)]
        json: bool,
    },
    /// Append a received page's new revisions to a local page
    FastForward { remote: String, local: String },
    /// Show whether resources embedded in a revision changed
    Transclusions {
        title: String,
        /// Revision to inspect (default: latest)
        #[arg(long)]
        rev: Option<RevisionId>,
    },
    /// Save a revision recording the current hash of an embedded resource
    Refresh { title: String, resource: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_filter = AquaConfig::load(&cli.config)
        .map(|c| c.log_filter)
        .unwrap_or_else(|_| AquaConfig::default().log_filter);
    init_tracing(&log_filter);

    match cli.command {
        Commands::Init { domain_id, force } => commands::cmd_init(&cli.config, domain_id, force),
        Commands::Keygen { output } => history::cmd_keygen(output),
        command => {
            let mut ws = Workspace::open(&cli.config)?;
            run(&mut ws, command)
        }
    }
}

fn run(ws: &mut Workspace, command: Commands) -> Result<()> {
    match command {
        Commands::Edit { title, text, file } => page::cmd_edit(ws, &title, text, file),
        Commands::Upload {
            title,
            file,
            description,
        } => page::cmd_upload(ws, &title, &file, &description),
        Commands::Log { title } => page::cmd_log(ws, &title),
        Commands::Show { rev_id } => page::cmd_show(ws, rev_id),
        Commands::Verify { title } => page::cmd_verify(ws, &title),
        Commands::Sign { rev_id, key } => history::cmd_sign(ws, rev_id, &key),
        Commands::Delete { ids } => history::cmd_delete(ws, &ids),
        Commands::Squash { ids } => history::cmd_squash(ws, &ids),
        Commands::Witness {
            titles,
            tx,
            network,
        } => history::cmd_witness(ws, &titles, &tx, network),
        Commands::Export {
            title,
            from,
            to,
            output,
        } => exchange::cmd_export(ws, &title, from.zip(to), output),
        Commands::Import { file, title } => exchange::cmd_import(ws, &file, title.as_deref()),
        Commands::Tree {
            remote,
            local,
            json,
        } => exchange::cmd_tree(ws, &remote, &local, json),
        Commands::FastForward { remote, local } => exchange::cmd_fast_forward(ws, &remote, &local),
        Commands::Transclusions { title, rev } => page::cmd_transclusions(ws, &title, rev),
        Commands::Refresh { title, resource } => page::cmd_refresh(ws, &title, &resource),
        Commands::Init { .. } | Commands::Keygen { .. } => Ok(()),
    }
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
