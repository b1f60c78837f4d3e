//! A loaded config together with the store it points at.

use crate::config::AquaConfig;
use anyhow::{Context, Result};
use aqua_hash::HashingService;
use aqua_store::InMemoryStore;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct Workspace {
    pub config: AquaConfig,
    pub store_path: PathBuf,
    pub store: InMemoryStore,
    pub hashing: HashingService,
}

impl Workspace {
    pub fn open(config_path: &Path) -> Result<Self> {
        let config = AquaConfig::load(config_path)?;
        config.validate()?;
        let store_path = config.resolve_store_path(config_path);
        let store = InMemoryStore::open(&store_path)
            .with_context(|| format!("failed to open store {}", store_path.display()))?;
        debug!(store = %store_path.display(), domain_id = %config.domain_id, "opened workspace");
        let hashing = HashingService::new(&config.domain_id);
        Ok(Self {
            config,
            store_path,
            store,
            hashing,
        })
    }

    pub fn save(&self) -> Result<()> {
        self.store
            .save(&self.store_path)
            .with_context(|| format!("failed to write store {}", self.store_path.display()))
    }
}
