//! `aqua.toml` configuration.

use anyhow::{bail, Context, Result};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "aqua.toml";
pub const ENV_DOMAIN_ID: &str = "AQUA_DOMAIN_ID";
pub const ENV_STORE: &str = "AQUA_STORE";

/// Settings for one aqua installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AquaConfig {
    /// Mixed into every metadata hash; scopes chains to this installation.
    pub domain_id: String,
    /// JSON store file, relative to the config file's directory.
    pub store_path: PathBuf,
    pub witness_network: String,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for AquaConfig {
    fn default() -> Self {
        Self {
            domain_id: String::new(),
            store_path: PathBuf::from("aqua-store.json"),
            witness_network: "sepolia".to_string(),
            log_filter: "warn".to_string(),
        }
    }
}

impl AquaConfig {
    /// A fresh config with a random domain id.
    pub fn generate() -> Self {
        Self {
            domain_id: generate_domain_id(),
            ..Self::default()
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse aqua config")
    }

    /// Read `path` if it exists, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Self::from_toml(&contents)
                .with_context(|| format!("invalid config file {}", path.display()))?
        } else {
            Self::default()
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply `AQUA_DOMAIN_ID` and `AQUA_STORE` as reported by `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(domain_id) = lookup(ENV_DOMAIN_ID).filter(|v| !v.is_empty()) {
            self.domain_id = domain_id;
        }
        if let Some(store) = lookup(ENV_STORE).filter(|v| !v.is_empty()) {
            self.store_path = PathBuf::from(store);
        }
        self
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Store location for a config read from `config_path`.
    pub fn resolve_store_path(&self, config_path: &Path) -> PathBuf {
        if self.store_path.is_absolute() {
            return self.store_path.clone();
        }
        match config_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join(&self.store_path),
            _ => self.store_path.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.domain_id.is_empty() {
            bail!("no domain id configured; run `aqua init` or set {ENV_DOMAIN_ID}");
        }
        if !self.domain_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            bail!("domain id {:?} must be alphanumeric", self.domain_id);
        }
        Ok(())
    }
}

/// Ten lowercase hex characters.
pub fn generate_domain_id() -> String {
    let mut bytes = [0u8; 5];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_fill_missing_keys() {
        let config = AquaConfig::from_toml("domain_id = \"abcdef0123\"\n").unwrap();
        assert_eq!(config.domain_id, "abcdef0123");
        assert_eq!(config.store_path, PathBuf::from("aqua-store.json"));
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn test_env_overrides() {
        let config = AquaConfig::default().with_overrides(|key| match key {
            ENV_DOMAIN_ID => Some("0011223344".to_string()),
            ENV_STORE => Some("/tmp/other.json".to_string()),
            _ => None,
        });
        assert_eq!(config.domain_id, "0011223344");
        assert_eq!(config.store_path, PathBuf::from("/tmp/other.json"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let config = AquaConfig::generate();
        config.save(&path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(AquaConfig::from_toml(&contents).unwrap(), config);
        assert_eq!(
            config.resolve_store_path(&path),
            dir.path().join("aqua-store.json")
        );
    }

    #[test]
    fn test_generated_domain_id_shape() {
        let id = generate_domain_id();
        assert_eq!(id.len(), 10);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(AquaConfig::generate().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_domain() {
        assert!(AquaConfig::default().validate().is_err());
        let config = AquaConfig {
            domain_id: "not valid!".to_string(),
            ..AquaConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
