use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::info;

use dice_chain::rpc_config::{DEFAULT_RPC_URL, DEFAULT_TIMEOUT_SECS};
use dice_chain::templates::{ANY_OWNER, TOKEN_ROOT_UPGRADEABLE};

/// Environment variable pointing at an alternative config file.
pub const CONFIG_ENV: &str = "DICE_CONFIG";

// ---------------------------------------------------------------------------
// DeployConfig
// ---------------------------------------------------------------------------

/// Deployment configuration stored at `~/.dice/config.json`.
///
/// Amounts are in whole tokens; the flows convert them to nano-units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    // Toolkit gateway
    pub rpc_url: String,
    pub rpc_timeout_secs: u64,

    // Keys
    pub keystore_path: Option<PathBuf>,
    pub signer_id: String,
    pub workchain: i8,

    // Amounts
    pub wallet_funding_tokens: u64,
    pub owner_deploy_tokens: u64,
    pub transfer_fee_tokens: u64,

    // Ownership transfer
    pub token_root_address: String,
    pub owner_template: String,
    pub resource_template: String,
    /// Owner contract left behind by an interrupted run. When set, the
    /// transfer is retried against it instead of deploying a new one.
    pub resume_owner_address: Option<String>,

    // General
    pub log_level: String,
    /// Log file directory; `~/.dice/logs` when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.into(),
            rpc_timeout_secs: DEFAULT_TIMEOUT_SECS,
            keystore_path: None,
            signer_id: "0".into(),
            workchain: 0,
            wallet_funding_tokens: 10,
            owner_deploy_tokens: 2,
            transfer_fee_tokens: 2,
            token_root_address:
                "0:000ffdc692d7fa68534bab03e62e13fc2fb7b2be8aff1da94fdbf580290eb952".into(),
            owner_template: ANY_OWNER.into(),
            resource_template: TOKEN_ROOT_UPGRADEABLE.into(),
            resume_owner_address: None,
            log_level: "info".into(),
            log_dir: None,
        }
    }
}

impl DeployConfig {
    /// Returns the base config directory: `~/.dice/`
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".dice"))
    }

    /// Returns the config file path: `$DICE_CONFIG` or `~/.dice/config.json`
    pub fn config_path() -> Result<PathBuf> {
        Self::config_path_from(std::env::var_os(CONFIG_ENV))
    }

    fn config_path_from(override_path: Option<OsString>) -> Result<PathBuf> {
        match override_path {
            Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => Ok(Self::base_dir()?.join("config.json")),
        }
    }

    /// Returns the logs directory: `~/.dice/logs/`
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("logs"))
    }

    /// Log directory: the configured one, or [`Self::logs_dir`].
    pub fn log_directory(&self) -> Result<PathBuf> {
        match &self.log_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::logs_dir(),
        }
    }

    /// Key store file: the configured path, or `~/.dice/keys.json`.
    pub fn keystore_file(&self) -> Result<PathBuf> {
        match &self.keystore_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::base_dir()?.join("keys.json")),
        }
    }

    /// Loads config from disk, or creates the default if missing.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from_path(&path)
    }

    /// Load config from a specific file path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Self = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to_path(path)?;
            info!("Created default config at {}", path.display());
            Ok(config)
        }
    }

    /// Save config to a specific file path, creating its directory.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
