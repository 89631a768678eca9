//! Configuration loading and database path resolution

use crate::perms::PermissionPolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the database file
pub const DB_ENV_VAR: &str = "ROLLCALL_DB";

/// Admin API server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Static bearer token for the admin API; None disables auth
    pub bearer_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5730,
            bearer_token: None,
        }
    }
}

/// Database settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Explicit database file path; None derives a per-platform default
    pub path: Option<PathBuf>,
}

/// Identity-verification policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// When true, unverified users cannot enroll
    pub required: bool,
}

/// Permission reconciler tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Delay between successive per-user overwrite writes in a bulk pass.
    /// Best-effort rate-limit mitigation, not a correctness requirement.
    pub overwrite_delay_ms: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            overwrite_delay_ms: 200,
        }
    }
}

/// Course catalogue refresh settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogueConfig {
    /// Source URLs, each expected to serve a JSON array of
    /// `{code, description}` objects
    pub sources: Vec<String>,
    /// Interval between automatic refreshes; 0 disables the background task
    pub refresh_interval_secs: u64,
    /// Per-request timeout for catalogue fetches
    pub fetch_timeout_secs: u64,
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            refresh_interval_secs: 21600, // 6 hours
            fetch_timeout_secs: 30,
        }
    }
}

/// Top-level bot configuration (rollcall.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub verification: VerificationConfig,
    pub permissions: PermissionPolicy,
    pub reconcile: ReconcileConfig,
    pub catalogue: CatalogueConfig,
}

impl BotConfig {
    /// Parse a TOML configuration string
    pub fn from_toml(src: &str) -> Result<Self> {
        toml::from_str(src).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }
}

/// Load configuration following the priority order:
/// 1. Explicit path (command-line argument) — must exist and parse
/// 2. Per-platform config file (`<config dir>/rollcall/rollcall.toml`)
/// 3. Compiled defaults (no file anywhere)
pub fn load_config(explicit_path: Option<&Path>) -> Result<BotConfig> {
    if let Some(path) = explicit_path {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        return BotConfig::from_toml(&content);
    }

    if let Some(path) = default_config_path() {
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            return BotConfig::from_toml(&content);
        }
    }

    Ok(BotConfig::default())
}

/// Per-platform default config file path
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rollcall").join("rollcall.toml"))
}

/// Resolve the database file path following the priority order:
/// 1. Command-line argument (highest priority)
/// 2. `ROLLCALL_DB` environment variable
/// 3. `[database] path` from the config file
/// 4. Per-platform data directory (fallback)
pub fn resolve_database_path(cli_arg: Option<&str>, config: &BotConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(DB_ENV_VAR) {
        return PathBuf::from(path);
    }

    // Priority 3: Config file
    if let Some(path) = &config.database.path {
        return path.clone();
    }

    // Priority 4: Platform data directory
    dirs::data_local_dir()
        .map(|d| d.join("rollcall").join("rollcall.db"))
        .unwrap_or_else(|| PathBuf::from("./rollcall.db"))
}
