//! Configuration for readshelf.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (READSHELF_HOME, READSHELF_STORAGE)
//! 2. Config file (.readshelf/config.yaml)
//! 3. Defaults (~/.readshelf)
//!
//! Config file discovery:
//! - Searches current directory and parents for .readshelf/config.yaml
//! - Paths in config file are relative to the .readshelf/ directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const MIB: usize = 1024 * 1024;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub limits: Option<LimitsConfig>,
    #[serde(default)]
    pub search: Option<SearchConfig>,
    #[serde(default)]
    pub viewer: Option<ViewerConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .readshelf/)
    pub home: Option<String>,
    /// Durable key-value storage directory (relative to .readshelf/)
    pub storage: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    pub upload_warn_bytes: Option<u64>,
    pub collection_soft_cap_bytes: Option<usize>,
    pub storage_quota_bytes: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewerConfig {
    pub mobi_min_readable_chars: Option<usize>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory
    pub home: PathBuf,
    /// Durable storage directory
    pub storage: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub limits: LimitSettings,
    pub search: SearchSettings,
    pub viewer: ViewerSettings,
}

/// Size budgets for durable storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitSettings {
    /// Uploads larger than this warn that they may not survive a reload
    pub upload_warn_bytes: u64,
    /// Serialized collections larger than this warn before writing
    pub collection_soft_cap_bytes: usize,
    /// Hard quota enforced by the storage backend
    pub storage_quota_bytes: usize,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            upload_warn_bytes: 4 * MIB as u64,
            collection_soft_cap_bytes: 8 * MIB,
            storage_quota_bytes: 10 * MIB,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    pub max_results: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { max_results: 20 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerSettings {
    /// Below this many readable characters MOBI extraction gives up
    pub mobi_min_readable_chars: usize,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            mobi_min_readable_chars: 200,
        }
    }
}

impl LimitSettings {
    fn merge(config: Option<&LimitsConfig>) -> Self {
        let defaults = Self::default();
        let Some(c) = config else {
            return defaults;
        };
        Self {
            upload_warn_bytes: c.upload_warn_bytes.unwrap_or(defaults.upload_warn_bytes),
            collection_soft_cap_bytes: c
                .collection_soft_cap_bytes
                .unwrap_or(defaults.collection_soft_cap_bytes),
            storage_quota_bytes: c
                .storage_quota_bytes
                .unwrap_or(defaults.storage_quota_bytes),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".readshelf").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Resolve configuration from an optional config file plus env vars
fn load_config_from(config_file: Option<PathBuf>) -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".readshelf");

    let parsed = match config_file {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };

    // Relative paths in the file resolve against .readshelf/
    let config_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or(Path::new("."));

    let home = if let Ok(env_home) = std::env::var("READSHELF_HOME") {
        PathBuf::from(env_home)
    } else if let Some(home_path) = parsed.as_ref().and_then(|c| c.paths.home.as_deref()) {
        resolve_path(config_dir, home_path)
    } else {
        default_home
    };

    let storage = if let Ok(env_storage) = std::env::var("READSHELF_STORAGE") {
        PathBuf::from(env_storage)
    } else if let Some(storage_path) = parsed.as_ref().and_then(|c| c.paths.storage.as_deref()) {
        resolve_path(config_dir, storage_path)
    } else {
        home.join("storage")
    };

    let limits = LimitSettings::merge(parsed.as_ref().and_then(|c| c.limits.as_ref()));

    let search = SearchSettings {
        max_results: parsed
            .as_ref()
            .and_then(|c| c.search.as_ref())
            .and_then(|s| s.max_results)
            .unwrap_or(SearchSettings::default().max_results),
    };

    let viewer = ViewerSettings {
        mobi_min_readable_chars: parsed
            .as_ref()
            .and_then(|c| c.viewer.as_ref())
            .and_then(|v| v.mobi_min_readable_chars)
            .unwrap_or(ViewerSettings::default().mobi_min_readable_chars),
    };

    Ok(ResolvedConfig {
        home,
        storage,
        config_file,
        limits,
        search,
        viewer,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    load_config_from(find_config_file())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Get the readshelf home directory
pub fn readshelf_home() -> Result<PathBuf> {
    Ok(config()?.home.clone())
}

/// Get the durable storage directory
pub fn storage_dir() -> Result<PathBuf> {
    Ok(config()?.storage.clone())
}
