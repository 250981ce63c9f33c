//! Configuration for keyscope runs

use crate::error::{KeyscopeError, Result};
use crate::scanner::{ScanOptions, MATCH_ALL};
use crate::segment::{Segmenter, DEFAULT_SEPARATORS};
use crate::tree::{Tree, DEFAULT_MAX_CHILDREN};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default index file name, placed in the system temp directory.
pub const DEFAULT_INDEX_FILE_NAME: &str = "keyscope-index.json";

/// Inventory configuration: how keys are split, how wide the tree may grow
/// and how the store is scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Characters that separate key levels
    #[serde(default = "default_separators")]
    pub separators: String,

    /// Children a node may have before further segments are aggregated
    #[serde(default = "default_max_children")]
    pub max_children: usize,

    /// Glob pattern limiting the keys to scan
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Keys requested per SCAN iteration
    #[serde(default = "default_scan_count")]
    pub scan_count: usize,

    /// Nanoseconds to wait after each listed key, for the whole scan
    #[serde(default)]
    pub throttle_ns: u64,

    /// Workers measuring keys in parallel
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Where the index is written (default: `<tmp>/keyscope-index.json`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_file: Option<PathBuf>,
}

fn default_separators() -> String {
    DEFAULT_SEPARATORS.to_string()
}

fn default_max_children() -> usize {
    DEFAULT_MAX_CHILDREN
}

fn default_pattern() -> String {
    MATCH_ALL.to_string()
}

fn default_scan_count() -> usize {
    1000
}

fn default_workers() -> usize {
    1
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            separators: default_separators(),
            max_children: default_max_children(),
            pattern: default_pattern(),
            scan_count: default_scan_count(),
            throttle_ns: 0,
            workers: default_workers(),
            index_file: None,
        }
    }
}

impl InventoryConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: InventoryConfig =
            toml::from_str(&content).map_err(|e| KeyscopeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| KeyscopeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(KeyscopeError::Config("workers must be at least 1".to_string()));
        }
        if self.scan_count == 0 {
            return Err(KeyscopeError::Config("scan_count must be at least 1".to_string()));
        }
        if self.max_children == 0 {
            return Err(KeyscopeError::Config("max_children must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn segmenter(&self) -> Segmenter {
        Segmenter::from_chars(&self.separators)
    }

    /// An empty tree shaped by this configuration.
    pub fn new_tree(&self) -> Tree {
        Tree::new(self.segmenter(), self.max_children)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            pattern: self.pattern.clone(),
            scan_count: self.scan_count,
            throttle: Duration::from_nanos(self.throttle_ns),
            workers: self.workers,
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.index_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_INDEX_FILE_NAME))
    }
}
