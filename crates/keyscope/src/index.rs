//! Inventory index - the finished prefix tree persisted for later display
//!
//! Built once per scan and written as JSON. Scan-time options that shape the
//! tree (separators, fan-out bound, pattern) are stored alongside it since
//! they cannot be changed without rescanning.

use crate::config::InventoryConfig;
use crate::error::{KeyscopeError, Result};
use crate::metric::Metric;
use crate::scanner::ScanReport;
use crate::tree::{Node, Tree};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Index version - bump when format changes
const INDEX_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryIndex {
    /// Index format version
    pub version: u32,
    /// When the index was built (RFC 3339)
    pub built_at: String,
    pub separators: String,
    pub max_children: usize,
    pub pattern: String,
    /// Scan statistics, absent for indexes not produced by a scan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<ScanReport>,
    pub root: Node,
}

impl InventoryIndex {
    /// Take ownership of a finished tree.
    pub fn new(config: &InventoryConfig, tree: Tree, report: Option<ScanReport>) -> Self {
        Self {
            version: INDEX_VERSION,
            built_at: chrono::Utc::now().to_rfc3339(),
            separators: config.separators.clone(),
            max_children: tree.max_children(),
            pattern: config.pattern.clone(),
            report,
            root: tree.into_root(),
        }
    }

    pub fn total_keys(&self) -> u64 {
        self.root.metric(Metric::KeysCount)
    }

    pub fn total_bytes(&self) -> u64 {
        self.root.metric(Metric::BytesSize)
    }

    /// Write the index to `path` (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = path.with_extension("json.tmp");
        let file = fs::File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|e| KeyscopeError::Io(e.into_error()))?
            .sync_all()?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Load an index from `path`
    pub fn load(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)?;
        let index: InventoryIndex = serde_json::from_reader(BufReader::new(file))?;

        if index.version != INDEX_VERSION {
            return Err(KeyscopeError::Config(format!(
                "Index version mismatch: expected {}, got {}",
                INDEX_VERSION, index.version
            )));
        }

        Ok(index)
    }
}
