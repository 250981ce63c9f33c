//! Display command - render a saved index as a prefix table

use crate::cli::error::HelpfulError;
use crate::cli::output::{format_count, format_share, format_size, print_table_colored};
use comfy_table::Color;
use keyscope::{InventoryConfig, InventoryIndex, Metric, Node};
use serde::Serialize;
use std::path::PathBuf;

/// Arguments for the display command
#[derive(Debug)]
pub struct DisplayArgs {
    pub index_file: Option<PathBuf>,
    pub depth: usize,
    pub json: bool,
}

/// One rendered prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefixRow {
    pub prefix: String,
    pub depth: usize,
    pub keys: u64,
    pub bytes: u64,
    pub aggregated: bool,
}

/// Flatten `root` into rows, largest prefixes first, at most `depth` levels.
pub fn collect_rows(root: &Node, depth: usize, separator: char) -> Vec<PrefixRow> {
    let mut rows = Vec::new();
    let separator = separator.to_string();
    root.walk(depth, |path, node| {
        rows.push(PrefixRow {
            prefix: path.join(&separator),
            depth: path.len(),
            keys: node.metric(Metric::KeysCount),
            bytes: node.metric(Metric::BytesSize),
            aggregated: node.is_aggregated(),
        });
    });
    rows
}

/// Execute the display command
pub fn run(args: DisplayArgs) -> anyhow::Result<()> {
    let path = args
        .index_file
        .unwrap_or_else(|| InventoryConfig::default().index_path());
    if !path.exists() {
        return Err(HelpfulError::index_not_found(&path).into());
    }
    let index = InventoryIndex::load(&path)
        .map_err(|e| HelpfulError::index_unreadable(&path, &e.to_string()))?;

    let separator = index.separators.chars().next().unwrap_or(':');
    let rows = collect_rows(&index.root, args.depth, separator);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let total_bytes = index.total_bytes();
    let mut table_rows = vec![(
        vec![
            "(all keys)".to_string(),
            format_count(index.total_keys()),
            format_size(total_bytes),
            format_share(total_bytes, total_bytes),
        ],
        Some(Color::Green),
    )];
    for row in rows {
        let indent = "  ".repeat(row.depth.saturating_sub(1));
        let color = row.aggregated.then_some(Color::Yellow);
        table_rows.push((
            vec![
                format!("{}{}", indent, row.prefix),
                format_count(row.keys),
                format_size(row.bytes),
                format_share(row.bytes, total_bytes),
            ],
            color,
        ));
    }
    print_table_colored(&["Prefix", "Keys", "Size", "Share"], table_rows);
    println!(
        "Index built {} (pattern '{}', max children {})",
        index.built_at, index.pattern, index.max_children
    );
    Ok(())
}
