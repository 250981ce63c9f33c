//! Index command - scan a redis keyspace and save the prefix tree

use crate::cli::error::HelpfulError;
use crate::cli::output::{format_count, format_size};
use anyhow::Context;
use keyscope::{
    BarProgress, InventoryConfig, InventoryIndex, KeyscopeError, RedisKeySource, Scanner,
};
use std::path::PathBuf;
use tracing::info;

/// Arguments for the index command
#[derive(Debug, Default)]
pub struct IndexArgs {
    pub url: String,
    pub config: Option<PathBuf>,
    pub separators: Option<String>,
    pub max_children: Option<usize>,
    pub pattern: Option<String>,
    pub scan_count: Option<usize>,
    pub throttle_ns: Option<u64>,
    pub workers: Option<usize>,
    pub index_file: Option<PathBuf>,
}

/// Config file values, overridden by any flag given on the command line.
pub fn resolve_config(args: &IndexArgs) -> anyhow::Result<InventoryConfig> {
    let mut config = match &args.config {
        Some(path) => InventoryConfig::load(path)
            .map_err(|e| HelpfulError::invalid_config(&format!("{}: {}", path.display(), e)))?,
        None => InventoryConfig::default(),
    };

    if let Some(separators) = &args.separators {
        config.separators = separators.clone();
    }
    if let Some(max_children) = args.max_children {
        config.max_children = max_children;
    }
    if let Some(pattern) = &args.pattern {
        config.pattern = pattern.clone();
    }
    if let Some(scan_count) = args.scan_count {
        config.scan_count = scan_count;
    }
    if let Some(throttle_ns) = args.throttle_ns {
        config.throttle_ns = throttle_ns;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(index_file) = &args.index_file {
        config.index_file = Some(index_file.clone());
    }

    config
        .validate()
        .map_err(|e| HelpfulError::invalid_config(&e.to_string()))?;
    Ok(config)
}

/// Execute the index command
pub fn run(args: IndexArgs) -> anyhow::Result<()> {
    let config = resolve_config(&args)?;
    info!(pattern = %config.pattern, max_children = config.max_children, "Start indexing");

    let source = RedisKeySource::open(&args.url).map_err(|e| match e {
        KeyscopeError::Config(reason) => HelpfulError::invalid_redis_url(&args.url, &reason),
        other => HelpfulError::redis_unreachable(&args.url, &other.to_string()),
    })?;

    let scanner = Scanner::new(source, BarProgress::new());
    let mut tree = config.new_tree();
    let report = scanner
        .scan(&config.scan_options(), &mut tree)
        .context("Keyspace scan failed")?;
    if let Some(reason) = &report.stream_error {
        eprintln!("Warning: key listing stopped early, the index is partial: {}", reason);
    }

    let index = InventoryIndex::new(&config, tree, Some(report));
    let path = config.index_path();
    index
        .save(&path)
        .with_context(|| format!("Failed to write index to {}", path.display()))?;

    info!(
        path = %path.display(),
        keys = index.total_keys(),
        bytes = index.total_bytes(),
        nodes = index.root.node_count(),
        "Finished scanning and saved index"
    );
    println!(
        "Indexed {} keys ({}) into {}",
        format_count(index.total_keys()),
        format_size(index.total_bytes()),
        path.display()
    );
    Ok(())
}
