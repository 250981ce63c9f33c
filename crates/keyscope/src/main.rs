//! Keyscope command-line tool
//!
//! - `index`: scan a redis keyspace into a prefix tree and save it
//! - `display`: render a saved index

use anyhow::Result;
use clap::{Parser, Subcommand};
use keyscope_logging::{init_logging, LogConfig};
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "keyscope", about = "Memory inventory of a redis keyspace by key prefix")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Level of logs to be displayed (overridden by RUST_LOG)
    #[arg(short = 'l', long = "log-level", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan keys and save the prefix tree to an index file for the display command.
    ///
    /// Separators and max-children shape the index itself and cannot be
    /// changed later without rescanning; depth only affects display.
    Index {
        /// redis://[:<password>@]<host>:<port>[/<db>]
        url: String,

        /// TOML configuration file; flags override its values
        #[arg(long, env = "KEYSCOPE_CONFIG")]
        config: Option<PathBuf>,

        /// Characters that separate levels of the key
        #[arg(short = 's', long)]
        separators: Option<String>,

        /// Children a node may have before further segments are aggregated
        #[arg(short = 'm', long = "max-children")]
        max_children: Option<usize>,

        /// Glob pattern limiting the keys to be aggregated
        #[arg(short = 'k', long)]
        pattern: Option<String>,

        /// Keys scanned per iteration (COUNT argument of SCAN)
        #[arg(short = 'c', long = "scan-count")]
        scan_count: Option<usize>,

        /// Nanoseconds to wait after each key is listed (rate limit for the whole scan)
        #[arg(short = 't', long = "throttle")]
        throttle_ns: Option<u64>,

        /// Workers measuring keys in parallel
        #[arg(short = 'w', long)]
        workers: Option<usize>,

        /// Output location for the index (default <tmp>/keyscope-index.json)
        #[arg(short = 'f', long = "index-file")]
        index_file: Option<PathBuf>,
    },

    /// Render a saved index as a table
    Display {
        /// Index to render (default <tmp>/keyscope-index.json)
        #[arg(short = 'f', long = "index-file")]
        index_file: Option<PathBuf>,

        /// Prefix levels to show
        #[arg(short = 'd', long, default_value = "3")]
        depth: usize,

        /// Output rows as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match init_logging(LogConfig {
        app_name: "keyscope",
        verbose: cli.verbose,
        level: cli.log_level.as_deref(),
    }) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("Warning: failed to initialize logging: {:#}", err);
            None
        }
    };

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:?}", err);
            ExitCode::from(1)
        }
    }
}

fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Index {
            url,
            config,
            separators,
            max_children,
            pattern,
            scan_count,
            throttle_ns,
            workers,
            index_file,
        } => cli::index::run(cli::index::IndexArgs {
            url,
            config,
            separators,
            max_children,
            pattern,
            scan_count,
            throttle_ns,
            workers,
            index_file,
        }),
        Commands::Display {
            index_file,
            depth,
            json,
        } => cli::display::run(cli::display::DisplayArgs {
            index_file,
            depth,
            json,
        }),
    }
}
