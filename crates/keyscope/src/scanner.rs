//! Keyspace scanner
//!
//! Drains a [`KeyStream`] with a fixed pool of worker threads, prices each
//! key through the [`KeySource`] and folds the result into a [`Tree`].
//!
//! # Design
//!
//! - Workers share one stream; each key is handed to exactly one worker
//! - Tree insertions are serialized through one mutex held for a single `add`
//! - A key that cannot be priced is logged and skipped, never fatal
//! - Only a lost connection fails the scan; any other stream failure ends it
//!   early and is recorded in the report
//! - All workers are joined before `scan` returns

use crate::cancel::CancelToken;
use crate::error::{KeyscopeError, Result};
use crate::metric::key_sample;
use crate::progress::ProgressSink;
use crate::source::{KeySource, KeyStream};
use crate::tree::Tree;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, dispatcher, error, info, warn};

/// Pattern matching every key.
pub const MATCH_ALL: &str = "*";

/// Options for one scan run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Glob-style filter, evaluated by the store
    pub pattern: String,
    /// Keys fetched per store iteration (also the key queue capacity)
    pub scan_count: usize,
    /// Pause after each listed key, taken by the key producer
    pub throttle: Duration,
    /// Number of parallel workers (0 is treated as 1)
    pub workers: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            pattern: MATCH_ALL.to_string(),
            scan_count: 1000,
            throttle: Duration::ZERO,
            workers: 1,
        }
    }
}

impl ScanOptions {
    /// True when the filter cannot exclude any key, so the store's key count
    /// is a usable progress total.
    pub fn matches_everything(&self) -> bool {
        self.pattern.is_empty() || self.pattern == MATCH_ALL
    }
}

/// Outcome of a scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Key count reported by the store up front (0 if unknown)
    pub total_hint: u64,
    /// Keys taken off the stream
    pub keys_scanned: u64,
    /// Keys priced and added to the tree
    pub keys_added: u64,
    /// Keys skipped because pricing failed
    pub keys_failed: u64,
    /// Whether the scan stopped early on cancellation
    pub cancelled: bool,
    /// Why the key stream ended early, if it failed without losing the connection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_error: Option<String>,
    pub duration_ms: u64,
}

#[derive(Default)]
struct ScanCounters {
    scanned: AtomicU64,
    added: AtomicU64,
    failed: AtomicU64,
}

/// Scan coordinator
pub struct Scanner<S, P> {
    source: S,
    progress: P,
    cancel: CancelToken,
}

impl<S: KeySource, P: ProgressSink> Scanner<S, P> {
    pub fn new(source: S, progress: P) -> Self {
        Self {
            source,
            progress,
            cancel: CancelToken::new(),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn progress(&self) -> &P {
        &self.progress
    }

    /// Scan every key matching `options` into `tree`, blocking until the
    /// stream is exhausted (or cancelled) and all workers have exited.
    ///
    /// On error the tree keeps whatever was added before the failure.
    pub fn scan(&self, options: &ScanOptions, tree: &mut Tree) -> Result<ScanReport> {
        let start = Instant::now();
        let workers = options.workers.max(1);
        info!(
            pattern = %options.pattern,
            workers,
            scan_count = options.scan_count,
            throttle_ns = options.throttle.as_nanos() as u64,
            "Starting keyspace scan"
        );

        let total_hint = if options.matches_everything() {
            self.keys_count()
        } else {
            0
        };
        self.progress.start(total_hint);

        let stream = match self.source.scan_keys(options, &self.cancel) {
            Ok(stream) => stream,
            Err(e) => {
                self.progress.stop();
                error!(error = %e, "Failed to start key scan");
                return Err(e);
            }
        };

        let counters = ScanCounters::default();
        let shared_tree = Mutex::new(tree);
        let dispatch = dispatcher::get_default(|current| current.clone());

        let panicked = std::thread::scope(|scope| {
            let handles: Vec<_> = (1..=workers)
                .map(|worker| {
                    let stream = &stream;
                    let tree = &shared_tree;
                    let counters = &counters;
                    let dispatch = &dispatch;
                    scope.spawn(move || {
                        dispatcher::with_default(dispatch, || {
                            self.run_worker(worker, stream, tree, counters)
                        })
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join())
                .filter(|joined| joined.is_err())
                .count()
        });

        self.progress.stop();
        let stream_result = stream.finish();

        let mut report = ScanReport {
            total_hint,
            keys_scanned: counters.scanned.load(Ordering::Relaxed),
            keys_added: counters.added.load(Ordering::Relaxed),
            keys_failed: counters.failed.load(Ordering::Relaxed),
            cancelled: self.cancel.is_cancelled(),
            stream_error: None,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        if panicked > 0 {
            return Err(KeyscopeError::InvalidState(format!(
                "{panicked} scan worker(s) panicked"
            )));
        }
        match stream_result {
            Err(e) if e.is_connection() => {
                error!(
                    error = %e,
                    scanned = report.keys_scanned,
                    added = report.keys_added,
                    "Key stream lost its connection, scan aborted"
                );
                return Err(e);
            }
            Err(e) => {
                error!(
                    error = %e,
                    scanned = report.keys_scanned,
                    "Key stream failed, keeping keys scanned so far"
                );
                report.stream_error = Some(e.to_string());
            }
            Ok(()) => {}
        }

        info!(
            total_hint = report.total_hint,
            scanned = report.keys_scanned,
            added = report.keys_added,
            failed = report.keys_failed,
            cancelled = report.cancelled,
            duration_ms = report.duration_ms,
            "Keyspace scan complete"
        );
        Ok(report)
    }

    fn keys_count(&self) -> u64 {
        match self.source.keys_count() {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "Failed to get number of keys, progress total unknown");
                0
            }
        }
    }

    fn run_worker(
        &self,
        worker: usize,
        stream: &KeyStream,
        tree: &Mutex<&mut Tree>,
        counters: &ScanCounters,
    ) {
        let mut processed = 0u64;
        while let Some(key) = stream.next_key(&self.cancel) {
            counters.scanned.fetch_add(1, Ordering::Relaxed);
            processed += 1;

            match self.source.memory_usage(&key) {
                Ok(bytes) => {
                    tree.lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .add(&key, &key_sample(bytes));
                    counters.added.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, bytes, "Measured key");
                    self.progress.increment();
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(key = %key, error = %e, "Failed to measure key, skipping");
                }
            }
        }
        debug!(worker, processed, "Scan worker done");
    }
}
