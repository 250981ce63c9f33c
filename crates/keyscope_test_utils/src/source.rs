//! Scriptable in-memory [`KeySource`]

use globset::{GlobBuilder, GlobMatcher};
use keyscope::{CancelToken, KeySource, KeyStream, KeyscopeError, Result, ScanOptions};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// How the key stream breaks, and after how many keys.
#[derive(Debug, Clone, Copy)]
enum StreamFault {
    Connection(usize),
    Store(usize),
}

/// Key source backed by a fixed list of `(key, cost)` pairs.
///
/// Keys are streamed in insertion order. Failures are opt-in through the
/// builder methods.
#[derive(Debug, Default)]
pub struct FakeKeySource {
    keys: Vec<String>,
    costs: HashMap<String, u64>,
    failing_keys: HashSet<String>,
    missing_keys: HashSet<String>,
    fail_count: bool,
    fail_scan_start: bool,
    stream_fault: Option<StreamFault>,
    count_calls: AtomicU64,
    memory_calls: AtomicU64,
    last_options: Mutex<Option<ScanOptions>>,
}

impl FakeKeySource {
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = (K, u64)>,
        K: Into<String>,
    {
        let mut source = Self::default();
        for (key, cost) in keys {
            let key = key.into();
            if source.costs.insert(key.clone(), cost).is_none() {
                source.keys.push(key);
            }
        }
        source
    }

    /// Pricing `keys` fails with a store error.
    pub fn with_failing_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.failing_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    /// `keys` are streamed but vanish before they can be priced.
    pub fn with_missing_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.missing_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    /// `keys_count` returns an error.
    pub fn with_failing_count(mut self) -> Self {
        self.fail_count = true;
        self
    }

    /// `scan_keys` fails before producing a stream.
    pub fn with_failing_scan_start(mut self) -> Self {
        self.fail_scan_start = true;
        self
    }

    /// The stream delivers `n` keys, then its producer fails with a
    /// connection error.
    pub fn with_stream_failure_after(mut self, n: usize) -> Self {
        self.stream_fault = Some(StreamFault::Connection(n));
        self
    }

    /// The stream delivers `n` keys, then its producer fails with a store
    /// error while the connection stays up (e.g. an undecodable reply).
    pub fn with_stream_error_after(mut self, n: usize) -> Self {
        self.stream_fault = Some(StreamFault::Store(n));
        self
    }

    pub fn count_calls(&self) -> u64 {
        self.count_calls.load(Ordering::SeqCst)
    }

    pub fn memory_calls(&self) -> u64 {
        self.memory_calls.load(Ordering::SeqCst)
    }

    /// Options passed to the most recent `scan_keys` call.
    pub fn last_options(&self) -> Option<ScanOptions> {
        self.last_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl KeySource for FakeKeySource {
    fn scan_keys(&self, options: &ScanOptions, cancel: &CancelToken) -> Result<KeyStream> {
        *self.last_options.lock().unwrap_or_else(PoisonError::into_inner) = Some(options.clone());
        if self.fail_scan_start {
            return Err(KeyscopeError::Connection("scan refused".to_string()));
        }

        let matcher = pattern_matcher(&options.pattern)?;
        let keys: Vec<String> = self
            .keys
            .iter()
            .filter(|key| options.matches_everything() || matcher.is_match(key.as_str()))
            .cloned()
            .collect();
        let fault = self.stream_fault;
        let cancel = cancel.clone();

        KeyStream::spawn(options, move |sink| {
            for (sent, key) in keys.into_iter().enumerate() {
                match fault {
                    Some(StreamFault::Connection(n)) if n == sent => {
                        return Err(KeyscopeError::Connection(format!(
                            "connection reset after {sent} keys"
                        )));
                    }
                    Some(StreamFault::Store(n)) if n == sent => {
                        return Err(KeyscopeError::Store(format!(
                            "invalid SCAN reply after {sent} keys"
                        )));
                    }
                    _ => {}
                }
                if cancel.is_cancelled() {
                    debug!(sent, "Fake scan cancelled");
                    return Ok(());
                }
                if !sink.send(key) {
                    return Ok(());
                }
            }
            Ok(())
        })
    }

    fn keys_count(&self) -> Result<u64> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_count {
            return Err(KeyscopeError::Store("DBSIZE not permitted".to_string()));
        }
        Ok(self.keys.len() as u64)
    }

    fn memory_usage(&self, key: &str) -> Result<u64> {
        self.memory_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_keys.contains(key) {
            return Err(KeyscopeError::Store(format!("MEMORY USAGE failed for {key}")));
        }
        if self.missing_keys.contains(key) {
            return Err(KeyscopeError::KeyMissing(key.to_string()));
        }
        self.costs
            .get(key)
            .copied()
            .ok_or_else(|| KeyscopeError::KeyMissing(key.to_string()))
    }
}

/// Matcher for a `SCAN ... MATCH` pattern: `*` and `?` cross `:` and any
/// other separator, `[...]` classes and `\` escapes are honoured.
pub fn pattern_matcher(pattern: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(false)
        .backslash_escape(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| KeyscopeError::Config(format!("Invalid pattern '{pattern}': {e}")))
}
