//! Key sources and the shared key stream
//!
//! A [`KeySource`] enumerates keys and prices them. Enumeration is exposed
//! as a [`KeyStream`]: a bounded queue filled by a producer thread and
//! drained by any number of workers, each key going to exactly one worker.
//! A full queue blocks the producer, which is the scan's backpressure point.
//! The producer also applies the scan throttle, so the configured delay
//! bounds the rate of the whole scan regardless of the worker count.

use crate::cancel::CancelToken;
use crate::error::{KeyscopeError, Result};
use crate::scanner::ScanOptions;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::dispatcher;

/// How often a blocked reader re-checks cancellation.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Store capability consumed by the scanner.
pub trait KeySource: Send + Sync {
    /// Start enumerating keys matching `options.pattern`.
    fn scan_keys(&self, options: &ScanOptions, cancel: &CancelToken) -> Result<KeyStream>;

    /// Approximate number of keys in the store.
    fn keys_count(&self) -> Result<u64>;

    /// Memory cost of one key in bytes. A vanished key is [`KeyscopeError::KeyMissing`].
    fn memory_usage(&self, key: &str) -> Result<u64>;
}

/// Producer half of a [`KeyStream`].
pub struct KeySink {
    tx: SyncSender<String>,
    throttle: Duration,
}

impl KeySink {
    /// Queue a key, blocking while the queue is full, then wait out the
    /// throttle. Returns `false` once the stream has been dropped and the
    /// producer should stop.
    pub fn send(&self, key: String) -> bool {
        if self.tx.send(key).is_err() {
            return false;
        }
        if !self.throttle.is_zero() {
            std::thread::sleep(self.throttle);
        }
        true
    }
}

/// Finite, non-restartable stream of key names shared by all workers.
pub struct KeyStream {
    receiver: Mutex<Receiver<String>>,
    producer: JoinHandle<Result<()>>,
}

impl KeyStream {
    /// Run `produce` on its own thread, feeding a queue of
    /// `options.scan_count` keys throttled by `options.throttle`.
    ///
    /// An error returned by `produce` (for example a dropped connection) is
    /// reported by [`KeyStream::finish`].
    pub fn spawn<F>(options: &ScanOptions, produce: F) -> Result<Self>
    where
        F: FnOnce(KeySink) -> Result<()> + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(options.scan_count.max(1));
        let sink = KeySink {
            tx,
            throttle: options.throttle,
        };
        let dispatch = dispatcher::get_default(|current| current.clone());
        let producer = std::thread::Builder::new()
            .name("keyscope-keys".to_string())
            .spawn(move || dispatcher::with_default(&dispatch, || produce(sink)))?;
        Ok(Self {
            receiver: Mutex::new(rx),
            producer,
        })
    }

    /// Next key, or `None` once the stream is exhausted or `cancel` fires.
    pub fn next_key(&self, cancel: &CancelToken) -> Option<String> {
        let receiver = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if cancel.is_cancelled() {
                return None;
            }
            match receiver.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(key) => return Some(key),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// Close the stream and wait for the producer, surfacing its failure.
    pub fn finish(self) -> Result<()> {
        let Self { receiver, producer } = self;
        drop(receiver);
        producer
            .join()
            .map_err(|_| KeyscopeError::InvalidState("Key producer panicked".to_string()))?
    }
}
