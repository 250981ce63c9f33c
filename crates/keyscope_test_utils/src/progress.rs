//! Progress sink that records every call

use keyscope::{CancelToken, ProgressSink};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
pub struct RecordingProgress {
    starts: Mutex<Vec<u64>>,
    increments: AtomicU64,
    stops: AtomicU64,
    cancel_after: Option<(u64, CancelToken)>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `cancel` once `n` increments have been recorded.
    pub fn cancelling_after(n: u64, cancel: CancelToken) -> Self {
        Self {
            cancel_after: Some((n, cancel)),
            ..Self::default()
        }
    }

    /// Totals passed to `start`, in call order.
    pub fn starts(&self) -> Vec<u64> {
        self.starts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn increments(&self) -> u64 {
        self.increments.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> u64 {
        self.stops.load(Ordering::SeqCst)
    }
}

impl ProgressSink for RecordingProgress {
    fn start(&self, total: u64) {
        self.starts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(total);
    }

    fn increment(&self) {
        let seen = self.increments.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((n, cancel)) = &self.cancel_after {
            if seen >= *n {
                cancel.cancel();
            }
        }
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}
