//! Keyscope Test Utilities
//!
//! In-memory collaborators for driving a [`keyscope::Scanner`] without a
//! live store.
//!
//! # Usage
//!
//! ```rust,ignore
//! use keyscope::{ScanOptions, Scanner, Tree};
//! use keyscope_test_utils::{FakeKeySource, RecordingProgress};
//!
//! let source = FakeKeySource::new([("user:1", 10), ("user:2", 20)]);
//! let scanner = Scanner::new(source, RecordingProgress::new());
//! let mut tree = Tree::default();
//! scanner.scan(&ScanOptions::default(), &mut tree).unwrap();
//! ```

pub mod progress;
pub mod source;

// Re-exports for convenience
pub use progress::RecordingProgress;
pub use source::{pattern_matcher, FakeKeySource};
