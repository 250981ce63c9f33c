//! CLI module for keyscope
//!
//! `index` scans a live store and persists the prefix tree; `display`
//! renders a persisted index without touching the store.

pub mod display;
pub mod error;
pub mod index;
pub mod output;
