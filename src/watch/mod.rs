// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - compiling each watch group's `files` / `exclude` globs,
//! - wiring up a cross-platform filesystem watcher (`notify`),
//! - optional content hashing so a save that did not change any bytes does
//!   not re-run a group's reaction.
//!
//! It does not know what a reaction does; it only turns filesystem changes
//! into `ReactorEvent::Triggered` for the groups that match.

pub mod hash;
pub mod patterns;
pub mod watcher;

pub use hash::{compute_file_hash, content_changed, HashStore, MemoryHashStore};
pub use patterns::{build_group_profiles, relative_str, GroupWatchProfile};
pub use watcher::{route_change, spawn_watcher, GroupSender, WatcherHandle};
