// src/engine/mod.rs

//! Watch-mode orchestration.
//!
//! Each watch group gets its own reactor:
//! - a pure state machine ([`core`]) deciding when to start a reaction and
//!   what to do with triggers that arrive while one is running,
//! - the trigger queue ([`queue`]) holding those triggers,
//! - an async shell ([`reactor`]) reading events from a channel and handing
//!   reactions to a [`crate::exec::ReactionBackend`].
//!
//! [`concurrent`] starts one reactor per group plus the file watcher and
//! stops all of them together on Ctrl-C.

/// Canonical watch group name type used throughout the engine.
pub type GroupName = String;

/// Outcome of one reaction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failed,
}

/// Why a group was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Manual trigger (tests, or a future "run now" command).
    Manual,
    /// Triggered due to a filesystem event.
    FileWatch,
}

/// Options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReactorOptions {
    /// If true, stop once the group is idle and nothing is queued.
    pub exit_when_idle: bool,
}

/// Events flowing into a reactor from the watcher and its backend.
#[derive(Debug, Clone)]
pub enum ReactorEvent {
    /// A watched file changed (relative path, forward slashes).
    Triggered { path: String, reason: TriggerReason },
    /// The in-flight reaction finished.
    RunCompleted { outcome: RunOutcome },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod concurrent;
pub mod core;
pub mod queue;
pub mod reactor;

pub use core::{ReactorCommand, ReactorCore, ReactorStep};
pub use queue::TriggerQueue;
pub use reactor::Reactor;
pub use crate::types::TriggerWhileRunningBehaviour;
pub use concurrent::run_watch_groups;
