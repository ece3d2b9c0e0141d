// src/exec/mod.rs

//! Execution layer.
//!
//! - [`runner`] runs a resolved list of stage steps sequentially and prints
//!   the timing summary.
//! - [`backend`] provides the `ReactionBackend` trait the watch reactors talk
//!   to, and the production `RealReactionBackend`; tests can replace it with
//!   a fake implementation.
//! - [`command`] runs external commands (the font converter).

pub mod backend;
pub mod command;
pub mod runner;

pub use backend::{ReactionBackend, ReactionRequest, RealReactionBackend};
pub use runner::{PipelineRunner, RunSummary, StageTiming};
