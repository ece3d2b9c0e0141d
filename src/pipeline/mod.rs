// src/pipeline/mod.rs

//! Pipeline composition.
//!
//! A pipeline in the config is a list of step references. The composer turns
//! it into a flat [`ResolvedPipeline`] before anything touches the disk, so
//! every reference problem is reported up front.

pub mod composer;

pub use composer::{compose, compose_reaction, parse_step_ref, ResolvedPipeline, StageStep, Step, StepRef, WatchStep};
