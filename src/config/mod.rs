// src/config/mod.rs

//! Configuration loading and validation for assetflow.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`) and the typed per-stage
//!   option records (`options.rs`).
//! - Resolve `${...}` path variables (`interpolate.rs`).
//! - Load a config file from disk, or fall back to the built-in default
//!   (`loader.rs`).
//! - Validate the result before anything runs (`validate.rs`).

pub mod interpolate;
pub mod loader;
pub mod model;
pub mod options;
pub mod validate;

pub use loader::{
    load_and_validate, load_builtin, load_from_path, load_from_str, resolve_project,
    BUILTIN_CONFIG, DEFAULT_CONFIG_FILE,
};
pub use model::{
    ConcurrentOptions, PathsSection, Project, RawConfigFile, StageConfig, WatchGroupConfig,
    WatchSection,
};
pub use options::*;
pub use validate::validate_project;
