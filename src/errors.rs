// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Configuration problems (unknown tasks, cycles, malformed globs) surface as
//! dedicated variants so callers can tell them apart from stage failures.
//! Stage internals use `anyhow` with context and are wrapped in
//! [`AssetflowError::Stage`] by the pipeline runner.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unknown task '{name}' referenced by '{referenced_by}'")]
    UnknownTask { name: String, referenced_by: String },

    #[error("Unknown pipeline: {0}")]
    UnknownPipeline(String),

    #[error("Cycle detected between pipelines: {0}")]
    PipelineCycle(String),

    #[error("Stage '{stage}' failed: {source:#}")]
    Stage {
        stage: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetflowError>;
