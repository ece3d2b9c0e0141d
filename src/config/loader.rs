// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use toml::Table;
use tracing::{debug, info};

use crate::config::interpolate::interpolate_document;
use crate::config::model::{Project, RawConfigFile};
use crate::errors::Result;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "Assetflow.toml";

/// Configuration used when no config file exists.
pub const BUILTIN_CONFIG: &str = include_str!("default.toml");

/// Parse config text and resolve placeholders.
///
/// This only performs TOML deserialization and interpolation; it does **not**
/// perform semantic validation. Use [`load_and_validate`] for that.
pub fn load_from_str(contents: &str, root: impl Into<PathBuf>) -> Result<RawConfigFile> {
    let mut doc: Table = toml::from_str(contents)?;
    interpolate_document(&mut doc)?;

    let mut config: RawConfigFile = toml::Value::Table(doc).try_into()?;
    config.root = root.into();
    Ok(config)
}

/// Load a configuration file; relative paths in it resolve against the
/// directory containing the file.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let root = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };

    load_from_str(&contents, root)
}

/// Load a configuration file from path and validate it into a [`Project`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Project> {
    let raw_config = load_from_path(&path)?;
    let project = Project::try_from(raw_config)?;
    Ok(project)
}

/// The built-in configuration, rooted at `root`.
pub fn load_builtin(root: impl Into<PathBuf>) -> Result<Project> {
    let raw_config = load_from_str(BUILTIN_CONFIG, root)?;
    Project::try_from(raw_config)
}

/// Pick the configuration for this invocation.
///
/// - an explicit path must exist;
/// - otherwise `Assetflow.toml` in the working directory is used if present;
/// - otherwise the built-in configuration, rooted at the working directory.
pub fn resolve_project(explicit: Option<&Path>) -> Result<Project> {
    if let Some(path) = explicit {
        info!(config = ?path, "loading configuration");
        return load_and_validate(path);
    }

    let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
    if default_path.is_file() {
        info!(config = ?default_path, "loading configuration");
        return load_and_validate(default_path);
    }

    debug!("no {DEFAULT_CONFIG_FILE} found, using built-in configuration");
    load_builtin(".")
}
