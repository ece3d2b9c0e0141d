// src/watch/patterns.rs

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Project;
use crate::files::PatternSet;
use crate::fs::FileSystem;

/// Compiled `files` / `exclude` globs of one watch group.
///
/// Patterns are relative to the project root; the watcher passes relative
/// paths with forward slashes (e.g. `"assets/src/sass/_base.scss"`).
#[derive(Clone)]
pub struct GroupWatchProfile {
    name: String,
    patterns: PatternSet,
    use_hash: bool,
}

impl fmt::Debug for GroupWatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupWatchProfile")
            .field("name", &self.name)
            .field("use_hash", &self.use_hash)
            .finish_non_exhaustive()
    }
}

impl GroupWatchProfile {
    pub fn new(
        name: impl Into<String>,
        files: &[String],
        exclude: &[String],
        use_hash: bool,
    ) -> Result<Self> {
        let name = name.into();
        let mut all: Vec<String> = files.to_vec();
        all.extend(exclude.iter().map(|e| format!("!{}", e.trim_start_matches('!'))));
        let patterns = PatternSet::compile(&all)
            .with_context(|| format!("building watch patterns for group {name}"))?;
        Ok(Self {
            name,
            patterns,
            use_hash,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.patterns.matches(rel_path)
    }

    /// Every file under `root` the group currently watches.
    pub fn collect_matching_files(&self, fs: &dyn FileSystem, root: &Path) -> Result<Vec<String>> {
        self.patterns.expand_relative(fs, root)
    }
}

/// Build profiles for the named groups, in the order given.
pub fn build_group_profiles(project: &Project, groups: &[String]) -> Result<Vec<GroupWatchProfile>> {
    groups
        .iter()
        .map(|name| {
            let group = project
                .watch
                .groups
                .get(name)
                .with_context(|| format!("unknown watch group {name}"))?;
            GroupWatchProfile::new(name, &group.files, &group.exclude, group.use_hash)
        })
        .collect()
}

/// Convert `path` into a string relative to `root`, with forward slashes.
///
/// Falls back to canonicalizing both sides, which helps where the watcher
/// reports a different absolute prefix for the same directory (symlinks,
/// `/private/var` on macOS).
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize())
        && let Ok(rel) = path_canon.strip_prefix(&root_canon)
    {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    None
}
