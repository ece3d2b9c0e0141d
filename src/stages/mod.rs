// src/stages/mod.rs

//! Build stages.
//!
//! Each stage kind is implemented on its option record from
//! [`crate::config::options`]; the runner looks a task up in the project and
//! calls [`Stage::run`] through [`crate::config::StageConfig::as_stage`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use anyhow::Result;

use crate::config::Project;
use crate::fs::FileSystem;
use crate::types::TaskId;

pub mod clean;
pub mod css;
pub mod csslint;
pub mod cssmin;
pub mod imagemin;
pub mod sass;
pub mod sprite;
pub mod svgpath;
pub mod template;
pub mod uglify;
pub mod uncss;
pub mod webfont;

/// A configured stage target.
pub trait Stage {
    /// Checks that need no filesystem access (glob syntax, regexes, ranges).
    fn validate(&self) -> Result<()>;

    fn run(&self, ctx: &StageContext<'_>) -> Result<StageReport>;
}

/// What a stage did, for the timing summary and for tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Inputs processed (files compiled, minified, deleted, ...).
    pub processed: usize,
    /// Inputs skipped by the freshness filter.
    pub skipped: usize,
    pub written: Vec<PathBuf>,
    /// Advisory findings (lint warnings, pruned selectors).
    pub findings: Vec<String>,
}

impl StageReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wrote(&mut self, path: impl Into<PathBuf>) {
        self.written.push(path.into());
    }
}

/// Everything a stage may touch while running.
pub struct StageContext<'a> {
    pub project: &'a Project,
    pub fs: &'a dyn FileSystem,
    pub task: &'a TaskId,
    /// Present when the step was prefixed with `newer:`.
    pub freshness: Option<&'a Freshness>,
}

impl<'a> StageContext<'a> {
    pub fn new(
        project: &'a Project,
        fs: &'a dyn FileSystem,
        task: &'a TaskId,
        freshness: Option<&'a Freshness>,
    ) -> Self {
        Self {
            project,
            fs,
            task,
            freshness,
        }
    }

    pub fn root(&self) -> &Path {
        &self.project.root
    }

    /// Resolve a configured path against the project root.
    pub fn path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.project.resolve(path)
    }

    /// True unless the freshness filter is active and every output exists
    /// and is at least as new as every input.
    pub fn is_stale(&self, inputs: &[PathBuf], outputs: &[PathBuf]) -> bool {
        if self.freshness.is_none() {
            return true;
        }

        let mut newest_input = None;
        for input in inputs {
            match self.fs.modified(input) {
                Some(t) => newest_input = newest_input.max(Some(t)),
                None => return true,
            }
        }

        let mut oldest_output: Option<SystemTime> = None;
        for output in outputs {
            match self.fs.modified(output) {
                Some(t) => oldest_output = Some(oldest_output.map_or(t, |o| o.min(t))),
                None => return true,
            }
        }

        match (newest_input, oldest_output) {
            (Some(input), Some(output)) => input > output,
            _ => true,
        }
    }

    /// For stages without outputs: true unless the freshness filter is
    /// active and `input` has not changed since this task last succeeded.
    pub fn changed_since_last_run(&self, input: &Path) -> bool {
        let Some(freshness) = self.freshness else {
            return true;
        };
        let Some(last) = freshness.last_success(self.task) else {
            return true;
        };
        match self.fs.modified(input) {
            Some(modified) => modified > last,
            None => true,
        }
    }
}

/// Process-local memory of when each task last succeeded.
#[derive(Debug, Default)]
pub struct Freshness {
    last_success: Mutex<HashMap<TaskId, SystemTime>>,
}

impl Freshness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_success(&self, task: &TaskId) -> Option<SystemTime> {
        self.last_success
            .lock()
            .ok()
            .and_then(|map| map.get(task).copied())
    }

    /// Record a successful run that started at `started`.
    pub fn record_success(&self, task: &TaskId, started: SystemTime) {
        if let Ok(mut map) = self.last_success.lock() {
            map.insert(task.clone(), started);
        }
    }
}
