#![allow(dead_code)]

use std::path::PathBuf;

use assetflow::config::{load_from_str, Project, RawConfigFile};
use assetflow::errors::Result;

/// Builds config TOML text section by section.
///
/// Sections are emitted in insertion order, so a test reads like the
/// `Assetflow.toml` it stands for.
pub struct ConfigBuilder {
    root: PathBuf,
    sections: Vec<String>,
    pipelines: Vec<(String, Vec<String>)>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/project"),
            sections: Vec::new(),
            pipelines: Vec::new(),
        }
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn paths(self, src: &str, dist: &str) -> Self {
        self.section("paths", &format!("src = {src:?}\ndist = {dist:?}"))
    }

    /// Add `[header]` with a raw TOML body.
    pub fn section(mut self, header: &str, body: &str) -> Self {
        self.sections.push(format!("[{header}]\n{}\n", body.trim()));
        self
    }

    /// Add `[kind.target]`.
    pub fn task(self, kind: &str, target: &str, body: &str) -> Self {
        self.section(&format!("{kind}.{target}"), body)
    }

    pub fn watch_group(self, name: &str, files: &[&str], tasks: &[&str]) -> Self {
        let body = format!("files = {}\ntasks = {}", toml_list(files), toml_list(tasks));
        self.section(&format!("watch.groups.{name}"), &body)
    }

    pub fn pipeline(mut self, name: &str, steps: &[&str]) -> Self {
        self.pipelines.push((
            name.to_string(),
            steps.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    pub fn to_toml(&self) -> String {
        let mut out = self.sections.join("\n");
        if !self.pipelines.is_empty() {
            out.push_str("\n[pipelines]\n");
            for (name, steps) in &self.pipelines {
                let steps: Vec<&str> = steps.iter().map(String::as_str).collect();
                out.push_str(&format!("{name} = {}\n", toml_list(&steps)));
            }
        }
        out
    }

    pub fn build_raw(&self) -> Result<RawConfigFile> {
        load_from_str(&self.to_toml(), self.root.clone())
    }

    /// Load and validate.
    pub fn try_build(&self) -> Result<Project> {
        Project::try_from(self.build_raw()?)
    }

    pub fn build(&self) -> Project {
        self.try_build()
            .expect("Failed to build valid project from builder")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn toml_list(items: &[&str]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| format!("{s:?}")).collect();
    format!("[{}]", quoted.join(", "))
}
