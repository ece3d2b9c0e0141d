// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{Project, RawConfigFile};
use crate::errors::{AssetflowError, Result};
use crate::files::compile_globset;
use crate::pipeline::{compose, compose_reaction};

impl TryFrom<RawConfigFile> for Project {
    type Error = crate::errors::AssetflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let project = Project::new_unchecked(raw);
        validate_project(&project)?;
        Ok(project)
    }
}

/// Run every check that does not need the filesystem.
///
/// This checks:
/// - there is at least one pipeline
/// - `[watch].queue_length >= 1`
/// - each stage's options (glob syntax, regexes, frozen metrics, ...)
/// - watch group and concurrent sections are well formed
/// - pipelines do not reference each other cyclically
/// - every pipeline and every watch reaction composes
pub fn validate_project(project: &Project) -> Result<()> {
    ensure_has_pipelines(project)?;
    validate_watch_section(project)?;
    validate_stage_options(project)?;
    validate_pipeline_graph(project)?;
    validate_compositions(project)?;
    Ok(())
}

fn ensure_has_pipelines(project: &Project) -> Result<()> {
    if project.pipelines.is_empty() {
        return Err(AssetflowError::ConfigError(
            "config must contain at least one entry in [pipelines]".to_string(),
        ));
    }
    Ok(())
}

fn validate_watch_section(project: &Project) -> Result<()> {
    if project.watch.queue_length == 0 {
        return Err(AssetflowError::ConfigError(
            "[watch].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }

    for (name, group) in project.watch.groups.iter() {
        if group.files.is_empty() {
            return Err(AssetflowError::ConfigError(format!(
                "watch group '{name}' has no `files` patterns"
            )));
        }
        if group.tasks.is_empty() {
            return Err(AssetflowError::ConfigError(format!(
                "watch group '{name}' has no `tasks`"
            )));
        }
        compile_globset(&group.files)
            .and_then(|_| compile_globset(&group.exclude))
            .map_err(|e| AssetflowError::ConfigError(format!("watch group '{name}': {e:#}")))?;
    }

    for (name, concurrent) in project.concurrent.iter() {
        if concurrent.tasks.is_empty() {
            return Err(AssetflowError::ConfigError(format!(
                "concurrent '{name}' has no `tasks`"
            )));
        }
    }

    Ok(())
}

fn validate_stage_options(project: &Project) -> Result<()> {
    for (id, config) in project.tasks.iter() {
        config
            .as_stage()
            .validate()
            .map_err(|e| AssetflowError::ConfigError(format!("[{}.{}]: {e:#}", id.kind, id.target)))?;
    }
    Ok(())
}

fn validate_pipeline_graph(project: &Project) -> Result<()> {
    // Edge direction: pipeline -> nested pipeline it references.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in project.pipelines.keys() {
        graph.add_node(name.as_str());
    }

    for (name, steps) in project.pipelines.iter() {
        for step in steps.iter() {
            if project.pipelines.contains_key(step) {
                graph.add_edge(name.as_str(), step.as_str(), ());
            }
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(AssetflowError::PipelineCycle(format!(
            "pipeline '{}' (indirectly) references itself",
            cycle.node_id()
        ))),
    }
}

fn validate_compositions(project: &Project) -> Result<()> {
    for name in project.pipelines.keys() {
        compose(project, name)?;
    }
    for group in project.watch.groups.keys() {
        compose_reaction(project, group)?;
    }
    Ok(())
}
