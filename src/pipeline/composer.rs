// src/pipeline/composer.rs

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::config::Project;
use crate::errors::{AssetflowError, Result};
use crate::types::{StageKind, TaskId};

/// A single stage invocation inside a resolved pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageStep {
    pub task: TaskId,
    /// Run with the freshness filter (`newer:` prefix).
    pub newer: bool,
}

impl fmt::Display for StageStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.newer {
            write!(f, "newer:{}", self.task)
        } else {
            write!(f, "{}", self.task)
        }
    }
}

/// The terminal watch step: one or more watch groups run side by side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchStep {
    /// The reference that produced this step (`concurrent:dev`, `watch`).
    pub label: String,
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Stage(StageStep),
    Watch(WatchStep),
}

/// A flat, validated list of steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPipeline {
    pub name: String,
    pub steps: Vec<Step>,
}

impl ResolvedPipeline {
    pub fn stage_steps(&self) -> impl Iterator<Item = &StageStep> {
        self.steps.iter().filter_map(|step| match step {
            Step::Stage(stage) => Some(stage),
            Step::Watch(_) => None,
        })
    }

    pub fn watch_step(&self) -> Option<&WatchStep> {
        self.steps.iter().find_map(|step| match step {
            Step::Watch(watch) => Some(watch),
            Step::Stage(_) => None,
        })
    }
}

/// One parsed step reference, before lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepRef<'a> {
    Stage {
        newer: bool,
        kind: StageKind,
        target: Option<&'a str>,
    },
    Watch {
        group: Option<&'a str>,
    },
    Concurrent {
        name: &'a str,
    },
}

/// Parse `[newer:]kind[:target]`, `watch[:group]` or `concurrent:<name>`.
///
/// Pipeline names are not handled here; the composer checks those first.
pub fn parse_step_ref<'a>(reference: &'a str, referenced_by: &str) -> Result<StepRef<'a>> {
    let unknown = || AssetflowError::UnknownTask {
        name: reference.to_string(),
        referenced_by: referenced_by.to_string(),
    };

    let (newer, rest) = match reference.strip_prefix("newer:") {
        Some(rest) => (true, rest),
        None => (false, reference),
    };

    let (head, target) = match rest.split_once(':') {
        Some((head, target)) if !target.is_empty() => (head, Some(target)),
        Some(_) => return Err(unknown()),
        None => (rest, None),
    };

    match head {
        "watch" | "concurrent" if newer => Err(AssetflowError::ConfigError(format!(
            "'{reference}' in '{referenced_by}': `newer:` only applies to stage tasks"
        ))),
        "watch" => Ok(StepRef::Watch { group: target }),
        "concurrent" => match target {
            Some(name) => Ok(StepRef::Concurrent { name }),
            None => Err(AssetflowError::ConfigError(format!(
                "'{referenced_by}': `concurrent` needs a target, e.g. `concurrent:dev`"
            ))),
        },
        kind => {
            let kind = StageKind::from_str(kind).map_err(|_| unknown())?;
            Ok(StepRef::Stage {
                newer,
                kind,
                target,
            })
        }
    }
}

/// Resolve the pipeline called `name`.
///
/// Fails when a referenced pipeline, task, watch group or concurrent target
/// does not exist, when pipelines nest cyclically, or when a watch step is
/// not the last step.
pub fn compose(project: &Project, name: &str) -> Result<ResolvedPipeline> {
    let refs = project
        .pipelines
        .get(name)
        .ok_or_else(|| AssetflowError::UnknownPipeline(name.to_string()))?;

    let mut composer = Composer {
        project,
        stack: vec![name.to_string()],
        steps: Vec::new(),
    };
    composer.expand_refs(refs, name)?;
    let steps = composer.steps;

    if let Some(pos) = steps.iter().position(|s| matches!(s, Step::Watch(_))) {
        if pos != steps.len() - 1 {
            return Err(AssetflowError::ConfigError(format!(
                "pipeline '{name}': watch/concurrent steps must be the last step"
            )));
        }
    }

    debug!(pipeline = name, steps = steps.len(), "composed pipeline");

    Ok(ResolvedPipeline {
        name: name.to_string(),
        steps,
    })
}

/// Resolve the reaction of a watch group. Reactions may only contain stage
/// steps (nested pipelines are fine as long as they contain no watch).
pub fn compose_reaction(project: &Project, group: &str) -> Result<Vec<StageStep>> {
    let config = project.watch.groups.get(group).ok_or_else(|| {
        AssetflowError::UnknownTask {
            name: format!("watch:{group}"),
            referenced_by: "watch".to_string(),
        }
    })?;

    let label = format!("watch group '{group}'");
    let mut composer = Composer {
        project,
        stack: Vec::new(),
        steps: Vec::new(),
    };
    composer.expand_refs(&config.tasks, &label)?;

    composer
        .steps
        .into_iter()
        .map(|step| match step {
            Step::Stage(stage) => Ok(stage),
            Step::Watch(watch) => Err(AssetflowError::ConfigError(format!(
                "{label}: reaction cannot contain '{}'",
                watch.label
            ))),
        })
        .collect()
}

struct Composer<'p> {
    project: &'p Project,
    /// Pipelines currently being expanded, outermost first.
    stack: Vec<String>,
    steps: Vec<Step>,
}

impl<'p> Composer<'p> {
    fn expand_refs(&mut self, refs: &[String], referenced_by: &str) -> Result<()> {
        for reference in refs {
            self.expand_ref(reference.trim(), referenced_by)?;
        }
        Ok(())
    }

    fn expand_ref(&mut self, reference: &str, referenced_by: &str) -> Result<()> {
        let project = self.project;

        if let Some(nested) = project.pipelines.get(reference) {
            if self.stack.iter().any(|p| p == reference) {
                let mut chain = self.stack.clone();
                chain.push(reference.to_string());
                return Err(AssetflowError::PipelineCycle(chain.join(" -> ")));
            }
            self.stack.push(reference.to_string());
            self.expand_refs(nested, reference)?;
            self.stack.pop();
            return Ok(());
        }

        match parse_step_ref(reference, referenced_by)? {
            StepRef::Stage {
                newer,
                kind,
                target: Some(target),
            } => {
                let task = TaskId::new(kind, target);
                if project.task(&task).is_none() {
                    return Err(AssetflowError::UnknownTask {
                        name: task.to_string(),
                        referenced_by: referenced_by.to_string(),
                    });
                }
                self.steps.push(Step::Stage(StageStep { task, newer }));
            }
            StepRef::Stage {
                newer,
                kind,
                target: None,
            } => {
                let targets = project.targets_of(kind);
                if targets.is_empty() {
                    return Err(AssetflowError::UnknownTask {
                        name: kind.to_string(),
                        referenced_by: referenced_by.to_string(),
                    });
                }
                self.steps.extend(
                    targets
                        .into_iter()
                        .map(|task| Step::Stage(StageStep { task, newer })),
                );
            }
            StepRef::Watch { group: Some(group) } => {
                self.ensure_group(group, referenced_by)?;
                self.steps.push(Step::Watch(WatchStep {
                    label: reference.to_string(),
                    groups: vec![group.to_string()],
                }));
            }
            StepRef::Watch { group: None } => {
                if project.watch.groups.is_empty() {
                    return Err(AssetflowError::ConfigError(format!(
                        "'{referenced_by}' references `watch` but no [watch.groups] are defined"
                    )));
                }
                self.steps.push(Step::Watch(WatchStep {
                    label: reference.to_string(),
                    groups: project.watch.groups.keys().cloned().collect(),
                }));
            }
            StepRef::Concurrent { name } => {
                let concurrent =
                    project
                        .concurrent
                        .get(name)
                        .ok_or_else(|| AssetflowError::UnknownTask {
                            name: reference.to_string(),
                            referenced_by: referenced_by.to_string(),
                        })?;

                let mut groups = Vec::new();
                for task in &concurrent.tasks {
                    let group = task.strip_prefix("watch:").ok_or_else(|| {
                        AssetflowError::ConfigError(format!(
                            "concurrent '{name}': only `watch:<group>` tasks can run concurrently (got '{task}')"
                        ))
                    })?;
                    self.ensure_group(group, reference)?;
                    if !groups.iter().any(|g| g == group) {
                        groups.push(group.to_string());
                    }
                }

                self.steps.push(Step::Watch(WatchStep {
                    label: reference.to_string(),
                    groups,
                }));
            }
        }

        Ok(())
    }

    fn ensure_group(&self, group: &str, referenced_by: &str) -> Result<()> {
        if self.project.watch.groups.contains_key(group) {
            Ok(())
        } else {
            Err(AssetflowError::UnknownTask {
                name: format!("watch:{group}"),
                referenced_by: referenced_by.to_string(),
            })
        }
    }
}
