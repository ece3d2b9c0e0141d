// src/exec/runner.rs

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use tracing::{info, info_span};

use crate::config::Project;
use crate::errors::{AssetflowError, Result};
use crate::fs::FileSystem;
use crate::pipeline::{compose, ResolvedPipeline, StageStep};
use crate::stages::{Freshness, StageContext, StageReport};
use crate::types::TaskId;

/// Elapsed time of one stage.
#[derive(Debug, Clone)]
pub struct StageTiming {
    pub task: TaskId,
    pub elapsed: Duration,
    pub report: StageReport,
}

/// Result of running a list of stage steps.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub label: String,
    pub stages: Vec<StageTiming>,
}

impl RunSummary {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            stages: Vec::new(),
        }
    }

    pub fn total(&self) -> Duration {
        self.stages.iter().map(|s| s.elapsed).sum()
    }

    /// Log the per-stage elapsed time, longest first.
    pub fn log(&self) {
        let total = self.total();
        let mut rows: Vec<&StageTiming> = self.stages.iter().collect();
        rows.sort_by(|a, b| b.elapsed.cmp(&a.elapsed));

        info!(pipeline = %self.label, "Execution Time");
        for row in rows {
            let share = if total.is_zero() {
                0.0
            } else {
                row.elapsed.as_secs_f64() / total.as_secs_f64() * 100.0
            };
            info!(
                "  {:<24} {:>8.0?} {:>5.1}%",
                row.task.to_string(),
                row.elapsed,
                share
            );
        }
        info!("  {:<24} {:>8.0?}", "Total", total);
    }
}

/// Runs stage steps against a shared project.
///
/// Stages run strictly one after the other on the calling thread; callers on
/// the async runtime wrap calls in `spawn_blocking` and re-enter their span
/// there.
#[derive(Debug)]
pub struct PipelineRunner {
    project: Arc<Project>,
    fs: Arc<dyn FileSystem>,
    freshness: Freshness,
}

impl PipelineRunner {
    pub fn new(project: Arc<Project>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            project,
            fs,
            freshness: Freshness::new(),
        }
    }

    pub fn project(&self) -> &Arc<Project> {
        &self.project
    }

    pub fn plan(&self, pipeline: &str) -> Result<ResolvedPipeline> {
        compose(&self.project, pipeline)
    }

    /// Run `steps` in order. The first failing stage aborts the rest; outputs
    /// of stages that already finished stay on disk.
    pub fn run_stages(&self, label: &str, steps: &[StageStep]) -> Result<RunSummary> {
        let mut summary = RunSummary::new(label);

        for step in steps {
            let config = self
                .project
                .task(&step.task)
                .ok_or_else(|| AssetflowError::UnknownTask {
                    name: step.task.to_string(),
                    referenced_by: label.to_string(),
                })?;

            let span = info_span!("stage", task = %step.task);
            let _enter = span.enter();

            info!(newer = step.newer, "running stage");
            let started_at = SystemTime::now();
            let started = Instant::now();

            let ctx = StageContext::new(
                &self.project,
                self.fs.as_ref(),
                &step.task,
                step.newer.then_some(&self.freshness),
            );
            let report = config
                .as_stage()
                .run(&ctx)
                .map_err(|source| AssetflowError::Stage {
                    stage: step.to_string(),
                    source,
                })?;

            self.freshness.record_success(&step.task, started_at);
            summary.stages.push(StageTiming {
                task: step.task.clone(),
                elapsed: started.elapsed(),
                report,
            });
        }

        summary.log();
        Ok(summary)
    }
}
