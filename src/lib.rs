// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod files;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod stages;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::{debug, info, Span};

use crate::cli::CliArgs;
use crate::config::{resolve_project, Project};
use crate::exec::PipelineRunner;
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::{ResolvedPipeline, StageStep, Step};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation (every pipeline is composed here, so a
///   bad reference fails before any file is touched)
/// - `--list` / `--dry-run` output
/// - the sequential stage run on a blocking thread
/// - the terminal watch step, unless `--no-watch`
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.as_ref().map(PathBuf::from);
    let project = Arc::new(resolve_project(config_path.as_deref())?);

    if args.list {
        print_listing(&project);
        return Ok(());
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let runner = Arc::new(PipelineRunner::new(Arc::clone(&project), Arc::clone(&fs)));
    let plan = runner.plan(&args.pipeline)?;

    if args.dry_run {
        print_plan(&plan, &project);
        return Ok(());
    }

    execute(runner, fs, plan, !args.no_watch).await
}

/// Run the stage steps of `plan`, then hand over to watch mode if the plan
/// ends in a watch step and `watch` is set.
pub async fn execute(
    runner: Arc<PipelineRunner>,
    fs: Arc<dyn FileSystem>,
    plan: ResolvedPipeline,
    watch: bool,
) -> Result<()> {
    let steps: Vec<StageStep> = plan.stage_steps().cloned().collect();
    info!(pipeline = %plan.name, stages = steps.len(), "running pipeline");

    let stage_runner = Arc::clone(&runner);
    let label = plan.name.clone();
    let span = Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(|| stage_runner.run_stages(&label, &steps)))
        .await
        .map_err(|e| anyhow!("pipeline worker failed: {e}"))??;

    match plan.watch_step() {
        Some(step) if watch => engine::run_watch_groups(runner, fs, step).await,
        Some(step) => {
            info!(label = %step.label, "--no-watch given; skipping watch step");
            Ok(())
        }
        None => Ok(()),
    }
}

/// `--dry-run` output: the flat plan, one step per line.
fn print_plan(plan: &ResolvedPipeline, project: &Project) {
    println!("assetflow dry-run: pipeline '{}'", plan.name);
    println!("  root = {}", project.root.display());
    println!();

    for (index, step) in plan.steps.iter().enumerate() {
        match step {
            Step::Stage(stage) => println!("  {:>2}. {stage}", index + 1),
            Step::Watch(watch) => {
                println!("  {:>2}. {} (watch)", index + 1, watch.label);
                for group in &watch.groups {
                    if let Some(config) = project.watch.groups.get(group) {
                        println!("        {group}: {:?} -> {:?}", config.files, config.tasks);
                    }
                }
            }
        }
    }

    debug!("dry-run complete (no execution)");
}

/// `--list` output: pipelines, tasks and watch groups.
fn print_listing(project: &Project) {
    println!("pipelines ({}):", project.pipelines.len());
    for (name, steps) in &project.pipelines {
        println!("  {name}: {}", steps.join(", "));
    }

    println!();
    println!("tasks ({}):", project.tasks.len());
    for id in project.tasks.keys() {
        println!("  {id}");
    }

    println!();
    println!(
        "watch groups ({}, behaviour = {:?}, queue_length = {}):",
        project.watch.groups.len(),
        project.watch.behaviour,
        project.watch.queue_length
    );
    for (name, group) in &project.watch.groups {
        let hash = if group.use_hash { " (use_hash)" } else { "" };
        println!("  {name}{hash}: {}", group.tasks.join(", "));
    }
}
