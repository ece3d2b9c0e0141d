// src/engine/concurrent.rs

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, info_span, warn, Instrument, Span};

use crate::engine::core::ReactorCore;
use crate::engine::reactor::Reactor;
use crate::engine::{ReactorEvent, ReactorOptions};
use crate::exec::{PipelineRunner, RealReactionBackend};
use crate::fs::FileSystem;
use crate::pipeline::{compose_reaction, WatchStep};
use crate::watch::{build_group_profiles, spawn_watcher, GroupSender};

/// Run the groups of a terminal watch step side by side until Ctrl-C.
///
/// Each group gets its own reactor task; a slow reaction in one group never
/// delays another. All reactors stop together.
pub async fn run_watch_groups(
    runner: Arc<PipelineRunner>,
    fs: Arc<dyn FileSystem>,
    step: &WatchStep,
) -> Result<()> {
    let project = Arc::clone(runner.project());
    let labelled = step
        .label
        .strip_prefix("concurrent:")
        .and_then(|name| project.concurrent.get(name))
        .is_none_or(|c| c.log_concurrent_output);

    let profiles = build_group_profiles(&project, &step.groups)?;
    let mut senders = Vec::with_capacity(step.groups.len());
    let mut handles = Vec::with_capacity(step.groups.len());

    for profile in profiles {
        let group = profile.name().to_string();
        let steps = compose_reaction(&project, &group)
            .with_context(|| format!("composing reaction for watch group {group}"))?;

        let (tx, rx) = mpsc::channel::<ReactorEvent>(64);
        let backend = RealReactionBackend::new(Arc::clone(&runner), steps, tx.clone());
        let core = ReactorCore::new(
            group.clone(),
            project.watch.behaviour,
            project.watch.queue_length,
            ReactorOptions::default(),
        );
        let reactor = Reactor::new(core, rx, backend);

        let span = if labelled {
            info_span!("watch", group = %group)
        } else {
            Span::none()
        };
        handles.push((group, tokio::spawn(reactor.run().instrument(span))));
        senders.push(GroupSender { profile, tx });
    }

    let shutdown: Vec<mpsc::Sender<ReactorEvent>> = senders.iter().map(|g| g.tx.clone()).collect();
    let _watcher = spawn_watcher(project.root.clone(), senders, fs)?;

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("Ctrl-C received; stopping all watch groups");
        for tx in shutdown {
            let _ = tx.send(ReactorEvent::ShutdownRequested).await;
        }
    });

    info!(label = %step.label, groups = ?step.groups, "waiting for changes");

    let mut first_error = None;
    for (group, handle) in handles {
        match handle.await {
            Ok(Ok(_core)) => {}
            Ok(Err(err)) => {
                warn!(group = %group, error = %err, "watch group stopped with an error");
                first_error.get_or_insert_with(|| anyhow::Error::from(err));
            }
            Err(join_err) => {
                warn!(group = %group, error = %join_err, "watch group panicked");
                first_error.get_or_insert_with(|| anyhow::Error::from(join_err));
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
