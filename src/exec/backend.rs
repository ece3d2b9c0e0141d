// src/exec/backend.rs

//! Pluggable reaction backend.
//!
//! A watch reactor talks to a `ReactionBackend` instead of running stages
//! itself, so tests can swap in a fake that records requests and reports
//! completion immediately.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, warn, Instrument, Span};

use crate::engine::{ReactorEvent, RunOutcome};
use crate::errors::Result;
use crate::pipeline::StageStep;

use super::runner::PipelineRunner;

/// One reaction to start: the group that fired and the paths that changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionRequest {
    pub group: String,
    pub changed: Vec<String>,
}

pub trait ReactionBackend: Send {
    /// Start the reaction. The implementation must eventually send
    /// `ReactorEvent::RunCompleted` to the reactor that asked.
    fn start_reaction(
        &mut self,
        request: ReactionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: runs the group's stage list on the blocking pool.
pub struct RealReactionBackend {
    runner: Arc<PipelineRunner>,
    steps: Arc<Vec<StageStep>>,
    events: mpsc::Sender<ReactorEvent>,
}

impl RealReactionBackend {
    pub fn new(
        runner: Arc<PipelineRunner>,
        steps: Vec<StageStep>,
        events: mpsc::Sender<ReactorEvent>,
    ) -> Self {
        Self {
            runner,
            steps: Arc::new(steps),
            events,
        }
    }
}

impl ReactionBackend for RealReactionBackend {
    fn start_reaction(
        &mut self,
        request: ReactionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let runner = Arc::clone(&self.runner);
        let steps = Arc::clone(&self.steps);
        let events = self.events.clone();

        Box::pin(async move {
            let label = format!("watch:{}", request.group);
            let span = Span::current();
            let task = async move {
                let outcome = match tokio::task::spawn_blocking(move || {
                    span.in_scope(|| runner.run_stages(&label, &steps))
                })
                .await
                {
                    Ok(Ok(_summary)) => RunOutcome::Success,
                    Ok(Err(err)) => {
                        error!(error = %err, "reaction failed");
                        RunOutcome::Failed
                    }
                    Err(join_err) => {
                        error!(error = %join_err, "reaction panicked");
                        RunOutcome::Failed
                    }
                };

                if events
                    .send(ReactorEvent::RunCompleted { outcome })
                    .await
                    .is_err()
                {
                    warn!("reactor gone before reaction completed");
                }
            };

            tokio::spawn(task.in_current_span());
            Ok(())
        })
    }
}
