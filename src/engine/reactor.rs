// src/engine/reactor.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::{ReactionBackend, ReactionRequest};

use super::core::ReactorCore;
use super::{ReactorCommand, ReactorEvent};

/// Async shell around [`ReactorCore`] for one watch group.
///
/// Reads events from `event_rx`, feeds them to the core and hands reactions
/// to the backend. The backend reports completion by sending
/// `ReactorEvent::RunCompleted` into the same channel.
pub struct Reactor<B: ReactionBackend> {
    core: ReactorCore,
    event_rx: mpsc::Receiver<ReactorEvent>,
    backend: B,
}

impl<B: ReactionBackend> fmt::Debug for Reactor<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactor")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<B: ReactionBackend> Reactor<B> {
    pub fn new(core: ReactorCore, event_rx: mpsc::Receiver<ReactorEvent>, backend: B) -> Self {
        Self {
            core,
            event_rx,
            backend,
        }
    }

    /// Main event loop. Returns the core so callers can inspect it.
    pub async fn run(mut self) -> Result<ReactorCore> {
        info!("watching");

        loop {
            let Some(event) = self.event_rx.recv().await else {
                info!("event channel closed; stopping");
                break;
            };

            debug!(?event, "reactor received event");
            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                break;
            }
        }

        info!(runs = self.core.runs_started(), "stopped watching");
        Ok(self.core)
    }

    async fn execute_command(&mut self, command: ReactorCommand) -> Result<()> {
        match command {
            ReactorCommand::StartRun { changed } => {
                debug!(?changed, "starting reaction");
                let request = ReactionRequest {
                    group: self.core.group().to_string(),
                    changed,
                };
                self.backend.start_reaction(request).await?;
            }
            ReactorCommand::RequestExit => {
                info!("idle with nothing queued; exiting");
            }
        }
        Ok(())
    }
}
