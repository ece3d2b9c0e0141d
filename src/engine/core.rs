// src/engine/core.rs

//! Pure per-group reactor state machine.
//!
//! [`ReactorCore`] consumes [`ReactorEvent`]s and returns the commands the
//! async shell should carry out. It owns no channels and does no IO, so the
//! watch semantics (no overlapping runs, coalescing, cancel mode) are tested
//! without Tokio.

use tracing::{debug, info, warn};

use crate::engine::queue::TriggerQueue;
use crate::engine::{GroupName, ReactorEvent, ReactorOptions, RunOutcome};
use crate::types::TriggerWhileRunningBehaviour;

/// Instructions for the IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactorCommand {
    /// Start the group's reaction for these changed paths.
    StartRun { changed: Vec<String> },
    /// Stop the reactor.
    RequestExit,
}

/// Result of feeding one event into the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactorStep {
    pub commands: Vec<ReactorCommand>,
    pub keep_running: bool,
}

impl ReactorStep {
    fn idle() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }

    fn run(changed: Vec<String>) -> Self {
        Self {
            commands: vec![ReactorCommand::StartRun { changed }],
            keep_running: true,
        }
    }

    fn exit() -> Self {
        Self {
            commands: vec![ReactorCommand::RequestExit],
            keep_running: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Watching,
    Running,
}

#[derive(Debug)]
pub struct ReactorCore {
    group: GroupName,
    state: State,
    queue: TriggerQueue,
    options: ReactorOptions,
    runs_started: u64,
}

impl ReactorCore {
    pub fn new(
        group: impl Into<GroupName>,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
        options: ReactorOptions,
    ) -> Self {
        Self {
            group: group.into(),
            state: State::Watching,
            queue: TriggerQueue::new(behaviour, queue_length),
            options,
            runs_started: 0,
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// True while a reaction is in flight.
    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn runs_started(&self) -> u64 {
        self.runs_started
    }

    pub fn step(&mut self, event: ReactorEvent) -> ReactorStep {
        match event {
            ReactorEvent::Triggered { path, reason } => match self.state {
                State::Watching => {
                    info!(group = %self.group, path = %path, ?reason, "change detected");
                    self.start_run(vec![path])
                }
                State::Running => {
                    debug!(group = %self.group, path = %path, "change during run; queued");
                    self.queue.record_trigger(&path);
                    ReactorStep::idle()
                }
            },
            ReactorEvent::RunCompleted { outcome } => {
                if self.state != State::Running {
                    warn!(group = %self.group, "completion without a running reaction; ignored");
                    return ReactorStep::idle();
                }
                self.state = State::Watching;
                match outcome {
                    RunOutcome::Success => info!(group = %self.group, "reaction finished"),
                    RunOutcome::Failed => {
                        warn!(group = %self.group, "reaction failed; still watching")
                    }
                }

                if !self.queue.is_empty() {
                    let changed = self.queue.drain_pending();
                    return self.start_run(changed);
                }
                if self.options.exit_when_idle {
                    return ReactorStep::exit();
                }
                ReactorStep::idle()
            }
            ReactorEvent::ShutdownRequested => {
                debug!(group = %self.group, "shutdown requested");
                ReactorStep {
                    commands: Vec::new(),
                    keep_running: false,
                }
            }
        }
    }

    fn start_run(&mut self, changed: Vec<String>) -> ReactorStep {
        self.state = State::Running;
        self.runs_started += 1;
        ReactorStep::run(changed)
    }
}
