// src/engine/queue.rs

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, warn};

use crate::types::TriggerWhileRunningBehaviour;

/// Triggers that arrive while a group's reaction is running.
///
/// Semantics:
/// - Each queued entry is a *batch* of changed paths for one future run.
/// - `max_runs` (the `queue_length` setting) bounds how many batches are
///   kept; the default of 1 means "at most one more run is queued".
/// - When the reaction finishes, `drain_pending()` merges every batch into a
///   single run, so a burst of saves causes exactly one extra run.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    runs: VecDeque<BTreeSet<String>>,
}

impl TriggerQueue {
    /// `max_runs` is clamped to at least 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs: max_runs.max(1),
            runs: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.behaviour
    }

    /// Record a change seen while a reaction is running.
    ///
    /// - `Queue`: merge into the last batch (or start one); drop the oldest
    ///   batches beyond `max_runs`.
    /// - `Cancel`: forget everything queued so far and keep only this path.
    ///   The running reaction itself is never interrupted.
    pub fn record_trigger(&mut self, path: &str) {
        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                match self.runs.back_mut() {
                    Some(last) => {
                        let inserted = last.insert(path.to_string());
                        debug!(path, inserted, "merged trigger into queued run");
                    }
                    None => {
                        self.runs.push_back(BTreeSet::from([path.to_string()]));
                        debug!(path, "queued a run");
                    }
                }

                if self.runs.len() > self.max_runs {
                    warn!(
                        batches = self.runs.len(),
                        max_runs = self.max_runs,
                        "queue_length exceeded; dropping oldest queued runs"
                    );
                    while self.runs.len() > self.max_runs {
                        self.runs.pop_front();
                    }
                }
            }
            TriggerWhileRunningBehaviour::Cancel => {
                debug!(path, "replacing queued runs (cancel mode)");
                self.runs.clear();
                self.runs.push_back(BTreeSet::from([path.to_string()]));
            }
        }
    }

    /// Merge all queued batches into one sorted list of changed paths.
    pub fn drain_pending(&mut self) -> Vec<String> {
        let mut merged = BTreeSet::new();
        while let Some(batch) = self.runs.pop_front() {
            merged.extend(batch);
        }
        debug!(drained = merged.len(), "drained queued triggers");
        merged.into_iter().collect()
    }
}
