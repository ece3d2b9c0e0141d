use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use assetflow::engine::{ReactorEvent, RunOutcome};
use assetflow::errors::Result;
use assetflow::exec::{ReactionBackend, ReactionRequest};

/// A fake backend that:
/// - records every reaction request,
/// - reports `RunCompleted` with the configured outcome right away, unless
///   built with [`FakeReactionBackend::manual`].
pub struct FakeReactionBackend {
    events: mpsc::Sender<ReactorEvent>,
    requests: Arc<Mutex<Vec<ReactionRequest>>>,
    outcome: RunOutcome,
    auto_complete: bool,
}

impl FakeReactionBackend {
    /// Completes every reaction immediately with `Success`.
    pub fn new(
        events: mpsc::Sender<ReactorEvent>,
        requests: Arc<Mutex<Vec<ReactionRequest>>>,
    ) -> Self {
        Self {
            events,
            requests,
            outcome: RunOutcome::Success,
            auto_complete: true,
        }
    }

    /// Records requests but never completes them; the test sends
    /// `RunCompleted` itself.
    pub fn manual(
        events: mpsc::Sender<ReactorEvent>,
        requests: Arc<Mutex<Vec<ReactionRequest>>>,
    ) -> Self {
        Self {
            auto_complete: false,
            ..Self::new(events, requests)
        }
    }

    pub fn with_outcome(mut self, outcome: RunOutcome) -> Self {
        self.outcome = outcome;
        self
    }
}

impl ReactionBackend for FakeReactionBackend {
    fn start_reaction(
        &mut self,
        request: ReactionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.events.clone();
        let requests = Arc::clone(&self.requests);
        let outcome = self.outcome;
        let auto_complete = self.auto_complete;

        Box::pin(async move {
            {
                let mut guard = requests.lock().unwrap();
                guard.push(request);
            }

            if auto_complete {
                tx.send(ReactorEvent::RunCompleted { outcome })
                    .await
                    .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
