//! Log relay: carries progress messages (and finally the run outcome) from
//! the execution task to whichever context owns the session.
//!
//! The channel is unbounded so a workflow can log from synchronous code
//! without ever blocking or dropping a message. Log lines and the terminal
//! outcome travel on the same channel, which is what guarantees the outcome
//! is observed after every log line of the run.
//!
//! ```text
//! Workflow::run ──log()──> LogSink ──┐
//!                                    ├── mpsc ──> RelayReceiver ──> RunHandle
//! execution task ──finish()──────────┘
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use crate::model::{LogMessage, ResearchResult};
use crate::workflow::WorkflowFailure;

pub use tokio::sync::mpsc::error::TryRecvError;

/// Everything a run can report back to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// A progress line, in emission order.
    Log(LogMessage),
    /// The workflow returned a result. Always the last event of a run.
    Completed(ResearchResult),
    /// The workflow failed. Always the last event of a run.
    Failed(WorkflowFailure),
}

impl RunEvent {
    /// Whether this event ends the run.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Log(_))
    }
}

/// Create a connected sink/receiver pair for one run.
pub fn channel() -> (LogSink, RelayReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = LogSink {
        tx,
        next_seq: Arc::new(AtomicU64::new(0)),
    };
    (sink, RelayReceiver { rx })
}

/// The logging callback handed to a workflow.
///
/// Cheap to clone; all clones share one sequence counter, so messages are
/// numbered in the order they reach the channel.
#[derive(Debug, Clone)]
pub struct LogSink {
    tx: mpsc::UnboundedSender<RunEvent>,
    next_seq: Arc<AtomicU64>,
}

impl LogSink {
    /// Forward one progress message. Never blocks.
    ///
    /// If the owner has stopped listening the message is discarded; the run
    /// itself carries on regardless.
    pub fn log(&self, message: impl Into<String>) {
        let text = message.into();
        tracing::debug!(target: "devscout::workflow", "{text}");
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(RunEvent::Log(LogMessage { seq, text })).is_err() {
            tracing::trace!(seq, "log relay receiver dropped, discarding message");
        }
    }

    /// Number of messages logged so far.
    pub fn logged(&self) -> u64 {
        self.next_seq.load(Ordering::SeqCst)
    }

    /// Send the terminal outcome. Only the execution task calls this.
    pub(crate) fn finish(&self, outcome: Result<ResearchResult, WorkflowFailure>) {
        let event = match outcome {
            Ok(result) => RunEvent::Completed(result),
            Err(failure) => RunEvent::Failed(failure),
        };
        if self.tx.send(event).is_err() {
            tracing::debug!("run outcome discarded: receiver dropped");
        }
    }
}

/// The consuming end of a relay.
#[derive(Debug)]
pub struct RelayReceiver {
    rx: mpsc::UnboundedReceiver<RunEvent>,
}

impl RelayReceiver {
    /// Wait for the next event. `None` once every sink has been dropped and
    /// the queue is empty.
    pub async fn recv(&mut self) -> Option<RunEvent> {
        self.rx.recv().await
    }

    /// Take the next queued event without waiting.
    pub fn try_recv(&mut self) -> Result<RunEvent, TryRecvError> {
        self.rx.try_recv()
    }
}
