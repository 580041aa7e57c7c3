//! Execution task: runs one workflow invocation off the caller's control
//! loop and hands back a [`RunHandle`] for observing it.
//!
//! Guarantees, per handle:
//! - every log line is delivered, in emission order;
//! - exactly one terminal event (`Completed` or `Failed`) follows them;
//! - a panicking workflow is reported as `Failed`, never propagated.
//!
//! There is no cancellation: dropping the handle abandons the outcome but
//! the invocation runs to completion.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use uuid::Uuid;

use crate::model::Query;
use crate::relay::{self, RelayReceiver, RunEvent, TryRecvError};
use crate::workflow::{Workflow, WorkflowFailure};

/// Cause reported when the worker disappears without sending an outcome.
pub const LOST_WORKER_CAUSE: &str = "workflow task ended without reporting an outcome";

/// Start one invocation of `workflow.run(query)` on a new tokio task.
///
/// Must be called from within a tokio runtime.
pub fn submit(workflow: Arc<dyn Workflow>, query: Query) -> RunHandle {
    let id = Uuid::new_v4();
    let (sink, events) = relay::channel();
    let task_query = query.clone();

    tracing::info!(
        run_id = %id,
        workflow = workflow.name(),
        query = %query,
        "starting workflow run"
    );

    tokio::spawn(async move {
        let outcome = AssertUnwindSafe(workflow.run(&task_query, &sink))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(WorkflowFailure::new(panic_cause(panic.as_ref()))));

        match &outcome {
            Ok(result) => tracing::info!(
                run_id = %id,
                companies = result.companies.len(),
                logged = sink.logged(),
                "workflow run completed"
            ),
            Err(failure) => tracing::warn!(
                run_id = %id,
                error = %failure,
                "workflow run failed"
            ),
        }
        sink.finish(outcome);
    });

    RunHandle {
        id,
        query,
        started_at: Utc::now(),
        events,
        finished: false,
    }
}

fn panic_cause(panic: &(dyn std::any::Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("workflow panicked: {detail}")
}

/// Observer side of one in-flight invocation.
#[derive(Debug)]
pub struct RunHandle {
    id: Uuid,
    query: Query,
    started_at: DateTime<Utc>,
    events: RelayReceiver,
    finished: bool,
}

impl RunHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whether the terminal event has already been handed out.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Wait for the next event. Returns `None` after the terminal event.
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        if self.finished {
            return None;
        }
        let event = self.events.recv().await;
        self.settle(event)
    }

    /// Take the next event if one is ready, without waiting.
    pub fn try_next_event(&mut self) -> Option<RunEvent> {
        if self.finished {
            return None;
        }
        match self.events.try_recv() {
            Ok(event) => self.settle(Some(event)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => self.settle(None),
        }
    }

    /// Wait for the run to finish, passing every log line to `on_log`, and
    /// return the terminal event.
    pub async fn wait(mut self, mut on_log: impl FnMut(crate::model::LogMessage)) -> RunEvent {
        loop {
            match self.next_event().await {
                Some(RunEvent::Log(message)) => on_log(message),
                Some(terminal) => return terminal,
                None => return RunEvent::Failed(WorkflowFailure::new(LOST_WORKER_CAUSE)),
            }
        }
    }

    /// Mark the handle finished on a terminal event, and turn a closed
    /// channel into a synthetic failure so exactly one terminal is seen.
    fn settle(&mut self, event: Option<RunEvent>) -> Option<RunEvent> {
        let event = event.unwrap_or_else(|| {
            tracing::error!(run_id = %self.id, "{LOST_WORKER_CAUSE}");
            RunEvent::Failed(WorkflowFailure::new(LOST_WORKER_CAUSE))
        });
        if event.is_terminal() {
            self.finished = true;
        }
        Some(event)
    }
}
