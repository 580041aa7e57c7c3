//! Session state machine shared by every front-end.
//!
//! Enforces the transition graph:
//!
//! ```text
//! idle      -> running
//! running   -> completed
//! running   -> failed
//! completed -> running
//! failed    -> running
//! ```
//!
//! Empty queries and submissions while a run is in flight are rejected
//! without touching the workflow. Outcomes are delivered to a
//! [`SessionObserver`] on whichever context calls [`Session::poll`] or
//! [`Session::wait`], never on the worker.

use std::sync::Arc;

use thiserror::Error;

use crate::execution::{self, LOST_WORKER_CAUSE, RunHandle};
use crate::model::{EmptyQuery, LogMessage, Query, ResearchResult, SessionStatus};
use crate::relay::RunEvent;
use crate::report::{self, Report};
use crate::workflow::{Workflow, WorkflowFailure};

/// Why a submission was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    EmptyQuery(#[from] EmptyQuery),

    #[error("a query is already running")]
    Busy,
}

/// A finished, rendered run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub query: Query,
    pub result: ResearchResult,
    pub report: Report,
}

/// Lifecycle callbacks. Every method defaults to doing nothing.
pub trait SessionObserver {
    fn on_start(&mut self, _query: &Query) {}
    fn on_log(&mut self, _message: LogMessage) {}
    fn on_complete(&mut self, _completion: Completion) {}
    fn on_error(&mut self, _query: &Query, _failure: WorkflowFailure) {}
}

/// Observer that ignores everything.
impl SessionObserver for () {}

/// One front-end's relationship with the workflow.
pub struct Session {
    workflow: Arc<dyn Workflow>,
    status: SessionStatus,
    current: Option<RunHandle>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("workflow", &self.workflow.name())
            .field("status", &self.status)
            .field("current", &self.current.as_ref().map(RunHandle::id))
            .finish()
    }
}

impl Session {
    pub fn new(workflow: Arc<dyn Workflow>) -> Self {
        Self {
            workflow,
            status: SessionStatus::Idle,
            current: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// True while a run is in flight; front-ends disable submission.
    pub fn is_busy(&self) -> bool {
        self.status == SessionStatus::Running
    }

    /// Check whether `from -> to` is an edge of the state graph.
    pub fn is_valid_transition(from: SessionStatus, to: SessionStatus) -> bool {
        use crate::model::SessionStatus::*;
        matches!(
            (from, to),
            (Idle, Running)
                | (Running, Completed)
                | (Running, Failed)
                | (Completed, Running)
                | (Failed, Running)
        )
    }

    fn transition(&mut self, to: SessionStatus) {
        debug_assert!(
            Self::is_valid_transition(self.status, to),
            "invalid session transition: {} -> {to}",
            self.status
        );
        tracing::debug!(from = %self.status, to = %to, "session transition");
        self.status = to;
    }

    /// Validate `raw` and start a run for it.
    ///
    /// On success the session is `Running` and `observer.on_start` has been
    /// called. On error nothing changes and no workflow is invoked.
    pub fn submit<O>(&mut self, raw: &str, observer: &mut O) -> Result<Query, SessionError>
    where
        O: SessionObserver + ?Sized,
    {
        let query = Query::parse(raw)?;
        if self.is_busy() {
            tracing::debug!(query = %query, "rejecting submission while a run is in flight");
            return Err(SessionError::Busy);
        }

        let handle = execution::submit(Arc::clone(&self.workflow), query.clone());
        self.current = Some(handle);
        self.transition(SessionStatus::Running);
        observer.on_start(&query);
        Ok(query)
    }

    /// Deliver every event that is already queued, without waiting.
    ///
    /// Returns the number of events delivered. Intended for front-ends with
    /// their own event loop, which call it once per turn.
    pub fn poll<O>(&mut self, observer: &mut O) -> usize
    where
        O: SessionObserver + ?Sized,
    {
        let mut delivered = 0;
        while let Some(event) = self.current.as_mut().and_then(RunHandle::try_next_event) {
            delivered += 1;
            self.dispatch(event, observer);
        }
        delivered
    }

    /// Wait until the in-flight run (if any) finishes, delivering its
    /// events as they arrive.
    pub async fn wait<O>(&mut self, observer: &mut O)
    where
        O: SessionObserver + ?Sized,
    {
        while let Some(handle) = self.current.as_mut() {
            let event = handle
                .next_event()
                .await
                .unwrap_or_else(|| RunEvent::Failed(WorkflowFailure::new(LOST_WORKER_CAUSE)));
            self.dispatch(event, observer);
        }
    }

    /// Submit `raw` and wait for its outcome. Returns the final status.
    pub async fn run<O>(&mut self, raw: &str, observer: &mut O) -> Result<SessionStatus, SessionError>
    where
        O: SessionObserver + ?Sized,
    {
        self.submit(raw, observer)?;
        self.wait(observer).await;
        Ok(self.status)
    }

    fn dispatch<O>(&mut self, event: RunEvent, observer: &mut O)
    where
        O: SessionObserver + ?Sized,
    {
        match event {
            RunEvent::Log(message) => observer.on_log(message),
            RunEvent::Completed(result) => {
                let Some(handle) = self.current.take() else {
                    return;
                };
                let report = report::render(&result);
                self.transition(SessionStatus::Completed);
                observer.on_complete(Completion {
                    query: handle.query().clone(),
                    result,
                    report,
                });
            }
            RunEvent::Failed(failure) => {
                let Some(handle) = self.current.take() else {
                    return;
                };
                self.transition(SessionStatus::Failed);
                observer.on_error(handle.query(), failure);
            }
        }
    }
}
