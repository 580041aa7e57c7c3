//! The `Workflow` trait -- the port every research backend implements.
//!
//! The trait is object-safe so sessions can hold `Arc<dyn Workflow>` and the
//! HTTP front-end can mint a fresh instance per request through a
//! [`WorkflowFactory`].

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Query, ResearchResult};
use crate::relay::LogSink;

/// A workflow invocation failed. The message is shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct WorkflowFailure {
    message: String,
}

impl WorkflowFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The human-readable cause.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Research capability driven by a session.
///
/// `run` may take arbitrarily long and may call `log` any number of times
/// before it returns. Implementations must not block the async runtime;
/// CPU-heavy or blocking work belongs in `tokio::task::spawn_blocking`.
#[async_trait]
pub trait Workflow: Send + Sync {
    /// Short name used in diagnostics (e.g. "command").
    fn name(&self) -> &str;

    /// Research `query`, reporting progress through `log`.
    async fn run(&self, query: &Query, log: &LogSink) -> Result<ResearchResult, WorkflowFailure>;
}

// Compile-time assertion: Workflow must be usable as `dyn Workflow`.
const _: () = {
    fn _assert_object_safe(_: &dyn Workflow) {}
};

/// Produces an independent workflow instance on demand.
///
/// Any `Fn() -> Arc<dyn Workflow>` closure is a factory.
pub trait WorkflowFactory: Send + Sync {
    fn create(&self) -> Arc<dyn Workflow>;
}

impl<F> WorkflowFactory for F
where
    F: Fn() -> Arc<dyn Workflow> + Send + Sync,
{
    fn create(&self) -> Arc<dyn Workflow> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay;

    /// Echoes the query back as a single company.
    struct EchoWorkflow;

    #[async_trait]
    impl Workflow for EchoWorkflow {
        fn name(&self) -> &str {
            "echo"
        }

        async fn run(
            &self,
            query: &Query,
            log: &LogSink,
        ) -> Result<ResearchResult, WorkflowFailure> {
            log.log(format!("echoing {query}"));
            Ok(ResearchResult {
                companies: vec![crate::model::CompanyRecord::new(query.as_str(), "")],
                analysis: None,
            })
        }
    }

    #[test]
    fn workflow_is_object_safe() {
        let workflow: Box<dyn Workflow> = Box::new(EchoWorkflow);
        assert_eq!(workflow.name(), "echo");
    }

    #[tokio::test]
    async fn echo_workflow_logs_and_returns() {
        let (sink, _rx) = relay::channel();
        let query = Query::parse("redis").unwrap();
        let result = EchoWorkflow.run(&query, &sink).await.unwrap();
        assert_eq!(result.companies[0].name, "redis");
        assert_eq!(sink.logged(), 1);
    }

    #[test]
    fn closures_are_factories() {
        let factory = || -> Arc<dyn Workflow> { Arc::new(EchoWorkflow) };
        let a = factory.create();
        let b = factory.create();
        assert!(!Arc::ptr_eq(&a, &b), "each call should build a new instance");
    }

    #[test]
    fn failure_displays_cause_verbatim() {
        let failure = WorkflowFailure::new("timeout");
        assert_eq!(failure.to_string(), "timeout");
        assert_eq!(failure.message(), "timeout");
    }
}
