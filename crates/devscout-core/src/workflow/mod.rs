//! Workflow port: the external research capability the orchestrator drives.
//!
//! This module defines the [`Workflow`] trait every research backend
//! implements, the [`WorkflowFailure`] error it reports, the
//! [`WorkflowFactory`] used to mint fresh instances, and
//! [`CommandWorkflow`], which runs the research as a subprocess.
//!
//! # Architecture
//!
//! ```text
//! Session
//!     |
//!     v
//! execution::submit(workflow, query)
//!     |
//!     |   workflow.run(query, &LogSink) ---------> Workflow impl
//!     |        |                                       |
//!     |        |   <----------- sink.log("...") -------+
//!     |        v
//!     |   Result<ResearchResult, WorkflowFailure>
//! ```

pub mod command;
pub mod trait_def;

pub use command::CommandWorkflow;
pub use trait_def::{Workflow, WorkflowFactory, WorkflowFailure};
