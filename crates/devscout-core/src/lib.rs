//! Query-execution orchestrator for the devscout research agent.
//!
//! A front-end owns a [`session::Session`], submits raw query text to it,
//! and receives progress lines and a rendered [`report::Report`] through a
//! [`session::SessionObserver`]. The research itself happens behind the
//! [`workflow::Workflow`] port.

pub mod execution;
pub mod model;
pub mod relay;
pub mod report;
pub mod session;
pub mod workflow;

pub use model::{CompanyRecord, EmptyQuery, LogMessage, Query, ResearchResult, SessionStatus};
pub use session::{Completion, Session, SessionError, SessionObserver};
pub use workflow::{Workflow, WorkflowFactory, WorkflowFailure};
