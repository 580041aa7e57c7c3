//! Shared test utilities for devscout integration tests.
//!
//! Provides a scripted [`StubWorkflow`] standing in for the real research
//! backend, a [`StubFactory`] that mints stubs per request, a
//! [`RecordingObserver`] that captures session callbacks in order, and
//! result fixtures.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use devscout_core::relay::LogSink;
use devscout_core::{
    CompanyRecord, Completion, LogMessage, Query, ResearchResult, Session, SessionObserver,
    Workflow, WorkflowFactory, WorkflowFailure,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// One company with six tech-stack entries, API available, no description
/// and no analysis.
pub fn acme_result() -> ResearchResult {
    ResearchResult {
        companies: vec![CompanyRecord {
            name: "Acme".to_string(),
            website: "acme.io".to_string(),
            pricing_model: Some("freemium".to_string()),
            is_open_source: Some(false),
            tech_stack: strings(&["Rust", "Go", "Python", "C++", "Java", "Kotlin"]),
            api_available: Some(true),
            ..CompanyRecord::default()
        }],
        analysis: None,
    }
}

/// Two companies plus an analysis paragraph.
pub fn sample_result() -> ResearchResult {
    ResearchResult {
        companies: vec![
            CompanyRecord {
                name: "Qdrant".to_string(),
                website: "https://qdrant.tech".to_string(),
                pricing_model: Some("Freemium".to_string()),
                is_open_source: Some(true),
                tech_stack: strings(&["Rust", "gRPC"]),
                language_support: strings(&["Python", "TypeScript", "Rust", "Go"]),
                api_available: Some(true),
                integration_capabilities: strings(&["LangChain", "LlamaIndex"]),
                description: Some("Vector similarity search engine".to_string()),
            },
            CompanyRecord {
                name: "Pinecone".to_string(),
                website: "https://www.pinecone.io".to_string(),
                pricing_model: Some("Paid".to_string()),
                is_open_source: Some(false),
                api_available: Some(true),
                description: Some("Analysis failed".to_string()),
                ..CompanyRecord::default()
            },
        ],
        analysis: Some("Qdrant for self-hosting, Pinecone for managed.".to_string()),
    }
}

// ---------------------------------------------------------------------------
// Stub workflow
// ---------------------------------------------------------------------------

/// Holds a gated stub's runs until released.
#[derive(Debug, Clone)]
pub struct Gate {
    permits: Arc<Semaphore>,
}

impl Gate {
    /// Let one waiting (or future) run proceed.
    pub fn release(&self) {
        self.permits.add_permits(1);
    }
}

/// A workflow that emits scripted log lines and returns scripted outcomes.
///
/// Outcomes are consumed in order; the last one repeats. Clones share
/// counters, so a test can keep a clone after handing one to a session.
#[derive(Debug, Clone)]
pub struct StubWorkflow {
    logs: Vec<String>,
    outcomes: Arc<Mutex<VecDeque<Result<ResearchResult, WorkflowFailure>>>>,
    gate: Option<Gate>,
    calls: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl StubWorkflow {
    pub fn scripted(outcomes: Vec<Result<ResearchResult, WorkflowFailure>>) -> Self {
        assert!(!outcomes.is_empty(), "a stub needs at least one outcome");
        Self {
            logs: Vec::new(),
            outcomes: Arc::new(Mutex::new(outcomes.into())),
            gate: None,
            calls: Arc::new(AtomicUsize::new(0)),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn succeeding(result: ResearchResult) -> Self {
        Self::scripted(vec![Ok(result)])
    }

    pub fn failing(cause: &str) -> Self {
        Self::scripted(vec![Err(WorkflowFailure::new(cause))])
    }

    /// Log these lines at the start of every run.
    pub fn with_logs<I, S>(mut self, logs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.logs = logs.into_iter().map(Into::into).collect();
        self
    }

    /// Make every run wait (after logging) until the returned gate is
    /// released once for it.
    pub fn gated(mut self) -> (Self, Gate) {
        let gate = Gate {
            permits: Arc::new(Semaphore::new(0)),
        };
        self.gate = Some(gate.clone());
        (self, gate)
    }

    /// Number of times `run` has been entered.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Queries received, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn into_arc(self) -> Arc<dyn Workflow> {
        Arc::new(self)
    }

    fn next_outcome(&self) -> Result<ResearchResult, WorkflowFailure> {
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.len() > 1 {
            outcomes.pop_front().unwrap()
        } else {
            outcomes.front().cloned().unwrap()
        }
    }
}

#[async_trait]
impl Workflow for StubWorkflow {
    fn name(&self) -> &str {
        "stub"
    }

    async fn run(&self, query: &Query, log: &LogSink) -> Result<ResearchResult, WorkflowFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());

        for line in &self.logs {
            log.log(line.clone());
            tokio::task::yield_now().await;
        }

        if let Some(gate) = &self.gate {
            gate.permits
                .acquire()
                .await
                .expect("gate semaphore closed")
                .forget();
        }

        self.next_outcome()
    }
}

/// Factory that hands out a fresh clone of a template stub per call.
#[derive(Debug, Clone)]
pub struct StubFactory {
    template: StubWorkflow,
    created: Arc<AtomicUsize>,
}

impl StubFactory {
    pub fn new(template: StubWorkflow) -> Self {
        Self {
            template,
            created: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many instances have been created.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// The shared template, for inspecting call counts.
    pub fn template(&self) -> &StubWorkflow {
        &self.template
    }
}

impl WorkflowFactory for StubFactory {
    fn create(&self) -> Arc<dyn Workflow> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Arc::new(self.template.clone())
    }
}

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// One captured session callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed {
    Start(String),
    Log(LogMessage),
    Complete(Completion),
    Error { query: String, cause: String },
}

impl Observed {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Error { .. })
    }
}

/// Records every callback it receives, in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub events: Vec<Observed>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn terminal_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_terminal()).count()
    }

    pub fn log_texts(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Observed::Log(m) => Some(m.text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn completions(&self) -> Vec<&Completion> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Observed::Complete(c) => Some(c),
                _ => None,
            })
            .collect()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_start(&mut self, query: &Query) {
        self.events.push(Observed::Start(query.to_string()));
    }

    fn on_log(&mut self, message: LogMessage) {
        self.events.push(Observed::Log(message));
    }

    fn on_complete(&mut self, completion: Completion) {
        self.events.push(Observed::Complete(completion));
    }

    fn on_error(&mut self, query: &Query, failure: WorkflowFailure) {
        self.events.push(Observed::Error {
            query: query.to_string(),
            cause: failure.message().to_string(),
        });
    }
}

// ---------------------------------------------------------------------------
// Polling helper
// ---------------------------------------------------------------------------

/// Poll `session` until it is no longer busy, the way an event-loop
/// front-end would. Panics after five seconds.
pub async fn poll_until_idle<O>(session: &mut Session, observer: &mut O)
where
    O: SessionObserver + ?Sized,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while session.is_busy() {
        session.poll(observer);
        if !session.is_busy() {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "session still busy after 5s"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
