//! HTTP front-end: one request runs one query on a fresh session.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::HeaderValue;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};

use devscout_core::{
    CompanyRecord, Completion, LogMessage, Query, Session, SessionObserver, WorkflowFactory,
    WorkflowFailure,
};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    factory: Arc<dyn WorkflowFactory>,
}

impl AppState {
    pub fn new(factory: Arc<dyn WorkflowFactory>) -> Self {
        Self { factory }
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AgentQuery {
    pub query: String,
}

/// Body of every `/api/agent` response. Failures are reported in-band with
/// a 200 status; clients branch on the presence of `error`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AgentResponse {
    Success {
        query: String,
        analysis: Option<String>,
        companies: Vec<CompanyRecord>,
    },
    Error {
        error: String,
        query: String,
    },
}

impl AgentResponse {
    fn error(error: impl ToString, query: String) -> Self {
        Self::Error {
            error: error.to_string(),
            query,
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the CORS layer for a fixed allow-list of browser origins.
fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    let origins = allowed_origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o).with_context(|| format!("invalid allowed origin: {o:?}"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

pub fn build_router(state: AppState, allowed_origins: &[String]) -> Result<Router> {
    Ok(Router::new()
        .route("/api/agent", post(agent_endpoint))
        .layer(cors_layer(allowed_origins)?)
        .with_state(state))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(
    state: AppState,
    bind: &str,
    port: u16,
    allowed_origins: &[String],
) -> Result<()> {
    let app = build_router(state, allowed_origins)?;
    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {bind}:{port}"))?;

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        tracing::info!("shutdown requested");
        trigger.cancel();
    });

    tracing::info!(origins = ?allowed_origins, "devscout serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    tracing::info!("devscout serve shut down");
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn agent_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<AgentQuery>,
) -> Json<AgentResponse> {
    let raw = payload.query;

    let query = match Query::parse(&raw) {
        Ok(query) => query,
        Err(e) => {
            tracing::info!("rejecting empty query");
            return Json(AgentResponse::error(e, raw));
        }
    };

    let mut session = Session::new(state.factory.create());
    let mut collector = ResponseCollector::new(raw.clone());
    let started = std::time::Instant::now();

    let response = match session.run(query.as_str(), &mut collector).await {
        Ok(_) => collector.into_response(),
        Err(e) => AgentResponse::error(e, raw),
    };

    tracing::info!(
        query = %query,
        ok = matches!(response, AgentResponse::Success { .. }),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "agent request finished"
    );
    Json(response)
}

/// Turns the session's terminal callback into a response body. Progress
/// lines go to the server log only.
struct ResponseCollector {
    raw_query: String,
    response: Option<AgentResponse>,
}

impl ResponseCollector {
    fn new(raw_query: String) -> Self {
        Self {
            raw_query,
            response: None,
        }
    }

    fn into_response(self) -> AgentResponse {
        match self.response {
            Some(response) => response,
            None => AgentResponse::error("workflow finished without an outcome", self.raw_query),
        }
    }
}

impl SessionObserver for ResponseCollector {
    fn on_log(&mut self, message: LogMessage) {
        tracing::info!(seq = message.seq, "{}", message.text);
    }

    fn on_complete(&mut self, completion: Completion) {
        self.response = Some(AgentResponse::Success {
            query: self.raw_query.clone(),
            analysis: completion.result.analysis,
            companies: completion.result.companies,
        });
    }

    fn on_error(&mut self, query: &Query, failure: WorkflowFailure) {
        tracing::warn!(query = %query, cause = %failure, "workflow failed");
        self.response = Some(AgentResponse::error(failure, self.raw_query.clone()));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
