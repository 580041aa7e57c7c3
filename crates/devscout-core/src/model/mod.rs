//! Core data model: queries, research results, log messages and session
//! status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Returned when a submitted query is empty or whitespace-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("query must not be empty")]
pub struct EmptyQuery;

/// A validated, trimmed, non-empty query string.
///
/// The only way to build one is [`Query::parse`], so holding a `Query`
/// proves the non-empty invariant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    /// Trim `raw` and reject it if nothing is left.
    pub fn parse(raw: &str) -> Result<Self, EmptyQuery> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(EmptyQuery);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Query {
    type Err = EmptyQuery;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Query {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Research result
// ---------------------------------------------------------------------------

/// One discovered developer tool or company.
///
/// Optional fields serialize as `null` when the workflow could not
/// determine them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub name: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub pricing_model: Option<String>,
    #[serde(default)]
    pub is_open_source: Option<bool>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub language_support: Vec<String>,
    #[serde(default)]
    pub api_available: Option<bool>,
    #[serde(default)]
    pub integration_capabilities: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CompanyRecord {
    /// Start a record with just a name and website; everything else unknown.
    pub fn new(name: impl Into<String>, website: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            website: website.into(),
            ..Self::default()
        }
    }
}

/// The structured output of one workflow invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchResult {
    #[serde(default)]
    pub companies: Vec<CompanyRecord>,
    #[serde(default)]
    pub analysis: Option<String>,
}

// ---------------------------------------------------------------------------
// Log messages
// ---------------------------------------------------------------------------

/// A progress line emitted by a workflow while it runs.
///
/// `seq` starts at 0 for each run and increases by one per message, so a
/// consumer can verify it observed every message in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub seq: u64,
    pub text: String,
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// ---------------------------------------------------------------------------
// Session status
// ---------------------------------------------------------------------------

/// Lifecycle state of a front-end session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl FromStr for SessionStatus {
    type Err = SessionStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(SessionStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`SessionStatus`] string.
#[derive(Debug, Clone, Error)]
#[error("invalid session status: {0:?}")]
pub struct SessionStatusParseError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_is_trimmed() {
        let q = Query::parse("  vector databases \n").unwrap();
        assert_eq!(q.as_str(), "vector databases");
    }

    #[test]
    fn empty_and_whitespace_queries_rejected() {
        for raw in ["", " ", "\t\n", "   \r\n  "] {
            assert_eq!(Query::parse(raw), Err(EmptyQuery), "raw: {raw:?}");
        }
    }

    #[test]
    fn session_status_display_roundtrip() {
        for status in [
            SessionStatus::Idle,
            SessionStatus::Running,
            SessionStatus::Completed,
            SessionStatus::Failed,
        ] {
            let parsed: SessionStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("paused".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn company_record_absent_fields_serialize_as_null() {
        let record = CompanyRecord::new("Acme", "acme.io");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["name"], "Acme");
        assert!(json["pricing_model"].is_null());
        assert!(json["is_open_source"].is_null());
        assert!(json["api_available"].is_null());
        assert!(json["description"].is_null());
        assert_eq!(json["tech_stack"], serde_json::json!([]));
    }

    #[test]
    fn research_result_deserializes_with_missing_fields() {
        let result: ResearchResult =
            serde_json::from_str(r#"{"companies":[{"name":"Qdrant"}]}"#).unwrap();
        assert_eq!(result.companies.len(), 1);
        assert_eq!(result.companies[0].name, "Qdrant");
        assert!(result.companies[0].tech_stack.is_empty());
        assert!(result.analysis.is_none());
    }
}
