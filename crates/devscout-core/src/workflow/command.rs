//! Subprocess workflow adapter.
//!
//! Runs `<program> [args...] <query>` and parses its stdout line by line:
//!
//! ```text
//! {"type":"log","message":"Finding articles about vector databases"}
//! {"type":"result","companies":[...],"analysis":"..."}
//! {"type":"error","message":"search API quota exhausted"}
//! ```
//!
//! Any other non-empty line is forwarded verbatim as a progress message, so
//! a research script that only `print`s still shows its progress.

use std::io;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use super::trait_def::{Workflow, WorkflowFailure};
use crate::model::{Query, ResearchResult};
use crate::relay::LogSink;

/// One parsed stdout line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Log(String),
    Result(ResearchResult),
    Error(String),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedLine {
    Log { message: String },
    Result(ResearchResult),
    Error { message: String },
}

/// Parse a single stdout line. Returns `None` for blank lines.
pub fn parse_output_line(line: &str) -> Option<OutputLine> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = match serde_json::from_str::<TaggedLine>(trimmed) {
        Ok(TaggedLine::Log { message }) => OutputLine::Log(message),
        Ok(TaggedLine::Result(result)) => OutputLine::Result(result),
        Ok(TaggedLine::Error { message }) => OutputLine::Error(message),
        Err(_) => OutputLine::Log(trimmed.to_owned()),
    };
    Some(parsed)
}

/// Workflow that delegates the research to an external program.
#[derive(Debug, Clone)]
pub struct CommandWorkflow {
    program: String,
    args: Vec<String>,
}

impl CommandWorkflow {
    /// Run `program` with the query as its only argument.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Arguments placed before the query.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait]
impl Workflow for CommandWorkflow {
    fn name(&self) -> &str {
        "command"
    }

    async fn run(&self, query: &Query, log: &LogSink) -> Result<ResearchResult, WorkflowFailure> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(query.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            WorkflowFailure::new(format!(
                "failed to spawn workflow program '{}': {e}",
                self.program
            ))
        })?;

        debug!(program = %self.program, pid = ?child.id(), "workflow process started");

        if let Some(stderr) = child.stderr.take() {
            let program = self.program.clone();
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr);
                let mut buf = Vec::new();
                while let Ok(Some(line)) = next_line_lossy(&mut reader, &mut buf).await {
                    debug!(program = %program, "stderr: {line}");
                }
            });
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkflowFailure::new("workflow process has no stdout"))?;

        let mut result = None;
        let mut error = None;
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            match next_line_lossy(&mut reader, &mut buf).await {
                Ok(Some(line)) => match parse_output_line(&line) {
                    Some(OutputLine::Log(message)) => log.log(message),
                    Some(OutputLine::Result(r)) => {
                        if result.replace(r).is_some() {
                            warn!(program = %self.program, "workflow emitted more than one result, keeping the last");
                        }
                    }
                    Some(OutputLine::Error(message)) => error = Some(message),
                    None => {}
                },
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "error reading workflow stdout");
                    error.get_or_insert_with(|| format!("failed to read workflow output: {e}"));
                    break;
                }
            }
        }

        // After a read error the child may still be writing; closing our end
        // turns a full pipe into EPIPE for it.
        drop(reader);

        let status = child.wait().await.map_err(|e| {
            WorkflowFailure::new(format!("failed to wait for workflow program: {e}"))
        })?;
        debug!(program = %self.program, %status, "workflow process exited");

        resolve_outcome(result, error, status)
    }
}

/// Read one `\n`-terminated line, replacing invalid UTF-8 rather than
/// failing. Returns `None` at end of stream.
async fn next_line_lossy<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(&buf[..]);
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
}

/// An `error` line wins, then a `result` line, then the exit status.
fn resolve_outcome(
    result: Option<ResearchResult>,
    error: Option<String>,
    status: ExitStatus,
) -> Result<ResearchResult, WorkflowFailure> {
    if let Some(message) = error {
        return Err(WorkflowFailure::new(message));
    }
    if let Some(result) = result {
        if !status.success() {
            warn!(%status, "workflow exited unsuccessfully after producing a result");
        }
        return Ok(result);
    }
    Err(WorkflowFailure::new(format!(
        "workflow exited ({status}) without producing a result"
    )))
}
