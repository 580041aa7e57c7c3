//! Line-oriented console front-end.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use devscout_core::report::{self, HEADING_RULE_WIDTH};
use devscout_core::{
    Completion, LogMessage, Query, Session, SessionObserver, Workflow, WorkflowFailure,
};

pub const BANNER: &str = "Developer Tools Research Agent";
pub const PROMPT: &str = "🔍 Developer Tools Query: ";

/// Inputs that end the loop, compared case-insensitively.
const QUIT_WORDS: [&str; 2] = ["quit", "exit"];

fn is_quit(line: &str) -> bool {
    QUIT_WORDS.iter().any(|w| line.eq_ignore_ascii_case(w))
}

/// Run the read-evaluate loop until `quit`/`exit` or end of input.
pub async fn run_console<R, W>(
    workflow: Arc<dyn Workflow>,
    mut input: R,
    mut output: W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut session = Session::new(workflow);
    writeln!(output, "{BANNER}")?;

    let mut line = String::new();
    loop {
        write!(output, "\n{PROMPT}")?;
        output.flush()?;

        line.clear();
        let read = input
            .read_line(&mut line)
            .await
            .context("failed to read from stdin")?;
        if read == 0 {
            tracing::debug!("console input closed");
            break;
        }

        let raw = line.trim();
        if is_quit(raw) {
            break;
        }
        if raw.is_empty() {
            continue;
        }

        let mut printer = ConsolePrinter::new(&mut output);
        // An empty query cannot reach here and the loop never overlaps runs.
        if let Err(e) = session.run(raw, &mut printer).await {
            tracing::warn!(error = %e, "query rejected");
        }
        printer.finish()?;
    }

    Ok(())
}

/// Prints session callbacks as they arrive, keeping the first write error.
struct ConsolePrinter<'a, W: Write> {
    out: &'a mut W,
    error: Option<io::Error>,
}

impl<'a, W: Write> ConsolePrinter<'a, W> {
    fn new(out: &'a mut W) -> Self {
        Self { out, error: None }
    }

    fn emit(&mut self, f: impl FnOnce(&mut W) -> io::Result<()>) {
        if self.error.is_none() {
            if let Err(e) = f(&mut *self.out) {
                self.error = Some(e);
            }
        }
    }

    fn finish(self) -> Result<()> {
        match self.error {
            Some(e) => Err(e).context("failed to write to stdout"),
            None => Ok(()),
        }
    }
}

impl<W: Write> SessionObserver for ConsolePrinter<'_, W> {
    fn on_log(&mut self, message: LogMessage) {
        self.emit(|out| writeln!(out, "{}", message.text));
    }

    fn on_complete(&mut self, completion: Completion) {
        self.emit(|out| {
            writeln!(out, "\n{}", report::results_heading(completion.query.as_str()))?;
            writeln!(out, "{}", "=".repeat(HEADING_RULE_WIDTH))?;
            write!(out, "{}", completion.report)?;
            out.flush()
        });
    }

    fn on_error(&mut self, _query: &Query, failure: WorkflowFailure) {
        self.emit(|out| writeln!(out, "Error: {failure}"));
    }
}
