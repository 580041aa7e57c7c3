//! Terminal-window application state.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use devscout_core::report::Report;
use devscout_core::{
    Completion, LogMessage, Query, Session, SessionError, SessionObserver, Workflow,
    WorkflowFailure,
};

pub const EMPTY_QUERY_NOTICE: &str = "Please enter a query.";
pub const SEARCHING_NOTICE: &str = "Searching... Please wait.";

/// Rows moved by PageUp/PageDown.
pub const PAGE_ROWS: u16 = 10;

/// Cosmetic colour scheme. Has no effect on the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn from_dark_mode(dark_mode: bool) -> Self {
        if dark_mode { Self::Dark } else { Self::Light }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }
}

/// One item in the results pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Notice(String),
    Log(String),
    Report { query: String, report: Report },
    Error(String),
}

/// The results pane. Receives session callbacks on the UI loop.
#[derive(Debug, Default)]
pub struct Transcript {
    pub entries: Vec<Entry>,
    pub started_at: Option<DateTime<Local>>,
}

impl Transcript {
    fn replace_with_notice(&mut self, text: &str) {
        self.entries = vec![Entry::Notice(text.to_string())];
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.started_at = None;
    }
}

impl SessionObserver for Transcript {
    fn on_start(&mut self, _query: &Query) {
        self.replace_with_notice(SEARCHING_NOTICE);
        self.started_at = Some(Local::now());
    }

    fn on_log(&mut self, message: LogMessage) {
        self.entries.push(Entry::Log(message.text));
    }

    fn on_complete(&mut self, completion: Completion) {
        self.entries.push(Entry::Report {
            query: completion.query.to_string(),
            report: completion.report,
        });
    }

    fn on_error(&mut self, _query: &Query, failure: WorkflowFailure) {
        self.entries.push(Entry::Error(failure.message().to_string()));
    }
}

/// Application state for the terminal window.
pub struct App {
    pub session: Session,
    pub input: String,
    pub transcript: Transcript,
    pub theme: Theme,
    /// Rows scrolled up from the newest output; 0 follows new output.
    pub scroll_back: u16,
    pub tick_rate: Duration,
    pub should_quit: bool,
}

impl App {
    pub fn new(workflow: Arc<dyn Workflow>, dark_mode: bool) -> Self {
        Self {
            session: Session::new(workflow),
            input: String::new(),
            transcript: Transcript::default(),
            theme: Theme::from_dark_mode(dark_mode),
            scroll_back: 0,
            tick_rate: Duration::from_millis(100),
            should_quit: false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.session.is_busy()
    }

    pub fn can_submit(&self) -> bool {
        !self.is_busy()
    }

    pub fn can_clear(&self) -> bool {
        !self.is_busy()
    }

    /// Submit the input line. Ignored while a run is in flight.
    pub fn submit(&mut self) {
        if !self.can_submit() {
            return;
        }
        self.scroll_back = 0;
        match self.session.submit(&self.input, &mut self.transcript) {
            Ok(query) => tracing::debug!(query = %query, "gui submitted query"),
            Err(SessionError::EmptyQuery(_)) => {
                self.transcript.replace_with_notice(EMPTY_QUERY_NOTICE);
            }
            Err(SessionError::Busy) => {}
        }
    }

    /// Clear the input and the results pane. Ignored while a run is in flight.
    pub fn clear(&mut self) {
        if !self.can_clear() {
            return;
        }
        self.input.clear();
        self.transcript.clear();
        self.scroll_back = 0;
    }

    /// Scroll the results pane towards older output. The renderer clamps
    /// this to the transcript height.
    pub fn scroll_up(&mut self, rows: u16) {
        self.scroll_back = self.scroll_back.saturating_add(rows);
    }

    pub fn scroll_down(&mut self, rows: u16) {
        self.scroll_back = self.scroll_back.saturating_sub(rows);
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
    }

    /// Deliver queued session events. Returns how many were delivered.
    pub fn tick(&mut self) -> usize {
        self.session.poll(&mut self.transcript)
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c' | 'q') if ctrl => self.should_quit = true,
            KeyCode::Char('l') if ctrl => self.clear(),
            KeyCode::Char('t') if ctrl => self.toggle_theme(),
            KeyCode::Enter => self.submit(),
            KeyCode::Up => self.scroll_up(1),
            KeyCode::Down => self.scroll_down(1),
            KeyCode::PageUp => self.scroll_up(PAGE_ROWS),
            KeyCode::PageDown => self.scroll_down(PAGE_ROWS),
            KeyCode::End => self.scroll_back = 0,
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) if !ctrl => self.input.push(c),
            _ => {}
        }
    }
}
