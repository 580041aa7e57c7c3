//! Interactive terminal window for running research queries.

pub mod app;
mod ui;

use std::io;
use std::sync::Arc;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio_util::sync::CancellationToken;

use devscout_core::Workflow;

use app::App;

/// Launch the terminal window.
///
/// Must run on the multi-threaded tokio runtime: the event loop is entered
/// through `block_in_place`, which panics on a current-thread runtime.
pub async fn run_gui(workflow: Arc<dyn Workflow>, dark_mode: bool) -> Result<()> {
    // A signal delivered outside raw mode still closes the window cleanly.
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    // Set up terminal.
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(workflow, dark_mode);
    // The loop blocks on terminal input; hand this worker's queued tasks
    // (including the workflow runs it spawns) to the rest of the runtime.
    let result =
        tokio::task::block_in_place(|| run_event_loop(&mut terminal, &mut app, &shutdown));

    // Restore terminal.
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    signal_task.abort();

    if app.is_busy() {
        tracing::info!("window closed with a query in flight; its outcome is discarded");
    }
    result
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    shutdown: &CancellationToken,
) -> Result<()> {
    let tick_rate = app.tick_rate;

    loop {
        // Deliver relayed logs and outcomes on this loop only.
        app.tick();

        terminal.draw(|f| ui::render(f, app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit || shutdown.is_cancelled() {
            return Ok(());
        }
    }
}
