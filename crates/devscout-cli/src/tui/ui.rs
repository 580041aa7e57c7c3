//! Terminal-window rendering using ratatui.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use devscout_core::report::{
    ANALYSIS_RULE_WIDTH, ANALYSIS_TITLE, Report, ReportBlock, results_heading,
};

use super::app::{App, Entry, Theme};

struct Palette {
    fg: Color,
    bg: Color,
    accent: Color,
    log: Color,
    error: Color,
    muted: Color,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Dark => Palette {
            fg: Color::White,
            bg: Color::Rgb(0x23, 0x27, 0x2e),
            accent: Color::Cyan,
            log: Color::Rgb(0x00, 0xb8, 0x94),
            error: Color::LightRed,
            muted: Color::DarkGray,
        },
        Theme::Light => Palette {
            fg: Color::Black,
            bg: Color::Rgb(0xf5, 0xf6, 0xfa),
            accent: Color::Blue,
            log: Color::Rgb(0x00, 0x84, 0x6a),
            error: Color::Red,
            muted: Color::Gray,
        },
    }
}

/// Render the whole window.
pub fn render(f: &mut Frame, app: &App) {
    let colors = palette(app.theme);
    let base = Style::default().fg(colors.fg).bg(colors.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // input
            Constraint::Min(3),    // results
            Constraint::Length(1), // status bar
        ])
        .split(f.area());

    f.render_widget(Block::default().style(base), f.area());
    render_input(f, app, &colors, chunks[0]);
    render_results(f, app, &colors, chunks[1]);
    render_status_bar(f, app, &colors, chunks[2]);
}

fn render_input(f: &mut Frame, app: &App, colors: &Palette, area: Rect) {
    let border = if app.can_submit() {
        Style::default().fg(colors.accent)
    } else {
        Style::default().fg(colors.muted)
    };

    let input = Paragraph::new(format!("{}▏", app.input)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(" Developer Tools Query "),
    );
    f.render_widget(input, area);
}

fn render_results(f: &mut Frame, app: &App, colors: &Palette, area: Rect) {
    let lines: Vec<Line> = app
        .transcript
        .entries
        .iter()
        .flat_map(|entry| entry_lines(entry, colors))
        .collect();

    let results = Paragraph::new(lines).wrap(Wrap { trim: false });

    // Offsets count wrapped rows, not transcript lines. Measured before the
    // block is attached so the borders are not counted as content.
    let total_rows = results.line_count(area.width.saturating_sub(2));
    let inner_height = usize::from(area.height.saturating_sub(2));
    let bottom = total_rows.saturating_sub(inner_height);
    let offset = bottom.saturating_sub(usize::from(app.scroll_back));

    let title = if offset < bottom {
        " Results (scrolled, End to follow) "
    } else {
        " Results "
    };
    let results = results
        .scroll((u16::try_from(offset).unwrap_or(u16::MAX), 0))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(results, area);
}

fn entry_lines<'a>(entry: &'a Entry, colors: &Palette) -> Vec<Line<'a>> {
    match entry {
        Entry::Notice(text) => vec![Line::from(text.as_str())],
        Entry::Log(text) => vec![Line::styled(text.as_str(), Style::default().fg(colors.log))],
        Entry::Error(cause) => vec![Line::styled(
            format!("Error: {cause}"),
            Style::default().fg(colors.error),
        )],
        Entry::Report { query, report } => report_lines(query, report),
    }
}

fn report_lines<'a>(query: &str, report: &'a Report) -> Vec<Line<'a>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![Line::from(""), Line::styled(results_heading(query), bold)];

    for block in &report.blocks {
        match block {
            ReportBlock::Company(company) => {
                lines.push(Line::from(""));
                lines.push(Line::styled(
                    format!("{}. 🏢 {}", company.index, company.name),
                    bold,
                ));
                for l in &company.lines {
                    lines.push(Line::from(vec![
                        Span::raw(format!("   {} ", l.field.icon())),
                        Span::styled(format!("{}:", l.field.label()), bold),
                        Span::raw(format!(" {}", l.value)),
                    ]));
                }
            }
            ReportBlock::Analysis(text) => {
                lines.push(Line::from(""));
                lines.push(Line::styled(ANALYSIS_TITLE, bold));
                lines.push(Line::from("-".repeat(ANALYSIS_RULE_WIDTH)));
                lines.extend(text.lines().map(Line::from));
            }
        }
    }
    lines
}

fn render_status_bar(f: &mut Frame, app: &App, colors: &Palette, area: Rect) {
    let state = if app.is_busy() {
        let since = app
            .transcript
            .started_at
            .map(|t| format!(" since {}", t.format("%H:%M:%S")))
            .unwrap_or_default();
        Span::styled(
            format!(" Searching{since} "),
            Style::default().bg(Color::Yellow).fg(Color::Black),
        )
    } else {
        Span::styled(
            format!(" {} ", app.session.status()),
            Style::default().bg(colors.accent).fg(Color::Black),
        )
    };

    let enabled = Style::default().fg(colors.fg);
    let disabled = Style::default().fg(colors.muted).add_modifier(Modifier::DIM);
    let hint = |text: &'static str, active: bool| {
        Span::styled(text, if active { enabled } else { disabled })
    };

    let bar = Line::from(vec![
        state,
        Span::raw("  "),
        hint("Enter:search", app.can_submit()),
        Span::raw("  "),
        hint("Ctrl+L:clear", app.can_clear()),
        Span::raw("  "),
        hint("Ctrl+T:theme", true),
        Span::raw("  "),
        hint("PgUp/PgDn:scroll", true),
        Span::raw("  "),
        hint("Esc:quit", true),
        Span::styled(
            format!("  [{}]", app.theme.name()),
            Style::default().fg(colors.muted),
        ),
    ]);

    f.render_widget(Paragraph::new(bar), area);
}
