use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use crate::model::AttemptResult;
use crate::results::summarize;
use crate::state::{ResultsPanel, UiState};

fn centered_panel(f: &mut Frame, area: Rect, lines: Vec<Line<'static>>) {
    let block = Block::default().borders(Borders::ALL);
    let widget = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}

pub fn draw_loading(f: &mut Frame, area: Rect) {
    centered_panel(
        f,
        area,
        vec![
            Line::from(""),
            Line::from(""),
            Line::from(Span::styled(
                "Starting your exam…",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Contacting the exam service."),
        ],
    );
}

pub fn draw_error(f: &mut Frame, area: Rect, ui: &UiState) {
    let message = ui.view.error.clone().unwrap_or_else(|| "Unknown error".to_string());
    let mut lines = vec![
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled(
            "✗  Cannot start this exam",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(message),
        Line::from(""),
    ];
    if ui.view.redirecting {
        lines.push(Line::from(Span::styled(
            "Opening your results…",
            Style::default().fg(Color::Cyan),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "[Enter] Go back",
            Style::default().fg(Color::DarkGray),
        )));
    }
    centered_panel(f, area, lines);
}

pub fn draw_submitting(f: &mut Frame, area: Rect, ui: &UiState) {
    let detail = if ui.view.expired {
        "Time is up. Sending your answers…"
    } else {
        "Sending your answers…"
    };
    centered_panel(
        f,
        area,
        vec![
            Line::from(""),
            Line::from(""),
            Line::from(Span::styled(
                "Submitting…",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(detail),
            Line::from(format!(
                "{} of {} questions answered",
                ui.view.answered_count, ui.view.question_count
            )),
        ],
    );
}

pub fn draw_submitted(f: &mut Frame, area: Rect) {
    centered_panel(
        f,
        area,
        vec![
            Line::from(""),
            Line::from(""),
            Line::from(Span::styled(
                "✓  Exam Submitted",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Loading your results…"),
        ],
    );
}

pub fn draw_results(f: &mut Frame, area: Rect, ui: &UiState) {
    match &ui.results {
        ResultsPanel::Loading => centered_panel(
            f,
            area,
            vec![Line::from(""), Line::from("Loading your results…")],
        ),
        ResultsPanel::Failed(msg) => centered_panel(
            f,
            area,
            vec![
                Line::from(""),
                Line::from(Span::styled(
                    "Cannot load results",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(msg.clone()),
                Line::from(""),
                Line::from(Span::styled("[Enter] Exit", Style::default().fg(Color::DarkGray))),
            ],
        ),
        ResultsPanel::Loaded(results) => draw_results_table(f, area, results),
    }
}

fn result_line(r: &AttemptResult) -> Line<'static> {
    let color = match (r.is_completed(), r.passed) {
        (false, _) => Color::Yellow,
        (true, Some(true)) => Color::Green,
        (true, Some(false)) => Color::Red,
        (true, None) => Color::DarkGray,
    };
    let score = match (r.score, r.total_points) {
        (Some(score), Some(total)) => format!("{:>6.1} / {:<6.1}", score, total),
        (Some(score), None) => format!("{:>6.1}", score),
        _ => "     —".to_string(),
    };
    let when = r
        .submitted_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();

    Line::from(vec![
        Span::raw(format!(" {:<32} ", truncate(r.exam_title(), 32))),
        Span::raw(format!("{}  ", score)),
        Span::styled(format!("{:<12}", r.verdict()), Style::default().fg(color)),
        Span::styled(when, Style::default().fg(Color::DarkGray)),
    ])
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn draw_results_table(f: &mut Frame, area: Rect, results: &[AttemptResult]) {
    let summary = summarize(results);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let header = Line::from(vec![
        Span::styled(
            format!(" {} completed", summary.completed),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled(format!("{} passed", summary.passed), Style::default().fg(Color::Green)),
        Span::raw("   "),
        Span::styled(format!("{} failed", summary.failed), Style::default().fg(Color::Red)),
        Span::raw("   "),
        Span::styled(
            format!("pass rate {}%", summary.pass_rate),
            Style::default().fg(Color::Cyan),
        ),
    ]);
    f.render_widget(
        Paragraph::new(header).block(Block::default().borders(Borders::ALL).title(" My Results ")),
        rows[0],
    );

    let lines: Vec<Line> = if results.is_empty() {
        vec![Line::from(" No results yet.")]
    } else {
        results.iter().map(result_line).collect()
    };
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" [Enter] Exit ")),
        rows[1],
    );
}
