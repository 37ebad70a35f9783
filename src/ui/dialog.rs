use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::state::{Dialog, UiState};
use crate::ui::layout::centered_rect;

pub fn draw_dialog(f: &mut Frame, area: Rect, ui: &UiState) {
    let Some(dialog) = ui.top_dialog() else {
        return;
    };

    match dialog {
        Dialog::ConfirmSubmit => draw_confirm_submit(f, area, ui),
        Dialog::ConfirmQuit => draw_confirm_quit(f, area),
        Dialog::LowTimeWarning => draw_low_time(f, area, ui),
        Dialog::Help => draw_help(f, area),
    }
}

fn heading(text: &str, color: Color) -> Line<'static> {
    Line::from(Span::styled(
        format!("   {}", text),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

fn confirm_row() -> Line<'static> {
    Line::from(vec![
        Span::styled("   [Enter] Confirm", Style::default().fg(Color::Green)),
        Span::raw("    "),
        Span::styled("[Esc] Cancel", Style::default().fg(Color::DarkGray)),
    ])
}

fn render_box(
    f: &mut Frame,
    area: Rect,
    width: u16,
    lines: Vec<Line<'static>>,
    border: Color,
    title: Option<&str>,
) {
    let rect = centered_rect(width, lines.len() as u16 + 2, area);
    f.render_widget(Clear, rect);
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));
    if let Some(title) = title {
        block = block.title(format!(" {} ", title));
    }
    f.render_widget(Paragraph::new(lines).block(block), rect);
}

fn draw_confirm_submit(f: &mut Frame, area: Rect, ui: &UiState) {
    let mut lines = vec![
        Line::from(""),
        heading("Submit your exam?", Color::Yellow),
        Line::from(""),
        Line::from(format!(
            "   {} of {} questions answered.",
            ui.view.answered_count, ui.view.question_count
        )),
    ];
    let unanswered = ui.unanswered();
    if unanswered > 0 {
        lines.push(Line::from(Span::styled(
            format!("   {} left unanswered.", unanswered),
            Style::default().fg(Color::Red),
        )));
    }
    lines.push(Line::from("   Answers cannot be changed afterwards."));
    lines.push(Line::from(""));
    lines.push(confirm_row());

    render_box(f, area, 46, lines, Color::Yellow, None);
}

fn draw_confirm_quit(f: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(""),
        heading("Leave the exam?", Color::Yellow),
        Line::from(""),
        Line::from("   Saved answers are kept and the"),
        Line::from("   clock keeps running on the server."),
        Line::from(""),
        confirm_row(),
    ];
    render_box(f, area, 44, lines, Color::Yellow, None);
}

fn draw_low_time(f: &mut Frame, area: Rect, ui: &UiState) {
    let lines = vec![
        Line::from(""),
        heading(&format!("⚠  {} REMAINING", ui.view.remaining_display()), Color::Red),
        Line::from(""),
        Line::from("   The exam is submitted automatically"),
        Line::from("   when the time runs out."),
        Line::from(""),
        Line::from(Span::styled(
            "          [Enter] Continue",
            Style::default().fg(Color::Green),
        )),
    ];
    render_box(f, area, 44, lines, Color::Red, None);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from("   a-z         Choose option A, B, C…"),
        Line::from("   ↑/↓         Move between options"),
        Line::from("   Enter/Space Choose highlighted option"),
        Line::from("   ←/→         Previous/Next question"),
        Line::from("   PgUp/PgDn   Jump 5 questions"),
        Line::from("   Home/End    First/Last question"),
        Line::from("   Tab         Switch panel"),
        Line::from("   Ctrl+S      Submit exam"),
        Line::from("   Ctrl+Q      Leave exam"),
        Line::from("   ?           This help"),
        Line::from(""),
        Line::from(Span::styled(
            "        [Esc] Close",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    render_box(f, area, 46, lines, Color::Cyan, Some("Help"));
}
