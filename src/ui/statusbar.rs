use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::autosave::SaveStatus;
use crate::state::UiState;

pub fn draw_statusbar(f: &mut Frame, area: Rect, ui: &UiState) {
    let view = &ui.view;

    let save = match &view.save_status {
        SaveStatus::Idle => Span::styled("not saved yet", Style::default().fg(Color::DarkGray)),
        SaveStatus::Saving => Span::styled("saving…", Style::default().fg(Color::Yellow)),
        SaveStatus::Saved { at, answered } => Span::styled(
            format!("saved {} answers at {}", answered, at.format("%H:%M:%S")),
            Style::default().fg(Color::Green),
        ),
        SaveStatus::Failed(msg) => Span::styled(
            format!("save failed: {} (will retry)", msg),
            Style::default().fg(Color::Red),
        ),
    };

    let mut spans = vec![
        Span::raw(" "),
        Span::styled(
            format!(
                "{}/{} answered ({}%)",
                view.answered_count,
                view.question_count,
                view.progress_percent()
            ),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("   "),
        save,
    ];

    if let Some(err) = &view.error {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            format!("⚠ {}", err),
            Style::default().fg(Color::White).bg(Color::Red),
        ));
    }

    let widget = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Rgb(30, 30, 30)));
    f.render_widget(widget, area);
}
