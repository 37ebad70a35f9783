use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::session::SessionState;
use crate::state::{ActivePanel, Screen, UiState};

pub fn draw_keybar(f: &mut Frame, area: Rect, ui: &UiState) {
    let bindings: Vec<(&str, &str)> = match (&ui.screen, ui.view.state) {
        (Screen::Results, _) => vec![("Enter/q", "exit")],
        (_, SessionState::Loading) => vec![("Ctrl+Q", "quit")],
        (_, SessionState::Error) => vec![("Enter/Esc", "go back"), ("Ctrl+Q", "quit")],
        (_, SessionState::Submitting) | (_, SessionState::Terminal) => vec![("", "please wait")],
        (_, SessionState::Active) if ui.view.expired => vec![("Ctrl+S", "retry submit")],
        (_, SessionState::Active) => match ui.active_panel {
            ActivePanel::Main => vec![
                ("a-z", "answer"),
                ("↑/↓", "option"),
                ("Enter", "choose"),
                ("←/→", "prev/next"),
                ("Tab", "questions"),
                ("Ctrl+S", "submit"),
                ("Ctrl+Q", "quit"),
            ],
            ActivePanel::Sidebar => vec![
                ("↑/↓", "question"),
                ("PgUp/PgDn", "jump 5"),
                ("Tab", "answer panel"),
                ("Ctrl+S", "submit"),
                ("Ctrl+Q", "quit"),
            ],
        },
    };

    let mut spans: Vec<Span> = vec![Span::raw(" ")];
    for (i, (key, action)) in bindings.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("   "));
        }
        if !key.is_empty() {
            spans.push(Span::styled(
                key.to_string(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::raw(" "));
        }
        spans.push(Span::raw(action.to_string()));
    }

    let widget = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Rgb(20, 20, 20)));
    f.render_widget(widget, area);
}
