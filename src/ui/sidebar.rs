use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState};
use ratatui::Frame;

use crate::state::{ActivePanel, UiState};

/// First visible row so that `current` stays on screen.
pub fn scroll_offset(current: usize, rows: usize) -> usize {
    if rows == 0 || current < rows {
        0
    } else {
        current + 1 - rows
    }
}

/// Question index under terminal row `y`, if any.
pub fn question_at_row(ui: &UiState, area: Rect, y: u16) -> Option<usize> {
    let rows = area.height.saturating_sub(1) as usize;
    let first_row = area.y + 1;
    if y < first_row {
        return None;
    }
    let idx = scroll_offset(ui.view.current_index, rows) + (y - first_row) as usize;
    (idx < ui.view.question_count).then_some(idx)
}

pub fn draw_sidebar(f: &mut Frame, area: Rect, ui: &UiState) {
    let view = &ui.view;
    let rows = area.height.saturating_sub(1) as usize;
    let offset = scroll_offset(view.current_index, rows);

    let mut lines: Vec<Line> = Vec::new();
    for (idx, answered) in view.answered.iter().enumerate().skip(offset).take(rows) {
        let is_current = idx == view.current_index;
        let bg = if is_current { Color::DarkGray } else { Color::Reset };
        let (icon, color) = if *answered {
            ("✓", Color::Green)
        } else {
            ("○", Color::White)
        };
        let label_style = if is_current {
            Style::default().fg(Color::White).bg(bg).add_modifier(Modifier::BOLD)
        } else {
            Style::default().bg(bg)
        };

        lines.push(Line::from(vec![
            Span::styled(if is_current { " ▸ " } else { "   " }, label_style),
            Span::styled(format!("{} ", icon), Style::default().fg(color).bg(bg)),
            Span::styled(format!("Question {:>2}", idx + 1), label_style),
        ]));
    }

    let border_style = if ui.active_panel == ActivePanel::Sidebar {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let block = Block::default()
        .borders(Borders::RIGHT)
        .title(format!(" {}/{} answered ", view.answered_count, view.question_count))
        .title_style(Style::default().add_modifier(Modifier::BOLD))
        .border_style(border_style);
    f.render_widget(Paragraph::new(lines).block(block), area);

    if view.question_count > rows {
        let scrollbar_area = Rect {
            x: area.x,
            y: area.y + 1,
            width: area.width,
            height: rows as u16,
        };
        let mut state = ScrollbarState::new(view.question_count.saturating_sub(1))
            .position(view.current_index)
            .viewport_content_length(3);
        f.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            scrollbar_area,
            &mut state,
        );
    }
}
