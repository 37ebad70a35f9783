use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::state::UiState;

pub fn draw_titlebar(f: &mut Frame, area: Rect, ui: &UiState) {
    let view = &ui.view;

    let timer_label = if view.expired {
        " Time is up ".to_string()
    } else {
        format!(" {} remaining ", view.remaining_display())
    };
    let timer_style = if view.low_time || view.expired {
        Style::default()
            .fg(Color::White)
            .bg(Color::Red)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Rgb(200, 200, 120))
    };

    let title_text = format!("[ {} ]", view.exam_title);
    let available = area.width as usize;
    let title_len = title_text.chars().count();
    let timer_len = timer_label.chars().count();
    let center_pad = available.saturating_sub(title_len) / 2;
    let right_pad = available.saturating_sub(center_pad + title_len + timer_len);

    let line = Line::from(vec![
        Span::raw(" ".repeat(center_pad)),
        Span::styled(
            title_text,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" ".repeat(right_pad)),
        Span::styled(timer_label, timer_style),
    ]);

    let widget = Paragraph::new(line)
        .style(Style::default().bg(Color::DarkGray))
        .alignment(Alignment::Left);
    f.render_widget(widget, area);
}
