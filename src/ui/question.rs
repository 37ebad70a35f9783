use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::session::SessionState;
use crate::state::{ActivePanel, UiState};
use crate::ui::markdown::markdown_to_lines;

const OPTION_PREFIX: usize = 9;

/// Rendered question body plus the first line of each option, for mouse hits.
struct QuestionLines {
    lines: Vec<Line<'static>>,
    option_rows: Vec<usize>,
}

/// Index of the option drawn at terminal row `y`.
pub fn option_at_row(ui: &UiState, area: Rect, y: u16) -> Option<usize> {
    let inner = inner_area(area);
    if y < inner.y {
        return None;
    }
    let built = build_lines(ui, inner.width as usize)?;
    let row = (y - inner.y) as usize + built.scroll(ui.choice_cursor, inner.height as usize);
    built
        .option_rows
        .iter()
        .enumerate()
        .rev()
        .find(|&(_, &start)| row >= start)
        .map(|(idx, _)| idx)
}

impl QuestionLines {
    /// Rows to skip so the option under the cursor stays on screen.
    fn scroll(&self, cursor: usize, height: usize) -> usize {
        let focus = self.option_rows.get(cursor).copied().unwrap_or(0);
        if height > 0 && focus >= height {
            focus + 1 - height
        } else {
            0
        }
    }
}

fn inner_area(area: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(area)
}

fn build_lines(ui: &UiState, width: usize) -> Option<QuestionLines> {
    let view = &ui.view;
    let question = view.current.as_ref()?;
    let mut lines: Vec<Line<'static>> = Vec::new();

    let points = match question.points {
        0 => String::new(),
        1 => "  (1 point)".to_string(),
        n => format!("  ({} points)", n),
    };
    lines.push(Line::from(vec![
        Span::styled(
            format!(" Question {} of {}", view.current_index + 1, view.question_count),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(points, Style::default().fg(Color::DarkGray)),
    ]));
    lines.push(Line::from(""));

    let body_width = width.saturating_sub(2);
    for line in markdown_to_lines(&question.text) {
        for wrapped in wrap_styled_line(line, body_width) {
            let mut spans = vec![Span::raw(" ")];
            spans.extend(wrapped.spans);
            lines.push(Line::from(spans));
        }
    }
    lines.push(Line::from(""));

    let editable = ui.accepts_answers();
    let cursor_visible = editable && ui.active_panel == ActivePanel::Main;
    let mut option_rows = Vec::with_capacity(question.options.len());

    for (i, option) in question.options.iter().enumerate() {
        option_rows.push(lines.len());
        let selected = view.current_answer == Some(option.id);
        let under_cursor = cursor_visible && ui.choice_cursor == i;
        let letter = (b'A' + (i % 26) as u8) as char;

        let marker = if selected { "(●)" } else { "( )" };
        let mut style = if selected {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else if editable {
            Style::default()
        } else {
            Style::default().fg(Color::DarkGray)
        };
        if under_cursor {
            style = style.bg(Color::Rgb(40, 40, 60));
        }

        let text_width = width.saturating_sub(OPTION_PREFIX);
        for (row, chunk) in wrap_text(&option.text, text_width).into_iter().enumerate() {
            let prefix = if row == 0 {
                format!(" {} {} {}. ", if under_cursor { "▸" } else { " " }, marker, letter)
            } else {
                " ".repeat(OPTION_PREFIX)
            };
            lines.push(Line::from(vec![
                Span::styled(prefix, style),
                Span::styled(chunk, style),
            ]));
        }
    }

    if question.options.is_empty() {
        lines.push(Line::from(Span::styled(
            " This question has no options.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    if view.expired && view.state == SessionState::Active {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            " Time is up. Answers can no longer be changed.",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    }

    Some(QuestionLines { lines, option_rows })
}

pub fn draw_question(f: &mut Frame, area: Rect, ui: &UiState) {
    let border_style = if ui.active_panel == ActivePanel::Main {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let block = Block::default().borders(Borders::ALL).border_style(border_style);
    let inner = block.inner(area);

    let Some(built) = build_lines(ui, inner.width as usize) else {
        f.render_widget(Paragraph::new(" No questions in this exam").block(block), area);
        return;
    };

    let scroll = built.scroll(ui.choice_cursor, inner.height as usize);
    let widget = Paragraph::new(built.lines)
        .block(block)
        .scroll((scroll as u16, 0));
    f.render_widget(widget, area);
}

/// Wrap a styled line at `width`, keeping span styles across breaks.
fn wrap_styled_line(line: Line<'static>, width: usize) -> Vec<Line<'static>> {
    let total: usize = line.spans.iter().map(|s| s.content.chars().count()).sum();
    if width == 0 || total <= width {
        return vec![line];
    }

    let chars: Vec<(char, Style)> = line
        .spans
        .iter()
        .flat_map(|s| s.content.chars().map(move |c| (c, s.style)))
        .collect();

    let mut out = Vec::new();
    let mut pos = 0;
    while pos < chars.len() {
        if chars.len() - pos <= width {
            out.push(group_spans(&chars[pos..]));
            break;
        }
        let end = pos + width;
        let cut = if chars[end].0 == ' ' {
            end
        } else {
            match chars[pos..end].iter().rposition(|(c, _)| *c == ' ') {
                Some(sp) if sp > 0 => pos + sp,
                _ => end,
            }
        };
        out.push(group_spans(&chars[pos..cut]));
        pos = cut;
        while pos < chars.len() && chars[pos].0 == ' ' {
            pos += 1;
        }
    }
    out
}

fn group_spans(chars: &[(char, Style)]) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut text = String::new();
    let mut style = chars.first().map(|c| c.1).unwrap_or_default();
    for &(c, s) in chars {
        if s != style && !text.is_empty() {
            spans.push(Span::styled(std::mem::take(&mut text), style));
        }
        style = s;
        text.push(c);
    }
    if !text.is_empty() {
        spans.push(Span::styled(text, style));
    }
    Line::from(spans)
}

/// Word-wrap plain text to `width` columns.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }
    let mut rows = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = current.chars().count() + word.chars().count() + 1;
        if current.is_empty() {
            current = word.to_string();
        } else if needed <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            rows.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() || rows.is_empty() {
        rows.push(current);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text_breaks_on_words() {
        assert_eq!(
            wrap_text("In the beginning was the Word", 12),
            vec!["In the", "beginning", "was the Word"]
        );
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }

    #[test]
    fn test_wrap_styled_line_keeps_styles() {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let line = Line::from(vec![Span::raw("alpha beta "), Span::styled("gamma delta", bold)]);
        let wrapped = wrap_styled_line(line, 11);
        assert_eq!(wrapped.len(), 2);
        let second = &wrapped[1];
        assert_eq!(second.spans.len(), 1);
        assert_eq!(second.spans[0].content, "gamma delta");
        assert_eq!(second.spans[0].style, bold);
    }
}
