use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Renders question text to styled lines. Plain text passes through unchanged
/// apart from paragraph spacing.
pub fn markdown_to_lines(text: &str) -> Vec<Line<'static>> {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);

    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut styles: Vec<Style> = vec![Style::default()];
    let mut in_code_block = false;
    let mut list_numbers: Vec<Option<u64>> = Vec::new();

    let flush = |spans: &mut Vec<Span<'static>>, lines: &mut Vec<Line<'static>>| {
        if !spans.is_empty() {
            lines.push(Line::from(std::mem::take(spans)));
        }
    };

    for event in Parser::new_ext(text, opts) {
        match event {
            Event::Start(Tag::Paragraph) => spans.clear(),
            Event::End(TagEnd::Paragraph) => {
                flush(&mut spans, &mut lines);
                if list_numbers.is_empty() {
                    lines.push(Line::from(""));
                }
            }
            Event::Start(Tag::Strong) => push_style(&mut styles, Modifier::BOLD),
            Event::Start(Tag::Emphasis) => push_style(&mut styles, Modifier::ITALIC),
            Event::Start(Tag::Strikethrough) => push_style(&mut styles, Modifier::CROSSED_OUT),
            Event::End(TagEnd::Strong | TagEnd::Emphasis | TagEnd::Strikethrough) => {
                if styles.len() > 1 {
                    styles.pop();
                }
            }
            Event::Start(Tag::List(start)) => list_numbers.push(start),
            Event::End(TagEnd::List(_)) => {
                list_numbers.pop();
                if list_numbers.is_empty() {
                    lines.push(Line::from(""));
                }
            }
            Event::Start(Tag::Item) => {
                flush(&mut spans, &mut lines);
                let bullet = match list_numbers.last_mut() {
                    Some(Some(n)) => {
                        let b = format!("  {}. ", n);
                        *n += 1;
                        b
                    }
                    _ => "  • ".to_string(),
                };
                spans.push(Span::raw(bullet));
            }
            Event::End(TagEnd::Item) => flush(&mut spans, &mut lines),
            Event::Start(Tag::CodeBlock(kind)) => {
                flush(&mut spans, &mut lines);
                in_code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        lines.push(Line::from(Span::styled(
                            format!("  [{}]", lang),
                            Style::default().fg(Color::DarkGray),
                        )));
                    }
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                lines.push(Line::from(""));
            }
            Event::Start(Tag::Heading { level, .. }) => {
                spans.clear();
                let marker = match level {
                    HeadingLevel::H1 => "# ",
                    HeadingLevel::H2 => "## ",
                    _ => "### ",
                };
                spans.push(Span::styled(marker, Style::default().add_modifier(Modifier::BOLD)));
                push_style(&mut styles, Modifier::BOLD);
            }
            Event::End(TagEnd::Heading(_)) => {
                if styles.len() > 1 {
                    styles.pop();
                }
                flush(&mut spans, &mut lines);
                lines.push(Line::from(""));
            }
            Event::Text(text) if in_code_block => {
                for code_line in text.lines() {
                    lines.push(Line::from(Span::styled(
                        format!("  {}", code_line),
                        Style::default().fg(Color::Green),
                    )));
                }
            }
            Event::Text(text) => {
                let style = styles.last().copied().unwrap_or_default();
                spans.push(Span::styled(text.to_string(), style));
            }
            Event::Code(code) => {
                spans.push(Span::styled(
                    format!("`{}`", code),
                    Style::default().fg(Color::Yellow),
                ));
            }
            Event::SoftBreak => spans.push(Span::raw(" ")),
            Event::HardBreak => flush(&mut spans, &mut lines),
            Event::Rule => {
                lines.push(Line::from(Span::styled(
                    "─".repeat(40),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            _ => {}
        }
    }

    flush(&mut spans, &mut lines);
    while lines.last().is_some_and(|l| l.spans.is_empty()) {
        lines.pop();
    }
    lines
}

fn push_style(styles: &mut Vec<Style>, modifier: Modifier) {
    let current = styles.last().copied().unwrap_or_default();
    styles.push(current.add_modifier(modifier));
}
