use ratatui::layout::{Constraint, Direction, Layout, Rect};

pub struct ExamLayout {
    pub titlebar: Rect,
    pub sidebar: Rect,
    pub main: Rect,
    pub statusbar: Rect,
    pub keybar: Rect,
}

pub const SIDEBAR_WIDTH: u16 = 22;

pub fn compute_layout(area: Rect) -> ExamLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(rows[1]);

    ExamLayout {
        titlebar: rows[0],
        sidebar: columns[0],
        main: columns[1],
        statusbar: rows[2],
        keybar: rows[3],
    }
}

/// A `width`×`height` rect centered in `area`, shrunk to fit.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}
