pub mod dialog;
pub mod keybar;
pub mod layout;
pub mod markdown;
pub mod question;
pub mod result;
pub mod sidebar;
pub mod statusbar;
pub mod titlebar;

use ratatui::layout::Rect;
use ratatui::Frame;

use crate::session::SessionState;
use crate::state::{Screen, UiState};

pub fn draw(f: &mut Frame, ui: &UiState) {
    let area = f.area();

    if ui.screen == Screen::Results {
        let layout = layout::compute_layout(area);
        let body = Rect::new(area.x, area.y, area.width, area.height.saturating_sub(1));
        result::draw_results(f, body, ui);
        keybar::draw_keybar(f, layout.keybar, ui);
        return;
    }

    match ui.view.state {
        SessionState::Loading => result::draw_loading(f, area),
        SessionState::Error => result::draw_error(f, area, ui),
        SessionState::Active => draw_exam(f, area, ui),
        SessionState::Submitting => result::draw_submitting(f, area, ui),
        SessionState::Terminal => result::draw_submitted(f, area),
    }
}

fn draw_exam(f: &mut Frame, area: Rect, ui: &UiState) {
    let layout = layout::compute_layout(area);

    titlebar::draw_titlebar(f, layout.titlebar, ui);
    sidebar::draw_sidebar(f, layout.sidebar, ui);
    question::draw_question(f, layout.main, ui);
    statusbar::draw_statusbar(f, layout.statusbar, ui);
    keybar::draw_keybar(f, layout.keybar, ui);

    if ui.has_dialog() {
        dialog::draw_dialog(f, area, ui);
    }
}
