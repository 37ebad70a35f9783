use crate::model::{AnswerOption, AttemptResult, OptionId};
use crate::session::{SessionState, SessionView};

#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Session,
    Results,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dialog {
    ConfirmSubmit,
    ConfirmQuit,
    LowTimeWarning,
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActivePanel {
    Sidebar,
    Main,
}

#[derive(Debug, Clone)]
pub enum ResultsPanel {
    Loading,
    Loaded(Vec<AttemptResult>),
    Failed(String),
}

/// Front-end state layered over the controller's published view.
#[derive(Debug, Clone)]
pub struct UiState {
    pub screen: Screen,
    pub view: SessionView,
    pub dialog_stack: Vec<Dialog>,
    pub choice_cursor: usize,
    pub active_panel: ActivePanel,
    pub results: ResultsPanel,
    pub should_quit: bool,
    low_time_warned: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

impl UiState {
    pub fn new() -> Self {
        Self {
            screen: Screen::Session,
            view: SessionView::default(),
            dialog_stack: Vec::new(),
            choice_cursor: 0,
            active_panel: ActivePanel::Main,
            results: ResultsPanel::Loading,
            should_quit: false,
            low_time_warned: false,
        }
    }

    /// Takes a fresh view from the controller.
    pub fn apply_view(&mut self, view: SessionView) {
        let moved = view.current_index != self.view.current_index
            || self.view.current.as_ref().map(|q| &q.id) != view.current.as_ref().map(|q| &q.id);
        self.view = view;

        if moved {
            self.choice_cursor = self.answer_position().unwrap_or(0);
        }

        if self.view.low_time && !self.low_time_warned && self.view.state == SessionState::Active {
            self.low_time_warned = true;
            if !self.has_dialog() {
                self.push_dialog(Dialog::LowTimeWarning);
            }
        }

        // Dialogs only make sense while the attempt is open for editing.
        if !self.accepts_answers() {
            self.dialog_stack.retain(|d| matches!(d, Dialog::Help));
        }
    }

    pub fn accepts_answers(&self) -> bool {
        self.view.state == SessionState::Active && !self.view.expired
    }

    pub fn options(&self) -> &[AnswerOption] {
        self.view
            .current
            .as_ref()
            .map(|q| q.options.as_slice())
            .unwrap_or(&[])
    }

    fn answer_position(&self) -> Option<usize> {
        let answer = self.view.current_answer?;
        self.options().iter().position(|o| o.id == answer)
    }

    pub fn option_at(&self, idx: usize) -> Option<OptionId> {
        self.options().get(idx).map(|o| o.id)
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let count = self.options().len();
        if count == 0 {
            self.choice_cursor = 0;
            return;
        }
        let next = self.choice_cursor as isize + delta;
        self.choice_cursor = next.clamp(0, count as isize - 1) as usize;
    }

    pub fn unanswered(&self) -> usize {
        self.view.question_count.saturating_sub(self.view.answered_count)
    }

    pub fn toggle_panel(&mut self) {
        self.active_panel = match self.active_panel {
            ActivePanel::Sidebar => ActivePanel::Main,
            ActivePanel::Main => ActivePanel::Sidebar,
        };
    }

    pub fn has_dialog(&self) -> bool {
        !self.dialog_stack.is_empty()
    }

    pub fn top_dialog(&self) -> Option<&Dialog> {
        self.dialog_stack.last()
    }

    pub fn push_dialog(&mut self, dialog: Dialog) {
        self.dialog_stack.push(dialog);
    }

    pub fn pop_dialog(&mut self) -> Option<Dialog> {
        self.dialog_stack.pop()
    }

    pub fn show_results(&mut self) {
        self.screen = Screen::Results;
        self.results = ResultsPanel::Loading;
        self.dialog_stack.clear();
    }
}
