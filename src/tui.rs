use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use ratatui::crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::layout::Rect;
use ratatui::prelude::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::MonotonicClock;
use crate::model::AttemptResult;
use crate::results::ResultsCache;
use crate::service::ExamService;
use crate::session::{
    AttemptSession, Command, SessionConfig, SessionHost, SessionOutcome, SessionState, SessionView,
};
use crate::state::*;
use crate::ui::{layout, question, sidebar};

const INPUT_POLL: Duration = Duration::from_millis(100);
const PAGE: usize = 5;

#[derive(Debug)]
enum HostEvent {
    OpenResults,
    GoBack,
}

/// Routes controller navigation into the UI loop.
struct TuiHost {
    events: mpsc::UnboundedSender<HostEvent>,
    results: Arc<ResultsCache>,
}

impl SessionHost for TuiHost {
    fn invalidate_results(&self) {
        self.results.invalidate();
    }

    fn open_results(&self) {
        let _ = self.events.send(HostEvent::OpenResults);
    }

    fn go_back(&self) {
        let _ = self.events.send(HostEvent::GoBack);
    }

    fn state_changed(&self, from: SessionState, to: SessionState) {
        debug!(?from, ?to, "ui notified of session state");
    }
}

/// Reads terminal events on a dedicated thread until `stop` is set.
fn spawn_input_thread(tx: mpsc::UnboundedSender<Event>, stop: Arc<AtomicBool>) {
    thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            match event::poll(INPUT_POLL) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if tx.send(ev).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "terminal read failed");
                        return;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    warn!(error = %e, "terminal poll failed");
                    return;
                }
            }
        }
    });
}

/// Runs one exam attempt in the terminal and returns how it ended.
pub async fn run_take(
    service: Arc<dyn ExamService>,
    config: SessionConfig,
    exam_id: String,
) -> Result<SessionOutcome> {
    let cache = Arc::new(ResultsCache::new());
    let (host_tx, host_rx) = mpsc::unbounded_channel();
    let host = Arc::new(TuiHost {
        events: host_tx,
        results: Arc::clone(&cache),
    });

    let session = AttemptSession::new(
        Arc::clone(&service),
        Arc::new(MonotonicClock::new()),
        host,
        config,
    );
    let view_rx = session.subscribe();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let session_task = tokio::spawn(session.run(exam_id, cmd_rx));

    enable_raw_mode().context("cannot enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("cannot enter alternate screen")?;
    let mut terminal =
        Terminal::new(CrosstermBackend::new(stdout)).context("cannot create terminal")?;

    let stop = Arc::new(AtomicBool::new(false));
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    spawn_input_thread(input_tx, Arc::clone(&stop));

    let (results_tx, results_rx) = mpsc::unbounded_channel();
    let mut app = TakeLoop {
        ui: UiState::new(),
        commands: cmd_tx,
        view_rx,
        view_open: true,
        host_rx,
        input_rx,
        results_tx,
        results_rx,
        service,
        cache,
        session: Some(session_task),
        outcome: None,
    };

    let result = app.run(&mut terminal).await;

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture).ok();
    terminal.show_cursor().ok();
    stop.store(true, Ordering::Relaxed);

    let TakeLoop {
        commands,
        session,
        outcome,
        ..
    } = app;
    drop(commands);
    let outcome = match session {
        Some(handle) => handle.await.unwrap_or(SessionOutcome::Abandoned),
        None => outcome.unwrap_or(SessionOutcome::Abandoned),
    };
    result.map(|_| outcome)
}

async fn join_session(task: &mut Option<JoinHandle<SessionOutcome>>) -> SessionOutcome {
    let Some(handle) = task.as_mut() else {
        return std::future::pending().await;
    };
    let outcome = match handle.await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "session task ended abnormally");
            SessionOutcome::Abandoned
        }
    };
    *task = None;
    outcome
}

struct TakeLoop {
    ui: UiState,
    commands: mpsc::UnboundedSender<Command>,
    view_rx: watch::Receiver<SessionView>,
    view_open: bool,
    host_rx: mpsc::UnboundedReceiver<HostEvent>,
    input_rx: mpsc::UnboundedReceiver<Event>,
    results_tx: mpsc::UnboundedSender<Result<Vec<AttemptResult>, String>>,
    results_rx: mpsc::UnboundedReceiver<Result<Vec<AttemptResult>, String>>,
    service: Arc<dyn ExamService>,
    cache: Arc<ResultsCache>,
    session: Option<JoinHandle<SessionOutcome>>,
    outcome: Option<SessionOutcome>,
}

impl TakeLoop {
    async fn run(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            terminal
                .draw(|f| crate::ui::draw(f, &self.ui))
                .context("draw failed")?;

            if self.ui.should_quit {
                return Ok(());
            }

            tokio::select! {
                ev = self.input_rx.recv() => match ev {
                    Some(Event::Key(key)) => self.handle_key(key),
                    Some(Event::Mouse(mouse)) => {
                        let size = terminal.size().context("cannot read terminal size")?;
                        self.handle_mouse(mouse, Rect::new(0, 0, size.width, size.height));
                    }
                    Some(_) => {}
                    None => {
                        warn!("terminal input closed");
                        self.ui.should_quit = true;
                    }
                },
                changed = self.view_rx.changed(), if self.view_open => {
                    if changed.is_ok() {
                        let view = self.view_rx.borrow_and_update().clone();
                        self.ui.apply_view(view);
                    } else {
                        self.view_open = false;
                    }
                },
                Some(ev) = self.host_rx.recv() => self.handle_host(ev),
                Some(loaded) = self.results_rx.recv() => {
                    self.ui.results = match loaded {
                        Ok(results) => ResultsPanel::Loaded(results),
                        Err(msg) => ResultsPanel::Failed(msg),
                    };
                },
                outcome = join_session(&mut self.session), if self.session.is_some() => {
                    info!(?outcome, "session finished");
                    self.outcome = Some(outcome);
                    if matches!(outcome, SessionOutcome::Abandoned) {
                        self.ui.should_quit = true;
                    }
                },
            }
        }
    }

    fn send(&self, cmd: Command) {
        if self.commands.send(cmd).is_err() {
            warn!("session already finished, command dropped");
        }
    }

    fn handle_host(&mut self, ev: HostEvent) {
        match ev {
            HostEvent::OpenResults => {
                debug!(stale = self.cache.is_stale(), "opening results");
                self.ui.show_results();
                let service = Arc::clone(&self.service);
                let cache = Arc::clone(&self.cache);
                let tx = self.results_tx.clone();
                tokio::spawn(async move {
                    let loaded = cache
                        .get(service.as_ref())
                        .await
                        .map_err(|e| e.user_message());
                    let _ = tx.send(loaded);
                });
            }
            HostEvent::GoBack => {
                info!("leaving exam screen");
                self.ui.should_quit = true;
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if self.ui.screen == Screen::Results {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q')) {
                self.ui.should_quit = true;
            }
            return;
        }

        if self.ui.has_dialog() {
            self.handle_dialog_key(key);
            return;
        }

        match self.ui.view.state {
            SessionState::Loading => {
                if ctrl && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c')) {
                    self.quit();
                }
            }
            SessionState::Error => match key.code {
                KeyCode::Char('q') | KeyCode::Char('c') if ctrl => self.quit(),
                KeyCode::Enter | KeyCode::Esc | KeyCode::Backspace => self.send(Command::Back),
                _ => {}
            },
            SessionState::Active => self.handle_active_key(key, ctrl),
            SessionState::Submitting | SessionState::Terminal => {}
        }
    }

    fn quit(&mut self) {
        self.send(Command::Quit);
        self.ui.should_quit = true;
    }

    fn handle_active_key(&mut self, key: KeyEvent, ctrl: bool) {
        if ctrl {
            match key.code {
                KeyCode::Char('q') | KeyCode::Char('c') => self.ui.push_dialog(Dialog::ConfirmQuit),
                KeyCode::Char('s') if self.ui.view.expired => self.send(Command::Submit),
                KeyCode::Char('s') => self.ui.push_dialog(Dialog::ConfirmSubmit),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Tab | KeyCode::BackTab => {
                self.ui.toggle_panel();
                return;
            }
            KeyCode::Char('?') => {
                self.ui.push_dialog(Dialog::Help);
                return;
            }
            _ => {}
        }

        if self.handle_page_keys(key) {
            return;
        }

        match self.ui.active_panel {
            ActivePanel::Main => match key.code {
                KeyCode::Up => self.ui.move_cursor(-1),
                KeyCode::Down => self.ui.move_cursor(1),
                KeyCode::Left => self.send(Command::Previous),
                KeyCode::Right => self.send(Command::Next),
                KeyCode::Enter | KeyCode::Char(' ') => self.choose(self.ui.choice_cursor),
                KeyCode::Char(c) if c.is_ascii_lowercase() => {
                    let idx = (c as u8 - b'a') as usize;
                    if idx < self.ui.options().len() {
                        self.ui.choice_cursor = idx;
                        self.choose(idx);
                    }
                }
                _ => {}
            },
            ActivePanel::Sidebar => match key.code {
                KeyCode::Up | KeyCode::Left => self.send(Command::Previous),
                KeyCode::Down | KeyCode::Right => self.send(Command::Next),
                KeyCode::Enter => self.ui.active_panel = ActivePanel::Main,
                _ => {}
            },
        }
    }

    fn handle_page_keys(&mut self, key: KeyEvent) -> bool {
        let current = self.ui.view.current_index;
        let last = self.ui.view.question_count.saturating_sub(1);
        let target = match key.code {
            KeyCode::PageUp => current.saturating_sub(PAGE),
            KeyCode::PageDown => (current + PAGE).min(last),
            KeyCode::Home => 0,
            KeyCode::End => last,
            _ => return false,
        };
        self.send(Command::Jump(target));
        true
    }

    fn choose(&mut self, idx: usize) {
        if !self.ui.accepts_answers() {
            return;
        }
        if let Some(option) = self.ui.option_at(idx) {
            self.send(Command::Choose(option));
        }
    }

    fn handle_dialog_key(&mut self, key: KeyEvent) {
        let Some(dialog) = self.ui.top_dialog().cloned() else {
            return;
        };
        match (dialog, key.code) {
            (Dialog::ConfirmSubmit, KeyCode::Enter) => {
                self.ui.pop_dialog();
                self.send(Command::Submit);
            }
            (Dialog::ConfirmQuit, KeyCode::Enter) => {
                self.ui.pop_dialog();
                self.quit();
            }
            (Dialog::ConfirmSubmit | Dialog::ConfirmQuit, KeyCode::Esc)
            | (Dialog::LowTimeWarning, KeyCode::Enter | KeyCode::Esc)
            | (Dialog::Help, KeyCode::Esc | KeyCode::Char('?')) => {
                self.ui.pop_dialog();
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent, area: Rect) {
        if self.ui.screen != Screen::Session
            || self.ui.view.state != SessionState::Active
            || self.ui.has_dialog()
        {
            return;
        }
        let regions = layout::compute_layout(area);

        match mouse.kind {
            MouseEventKind::ScrollUp => self.send(Command::Previous),
            MouseEventKind::ScrollDown => self.send(Command::Next),
            MouseEventKind::Down(MouseButton::Left) => {
                let (x, y) = (mouse.column, mouse.row);
                if contains(regions.sidebar, x, y) {
                    self.ui.active_panel = ActivePanel::Sidebar;
                    if let Some(idx) = sidebar::question_at_row(&self.ui, regions.sidebar, y) {
                        self.send(Command::Jump(idx));
                    }
                } else if contains(regions.main, x, y) {
                    self.ui.active_panel = ActivePanel::Main;
                    if let Some(idx) = question::option_at_row(&self.ui, regions.main, y) {
                        self.ui.choice_cursor = idx;
                        self.choose(idx);
                    }
                }
            }
            _ => {}
        }
    }
}

fn contains(area: Rect, x: u16, y: u16) -> bool {
    x >= area.x && x < area.x + area.width && y >= area.y && y < area.y + area.height
}
