//! Attempt session controller: acquisition, the attempt state machine, and the
//! single submission entry point.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::answers::AnswerStore;
use crate::autosave::{Autosave, SaveStatus, DEFAULT_DEBOUNCE};
use crate::clock::Clock;
use crate::error::ServiceError;
use crate::model::{Attempt, OptionId, Question, QuestionId};
use crate::navigator::QuestionNavigator;
use crate::service::ExamService;
use crate::timer::{self as countdown, Countdown, TimerEvent, DEFAULT_LOW_TIME_SECS};

pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_millis(2000);
const SUBMIT_RETRY_INITIAL: Duration = Duration::from_secs(2);
const SUBMIT_RETRY_MAX: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Error,
    Active,
    Submitting,
    Terminal,
}

/// Input from the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Answer { question: QuestionId, option: OptionId },
    /// Answer the question currently shown.
    Choose(OptionId),
    Next,
    Previous,
    Jump(usize),
    Submit,
    Back,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    User,
    Expiry,
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The attempt was submitted and the results view opened.
    Submitted,
    /// The attempt had already been completed; results were opened instead.
    RedirectedToResults,
    /// The attempt could not be started and the member went back.
    Failed,
    /// The session was torn down before reaching a terminal state.
    Abandoned,
}

/// Navigation and cache hooks supplied by the front-end.
pub trait SessionHost: Send + Sync {
    /// Cached result listings are out of date.
    fn invalidate_results(&self);
    fn open_results(&self);
    fn go_back(&self);
    fn state_changed(&self, _from: SessionState, _to: SessionState) {}
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub autosave_debounce: Duration,
    pub redirect_delay: Duration,
    pub low_time_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autosave_debounce: DEFAULT_DEBOUNCE,
            redirect_delay: DEFAULT_REDIRECT_DELAY,
            low_time_secs: DEFAULT_LOW_TIME_SECS,
        }
    }
}

/// Everything the front-end needs to render the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub state: SessionState,
    pub exam_title: String,
    pub remaining_secs: Option<i64>,
    pub low_time: bool,
    pub expired: bool,
    pub current_index: usize,
    pub question_count: usize,
    pub current: Option<Question>,
    pub current_answer: Option<OptionId>,
    pub answered: Vec<bool>,
    pub answered_count: usize,
    pub total_points: u32,
    pub save_status: SaveStatus,
    pub error: Option<String>,
    pub redirecting: bool,
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            state: SessionState::Loading,
            exam_title: String::new(),
            remaining_secs: None,
            low_time: false,
            expired: false,
            current_index: 0,
            question_count: 0,
            current: None,
            current_answer: None,
            answered: Vec::new(),
            answered_count: 0,
            total_points: 0,
            save_status: SaveStatus::Idle,
            error: None,
            redirecting: false,
        }
    }
}

impl SessionView {
    pub fn remaining_display(&self) -> String {
        match self.remaining_secs {
            Some(secs) => countdown::format_remaining(secs),
            None => "--:--".to_string(),
        }
    }

    pub fn progress_percent(&self) -> u16 {
        if self.question_count == 0 {
            return 0;
        }
        ((self.answered_count * 100) / self.question_count) as u16
    }

    pub fn is_last_question(&self) -> bool {
        self.question_count == 0 || self.current_index + 1 == self.question_count
    }
}

/// Drives one attempt from acquisition to its terminal state.
pub struct AttemptSession {
    service: Arc<dyn ExamService>,
    clock: Arc<dyn Clock>,
    host: Arc<dyn SessionHost>,
    config: SessionConfig,
    view: watch::Sender<SessionView>,
    state: SessionState,
}

impl AttemptSession {
    pub fn new(
        service: Arc<dyn ExamService>,
        clock: Arc<dyn Clock>,
        host: Arc<dyn SessionHost>,
        config: SessionConfig,
    ) -> Self {
        let (view, _) = watch::channel(SessionView::default());
        Self {
            service,
            clock,
            host,
            config,
            view,
            state: SessionState::Loading,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.subscribe()
    }

    pub async fn run(
        mut self,
        exam_id: String,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) -> SessionOutcome {
        info!(exam_id = %exam_id, "acquiring attempt");
        let service = Arc::clone(&self.service);

        let acquired = tokio::select! {
            result = service.acquire_attempt(&exam_id) => result,
            _ = wait_for_exit(&mut commands) => {
                info!("left before the attempt loaded");
                return SessionOutcome::Abandoned;
            }
        };

        match acquired {
            Ok(snapshot) => {
                let attempt = Attempt::from_snapshot(&exam_id, snapshot, self.clock.now());
                LiveAttempt::start(self, attempt).run(&mut commands).await
            }
            Err(err) => self.fail_acquisition(err, &mut commands).await,
        }
    }

    fn set_state(&mut self, to: SessionState) {
        let from = self.state;
        if from == to {
            return;
        }
        info!(?from, ?to, "session state changed");
        self.state = to;
        self.host.state_changed(from, to);
    }

    async fn fail_acquisition(
        &mut self,
        err: ServiceError,
        commands: &mut mpsc::UnboundedReceiver<Command>,
    ) -> SessionOutcome {
        warn!(error = %err, "cannot start attempt");
        let redirect = err.is_already_completed();
        self.set_state(SessionState::Error);
        self.view.send_modify(|v| {
            v.state = SessionState::Error;
            v.error = Some(err.user_message());
            v.redirecting = redirect;
        });

        let exit = if redirect {
            tokio::select! {
                _ = time::sleep(self.config.redirect_delay) => {
                    info!("attempt already completed, opening results");
                    self.host.open_results();
                    return SessionOutcome::RedirectedToResults;
                }
                exit = wait_for_exit(commands) => exit,
            }
        } else {
            wait_for_exit(commands).await
        };

        match exit {
            Some(Command::Back) => {
                self.host.go_back();
                SessionOutcome::Failed
            }
            _ => SessionOutcome::Abandoned,
        }
    }
}

/// Resolves with the first `Back`/`Quit`, or `None` once the sender is gone.
async fn wait_for_exit(commands: &mut mpsc::UnboundedReceiver<Command>) -> Option<Command> {
    while let Some(cmd) = commands.recv().await {
        match cmd {
            Command::Back | Command::Quit => return Some(cmd),
            other => debug!(command = ?other, "command ignored outside an open attempt"),
        }
    }
    None
}

type Submission = JoinHandle<Result<(), ServiceError>>;

async fn join_submission(task: &mut Option<Submission>) -> Result<Result<(), ServiceError>, JoinError> {
    let Some(handle) = task.as_mut() else {
        return std::future::pending().await;
    };
    let joined = handle.await;
    *task = None;
    joined
}

async fn sleep_until(at: Option<Instant>) {
    match at {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// An acquired attempt with its timer, store and autosave running.
struct LiveAttempt {
    session: AttemptSession,
    attempt: Attempt,
    store: AnswerStore,
    navigator: QuestionNavigator,
    _countdown: Countdown,
    timer_rx: mpsc::UnboundedReceiver<TimerEvent>,
    timer_open: bool,
    _autosave: Autosave,
    save_status: watch::Receiver<SaveStatus>,
    autosave_open: bool,
    armed: watch::Sender<bool>,
    remaining: Option<i64>,
    expired: bool,
    submit_in_flight: bool,
    submission: Option<Submission>,
    retry_at: Option<Instant>,
    retry_delay: Option<Duration>,
    error: Option<String>,
}

impl LiveAttempt {
    fn start(mut session: AttemptSession, attempt: Attempt) -> Self {
        let mut store = AnswerStore::new(attempt.question_ids());
        if let Some(prior) = &attempt.prior_answers {
            let merged = store.merge_prior(prior);
            info!(merged, "resumed attempt with saved answers");
        }

        let (countdown, timer_rx) = countdown::spawn_countdown(
            attempt.deadline(),
            Arc::clone(&session.clock),
            session.config.low_time_secs,
        );

        let (armed, armed_rx) = watch::channel(true);
        let (autosave, save_status) = Autosave::spawn(
            Arc::clone(&session.service),
            Arc::clone(&session.clock),
            attempt.attempt_id.clone(),
            store.subscribe(),
            armed_rx,
            session.config.autosave_debounce,
        );

        info!(
            attempt_id = %attempt.attempt_id,
            questions = attempt.questions.len(),
            deadline = %attempt.deadline(),
            "attempt open"
        );

        session.set_state(SessionState::Active);
        let live = Self {
            navigator: QuestionNavigator::new(attempt.questions.len()),
            session,
            attempt,
            store,
            _countdown: countdown,
            timer_rx,
            timer_open: true,
            _autosave: autosave,
            save_status,
            autosave_open: true,
            armed,
            remaining: None,
            expired: false,
            submit_in_flight: false,
            submission: None,
            retry_at: None,
            retry_delay: None,
            error: None,
        };
        live.refresh();
        live
    }

    async fn run(mut self, commands: &mut mpsc::UnboundedReceiver<Command>) -> SessionOutcome {
        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(Command::Quit) | None => {
                        if self.submit_in_flight {
                            warn!("session closed while a submission is in flight");
                        } else {
                            info!("session closed before submission");
                        }
                        return SessionOutcome::Abandoned;
                    }
                    Some(cmd) => self.handle_command(cmd),
                },
                event = self.timer_rx.recv(), if self.timer_open => match event {
                    Some(event) => self.handle_timer(event),
                    None => self.timer_open = false,
                },
                changed = self.save_status.changed(), if self.autosave_open => {
                    if changed.is_ok() {
                        self.refresh();
                    } else {
                        self.autosave_open = false;
                    }
                },
                joined = join_submission(&mut self.submission), if self.submission.is_some() => {
                    if let Some(outcome) = self.finish_submission(joined) {
                        return outcome;
                    }
                },
                _ = sleep_until(self.retry_at), if self.retry_at.is_some() => {
                    self.retry_at = None;
                    self.begin_submission(SubmitTrigger::Retry);
                },
            }
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Answer { question, option } => self.record_answer(&question, option),
            Command::Choose(option) => {
                let current = self
                    .navigator
                    .current(&self.attempt.questions)
                    .map(|q| q.id.clone());
                if let Some(question) = current {
                    self.record_answer(&question, option);
                }
            }
            Command::Next => {
                if self.navigator.next() {
                    self.refresh();
                }
            }
            Command::Previous => {
                if self.navigator.previous() {
                    self.refresh();
                }
            }
            Command::Jump(index) => {
                if self.navigator.jump(index) {
                    self.refresh();
                }
            }
            Command::Submit => self.begin_submission(SubmitTrigger::User),
            Command::Back | Command::Quit => {
                debug!(command = ?cmd, "ignored while the attempt is open");
            }
        }
    }

    fn record_answer(&mut self, question: &str, option: OptionId) {
        if self.session.state != SessionState::Active || self.expired {
            debug!(question, option, state = ?self.session.state, "answer ignored");
            return;
        }
        match self.store.set_answer(question, option) {
            Ok(true) => {
                debug!(question, option, "answer recorded");
                self.refresh();
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "answer rejected"),
        }
    }

    fn handle_timer(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::Tick(secs) => {
                self.remaining = Some(secs);
                self.refresh();
            }
            TimerEvent::LowTime => {
                info!(threshold_secs = self.session.config.low_time_secs, "running low on time");
            }
            TimerEvent::Expired => {
                info!("time is up");
                self.expired = true;
                self.remaining = Some(0);
                self.refresh();
                self.begin_submission(SubmitTrigger::Expiry);
            }
        }
    }

    /// The only way into `Submitting`. A trigger arriving while a submission
    /// is in flight is dropped.
    fn begin_submission(&mut self, trigger: SubmitTrigger) {
        if self.submit_in_flight {
            debug!(?trigger, "submission already in progress");
            return;
        }
        if self.session.state != SessionState::Active {
            debug!(?trigger, state = ?self.session.state, "submission not possible");
            return;
        }

        self.submit_in_flight = true;
        self.retry_at = None;
        self.armed.send_replace(false);
        self.error = None;
        self.session.set_state(SessionState::Submitting);
        self.refresh();

        let answers = self.store.snapshot();
        info!(?trigger, answered = answers.len(), "submitting attempt");
        let service = Arc::clone(&self.session.service);
        let attempt_id = self.attempt.attempt_id.clone();
        self.submission = Some(tokio::spawn(async move {
            service.submit_attempt(&attempt_id, &answers).await
        }));
    }

    fn finish_submission(
        &mut self,
        joined: Result<Result<(), ServiceError>, JoinError>,
    ) -> Option<SessionOutcome> {
        let result = match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!(error = %e, "submission failed");
                Err(e.user_message())
            }
            Err(e) => {
                warn!(error = %e, "submission task did not complete");
                Err("Submission was interrupted".to_string())
            }
        };

        match result {
            Ok(()) => {
                info!(attempt_id = %self.attempt.attempt_id, "attempt submitted");
                self.store.seal();
                self.timer_open = false;
                self.session.set_state(SessionState::Terminal);
                self.refresh();
                self.session.host.invalidate_results();
                self.session.host.open_results();
                Some(SessionOutcome::Submitted)
            }
            Err(message) => {
                self.submit_in_flight = false;
                self.error = Some(message);
                self.session.set_state(SessionState::Active);
                if self.expired {
                    let delay = match self.retry_delay {
                        None => Duration::ZERO,
                        Some(d) if d.is_zero() => SUBMIT_RETRY_INITIAL,
                        Some(d) => (d * 2).min(SUBMIT_RETRY_MAX),
                    };
                    info!(retry_in = ?delay, "deadline passed, submission will be retried");
                    self.retry_delay = Some(delay);
                    self.retry_at = Some(Instant::now() + delay);
                } else {
                    self.armed.send_replace(true);
                }
                self.refresh();
                None
            }
        }
    }

    fn refresh(&self) {
        let questions = &self.attempt.questions;
        let current = self.navigator.current(questions).cloned();
        let current_answer = current.as_ref().and_then(|q| self.store.selected(&q.id));
        let remaining = self.remaining;
        let low_time_secs = self.session.config.low_time_secs;

        self.session.view.send_replace(SessionView {
            state: self.session.state,
            exam_title: self.attempt.exam_title.clone(),
            remaining_secs: remaining,
            low_time: remaining.is_some_and(|s| countdown::is_low_time(s, low_time_secs)),
            expired: self.expired,
            current_index: self.navigator.current_index(),
            question_count: questions.len(),
            current,
            current_answer,
            answered: self.navigator.answered_flags(questions, &self.store),
            answered_count: self.store.answered_count(),
            total_points: self.attempt.total_points(),
            save_status: self.save_status.borrow().clone(),
            error: self.error.clone(),
            redirecting: false,
        });
    }
}
