#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use termexam::clock::MonotonicClock;
use termexam::error::ServiceError;
use termexam::model::{AnswerMap, AnswerOption, AttemptResult, AttemptSnapshot, PublishedExam, Question};
use termexam::service::ExamService;
use termexam::session::{
    AttemptSession, Command, SessionConfig, SessionHost, SessionOutcome, SessionState, SessionView,
};

pub fn questions(count: usize) -> Vec<Question> {
    (1..=count)
        .map(|n| Question {
            id: format!("q{}", n),
            text: format!("Question number {}?", n),
            points: 2,
            kind: "MCQ".to_string(),
            options: (1..=4)
                .map(|id| AnswerOption {
                    id,
                    text: format!("option {}", id),
                })
                .collect(),
        })
        .collect()
}

pub fn snapshot(question_count: usize, minutes: u32) -> AttemptSnapshot {
    AttemptSnapshot {
        attempt_id: "att-1".to_string(),
        exam_title: "Bible Knowledge Rank 2".to_string(),
        duration: minutes,
        questions: questions(question_count),
        resumed: None,
        started_at: None,
        answers: None,
    }
}

pub fn answers(pairs: &[(&str, i64)]) -> AnswerMap {
    pairs.iter().map(|(q, o)| (q.to_string(), *o)).collect()
}

/// In-memory exam service recording every call.
#[derive(Default)]
pub struct FakeService {
    acquire: Mutex<VecDeque<Result<AttemptSnapshot, ServiceError>>>,
    saves: Mutex<Vec<(String, AnswerMap)>>,
    submits: Mutex<Vec<(String, AnswerMap)>>,
    save_failures: Mutex<usize>,
    submit_failures: Mutex<usize>,
    submit_delay: Mutex<Duration>,
    results: Mutex<Vec<AttemptResult>>,
    results_calls: Mutex<usize>,
}

impl FakeService {
    pub fn with_attempt(snapshot: AttemptSnapshot) -> Self {
        let service = Self::default();
        service.acquire.lock().unwrap().push_back(Ok(snapshot));
        service
    }

    pub fn failing_acquire(err: ServiceError) -> Self {
        let service = Self::default();
        service.acquire.lock().unwrap().push_back(Err(err));
        service
    }

    pub fn fail_next_saves(&self, n: usize) {
        *self.save_failures.lock().unwrap() = n;
    }

    pub fn fail_next_submits(&self, n: usize) {
        *self.submit_failures.lock().unwrap() = n;
    }

    pub fn set_submit_delay(&self, delay: Duration) {
        *self.submit_delay.lock().unwrap() = delay;
    }

    pub fn set_results(&self, results: Vec<AttemptResult>) {
        *self.results.lock().unwrap() = results;
    }

    pub fn results_calls(&self) -> usize {
        *self.results_calls.lock().unwrap()
    }

    pub fn saves(&self) -> Vec<AnswerMap> {
        self.saves.lock().unwrap().iter().map(|(_, a)| a.clone()).collect()
    }

    pub fn submits(&self) -> Vec<AnswerMap> {
        self.submits.lock().unwrap().iter().map(|(_, a)| a.clone()).collect()
    }

    pub fn submit_attempt_ids(&self) -> Vec<String> {
        self.submits.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
    }

    fn take_failure(counter: &Mutex<usize>) -> bool {
        let mut left = counter.lock().unwrap();
        if *left > 0 {
            *left -= 1;
            true
        } else {
            false
        }
    }
}

fn unavailable() -> ServiceError {
    ServiceError::Rejected {
        status: 503,
        message: "Service unavailable".to_string(),
    }
}

#[async_trait]
impl ExamService for FakeService {
    async fn acquire_attempt(&self, _exam_id: &str) -> Result<AttemptSnapshot, ServiceError> {
        self.acquire
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(unavailable()))
    }

    async fn save_progress(&self, attempt_id: &str, answers: &AnswerMap) -> Result<(), ServiceError> {
        self.saves
            .lock()
            .unwrap()
            .push((attempt_id.to_string(), answers.clone()));
        if Self::take_failure(&self.save_failures) {
            return Err(unavailable());
        }
        Ok(())
    }

    async fn submit_attempt(&self, attempt_id: &str, answers: &AnswerMap) -> Result<(), ServiceError> {
        self.submits
            .lock()
            .unwrap()
            .push((attempt_id.to_string(), answers.clone()));
        let delay = *self.submit_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if Self::take_failure(&self.submit_failures) {
            return Err(unavailable());
        }
        Ok(())
    }

    async fn published_exams(&self) -> Result<Vec<PublishedExam>, ServiceError> {
        Ok(Vec::new())
    }

    async fn my_results(&self) -> Result<Vec<AttemptResult>, ServiceError> {
        *self.results_calls.lock().unwrap() += 1;
        Ok(self.results.lock().unwrap().clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    InvalidateResults,
    OpenResults,
    GoBack,
}

#[derive(Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
    transitions: Mutex<Vec<(SessionState, SessionState)>>,
}

impl RecordingHost {
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn transitions(&self) -> Vec<(SessionState, SessionState)> {
        self.transitions.lock().unwrap().clone()
    }

    /// Every state entered, in order, starting from `Loading`.
    pub fn states(&self) -> Vec<SessionState> {
        let mut states = vec![SessionState::Loading];
        states.extend(self.transitions().into_iter().map(|(_, to)| to));
        states
    }
}

impl SessionHost for RecordingHost {
    fn invalidate_results(&self) {
        self.calls.lock().unwrap().push(HostCall::InvalidateResults);
    }

    fn open_results(&self) {
        self.calls.lock().unwrap().push(HostCall::OpenResults);
    }

    fn go_back(&self) {
        self.calls.lock().unwrap().push(HostCall::GoBack);
    }

    fn state_changed(&self, from: SessionState, to: SessionState) {
        self.transitions.lock().unwrap().push((from, to));
    }
}

/// A running session wired to fakes.
pub struct Harness {
    pub service: Arc<FakeService>,
    pub host: Arc<RecordingHost>,
    pub commands: mpsc::UnboundedSender<Command>,
    pub view: watch::Receiver<SessionView>,
    pub task: JoinHandle<SessionOutcome>,
}

pub fn start(service: FakeService, config: SessionConfig) -> Harness {
    let service = Arc::new(service);
    let host = Arc::new(RecordingHost::default());
    let clock = Arc::new(MonotonicClock::new());
    let session = AttemptSession::new(service.clone(), clock, host.clone(), config);
    let view = session.subscribe();
    let (commands, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(session.run("exam-1".to_string(), rx));
    Harness {
        service,
        host,
        commands,
        view,
        task,
    }
}

impl Harness {
    pub async fn send(&self, cmd: Command) {
        self.commands.send(cmd).unwrap();
    }

    pub async fn answer(&self, question: &str, option: i64) {
        self.send(Command::Answer {
            question: question.to_string(),
            option,
        })
        .await;
    }

    pub async fn wait_for_state(&mut self, state: SessionState) -> SessionView {
        self.view
            .wait_for(|v| v.state == state)
            .await
            .expect("session ended before reaching state")
            .clone()
    }

    pub async fn wait_for(&mut self, f: impl FnMut(&SessionView) -> bool) -> SessionView {
        self.view
            .wait_for(f)
            .await
            .expect("session ended before condition held")
            .clone()
    }

    /// Lets spawned tasks run without moving the paused clock.
    pub async fn settle(&self) {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }
}
