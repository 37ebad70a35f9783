use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::model::AnswerMap;
use crate::service::ExamService;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(2000);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved { at: DateTime<Utc>, answered: usize },
    Failed(String),
}

impl SaveStatus {
    pub fn is_unsaved(&self) -> bool {
        matches!(self, SaveStatus::Failed(_))
    }
}

/// Background persistence of the answer store.
///
/// Saves the full snapshot once the store has been quiet for the debounce
/// window. Saves run one at a time; changes made while a save is in flight
/// are picked up by the next cycle. Nothing is sent while `armed` is false.
pub struct Autosave {
    handle: JoinHandle<()>,
}

impl Autosave {
    pub fn spawn(
        service: Arc<dyn ExamService>,
        clock: Arc<dyn Clock>,
        attempt_id: String,
        answers: watch::Receiver<AnswerMap>,
        armed: watch::Receiver<bool>,
        debounce: Duration,
    ) -> (Self, watch::Receiver<SaveStatus>) {
        let (status_tx, status_rx) = watch::channel(SaveStatus::Idle);
        let worker = Worker {
            service,
            clock,
            attempt_id,
            answers,
            armed,
            debounce,
            status: status_tx,
        };
        let handle = tokio::spawn(worker.run());
        (Self { handle }, status_rx)
    }

    /// Stops the coordinator. A pending debounce is discarded.
    pub fn dispose(self) {
        self.handle.abort();
    }
}

impl Drop for Autosave {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct Worker {
    service: Arc<dyn ExamService>,
    clock: Arc<dyn Clock>,
    attempt_id: String,
    answers: watch::Receiver<AnswerMap>,
    armed: watch::Receiver<bool>,
    debounce: Duration,
    status: watch::Sender<SaveStatus>,
}

impl Worker {
    async fn run(mut self) {
        let mut pending = false;
        let mut retry_delay: Option<Duration> = None;
        let mut last_saved: Option<AnswerMap> = None;

        loop {
            if !pending {
                let woke = match retry_delay {
                    Some(delay) => tokio::select! {
                        changed = self.answers.changed() => changed.is_ok(),
                        _ = time::sleep(delay) => true,
                    },
                    None => self.answers.changed().await.is_ok(),
                };
                if !woke {
                    break;
                }
            }
            pending = false;

            if !self.quiet_period().await {
                break;
            }

            if !*self.armed.borrow() {
                debug!("autosave held while the attempt is being submitted");
                if self.armed.wait_for(|armed| *armed).await.is_err() {
                    break;
                }
                pending = true;
                continue;
            }

            let snapshot = self.answers.borrow_and_update().clone();
            if snapshot.is_empty() || last_saved.as_ref() == Some(&snapshot) {
                retry_delay = None;
                continue;
            }

            self.status.send_replace(SaveStatus::Saving);
            match self.service.save_progress(&self.attempt_id, &snapshot).await {
                Ok(()) => {
                    info!(answered = snapshot.len(), "progress saved");
                    retry_delay = None;
                    self.status.send_replace(SaveStatus::Saved {
                        at: self.clock.now(),
                        answered: snapshot.len(),
                    });
                    last_saved = Some(snapshot);
                }
                Err(e) => {
                    let next = retry_delay.map_or(self.debounce, |d| (d * 2).min(MAX_RETRY_DELAY));
                    warn!(error = %e, retry_in = ?next, "autosave failed");
                    retry_delay = Some(next);
                    // The failed request may still have landed server-side.
                    last_saved = None;
                    self.status.send_replace(SaveStatus::Failed(e.user_message()));
                }
            }
        }

        debug!("autosave stopped");
    }

    /// Waits until no change arrives for a full debounce window.
    /// Returns false when the store has gone away.
    async fn quiet_period(&mut self) -> bool {
        loop {
            tokio::select! {
                _ = time::sleep(self.debounce) => return true,
                changed = self.answers.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
            }
        }
    }
}
