use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::error::ServiceError;
use crate::model::AttemptResult;
use crate::service::ExamService;

/// Cached copy of the member's results listing.
///
/// A successful submission invalidates it so the next read refetches.
#[derive(Debug, Default)]
pub struct ResultsCache {
    entries: Mutex<Option<Vec<AttemptResult>>>,
}

impl ResultsCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Vec<AttemptResult>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn invalidate(&self) {
        debug!("results cache invalidated");
        self.lock().take();
    }

    pub fn is_stale(&self) -> bool {
        self.lock().is_none()
    }

    pub async fn get(&self, service: &dyn ExamService) -> Result<Vec<AttemptResult>, ServiceError> {
        let cached = self.lock().clone();
        if let Some(cached) = cached {
            return Ok(cached);
        }
        let fresh = service.my_results().await?;
        *self.lock() = Some(fresh.clone());
        Ok(fresh)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamProgress {
    NotStarted,
    InProgress,
    Completed,
}

/// Where the member stands on `exam_id` according to their results.
pub fn exam_progress(exam_id: &str, results: &[AttemptResult]) -> ExamProgress {
    match results.iter().find(|r| r.exam_id == exam_id) {
        None => ExamProgress::NotStarted,
        Some(r) if r.is_completed() => ExamProgress::Completed,
        Some(_) => ExamProgress::InProgress,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultsSummary {
    pub completed: usize,
    pub passed: usize,
    pub failed: usize,
    /// Whole percent.
    pub pass_rate: u32,
}

pub fn summarize(results: &[AttemptResult]) -> ResultsSummary {
    let completed: Vec<_> = results.iter().filter(|r| r.is_completed()).collect();
    let passed = completed.iter().filter(|r| r.passed == Some(true)).count();
    let pass_rate = if completed.is_empty() {
        0
    } else {
        ((passed as f64 / completed.len() as f64) * 100.0).round() as u32
    };
    ResultsSummary {
        completed: completed.len(),
        passed,
        failed: completed.len() - passed,
        pass_rate,
    }
}
