use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Source of the current time for deadline arithmetic.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall time anchored once, then advanced by the runtime's monotonic clock.
///
/// Wall-clock adjustments during an exam do not move the countdown, and under
/// a paused tokio runtime the clock follows `tokio::time::advance`.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    wall: DateTime<Utc>,
    anchor: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::anchored_at(Utc::now())
    }

    pub fn anchored_at(wall: DateTime<Utc>) -> Self {
        Self {
            wall,
            anchor: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = Instant::now().saturating_duration_since(self.anchor);
        self.wall + chrono::Duration::from_std(elapsed).unwrap_or(chrono::Duration::zero())
    }
}
