use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::clock::Clock;

pub const TICK: Duration = Duration::from_secs(1);
pub const DEFAULT_LOW_TIME_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    Tick(i64),
    LowTime,
    Expired,
}

/// Running countdown. Dropping it stops the ticks.
#[derive(Debug)]
pub struct Countdown {
    handle: JoinHandle<()>,
}

impl Countdown {
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Starts a 1 Hz countdown towards `deadline`.
///
/// The first evaluation happens immediately. Once the remaining time reaches
/// zero a final `Tick(0)` and a single `Expired` are sent and the task ends.
pub fn spawn_countdown(
    deadline: DateTime<Utc>,
    clock: Arc<dyn Clock>,
    low_time_secs: i64,
) -> (Countdown, mpsc::UnboundedReceiver<TimerEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        let mut interval = time::interval(TICK);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut warned_low = false;

        loop {
            interval.tick().await;
            let secs = remaining_secs(deadline, clock.now());

            if secs <= 0 {
                let _ = tx.send(TimerEvent::Tick(0));
                let _ = tx.send(TimerEvent::Expired);
                break;
            }

            if !warned_low && is_low_time(secs, low_time_secs) {
                warned_low = true;
                let _ = tx.send(TimerEvent::LowTime);
            }

            if tx.send(TimerEvent::Tick(secs)).is_err() {
                break;
            }
        }
    });

    (Countdown { handle }, rx)
}

/// Whole seconds left until `deadline`, rounded down and never negative.
pub fn remaining_secs(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (deadline - now)
        .num_milliseconds()
        .div_euclid(1000)
        .max(0)
}

pub fn is_low_time(secs: i64, threshold: i64) -> bool {
    secs > 0 && secs < threshold
}

/// `HH:MM:SS`, or `MM:SS` when under an hour.
pub fn format_remaining(total_secs: i64) -> String {
    let total_secs = total_secs.max(0);
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}
