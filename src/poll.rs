//! Bounded polling
//!
//! The player gives no confirmation for fire-and-forget commands, so the
//! bridge repeatedly checks for the expected effect (a file on disk, a stream
//! list) until it shows up or a deadline passes. Timing goes through
//! `tokio::time`, so tests can drive it with a paused clock.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

/// Interval between checks and total time allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    pub deadline: Duration,
}

impl PollSchedule {
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }
}

/// Run `check` until it yields a value or the deadline passes.
///
/// `check` runs at least once, immediately, and once more at the deadline if
/// the interval does not land on it exactly. Errors from `check` end the poll.
pub async fn poll_until<T, E, F, Fut>(schedule: PollSchedule, mut check: F) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let started = Instant::now();
    let deadline = started + schedule.deadline;
    let mut checks = 0u32;

    loop {
        checks += 1;
        if let Some(value) = check().await? {
            tracing::trace!("Poll satisfied after {} checks", checks);
            return Ok(Some(value));
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::debug!(
                "Poll gave up after {} checks ({:?})",
                checks,
                now.duration_since(started)
            );
            return Ok(None);
        }
        let wait = schedule.interval.min(deadline - now);
        sleep(wait.max(Duration::from_millis(1))).await;
    }
}
