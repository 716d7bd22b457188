//! The deadline of a run.
//!
//! A [`RunClock`] fires once its configured duration has elapsed, or earlier when it is cancelled
//! directly or through the shutdown token it was started from. Once fired it stays fired.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Upper bound for deadlines, to keep `start + duration` from overflowing.
const MAX_DURATION: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// A cancellable deadline that signals the end of admission.
#[derive(Clone, Debug)]
pub struct RunClock {
    started_at: Instant,
    deadline: Instant,
    token: CancellationToken,
}

impl RunClock {
    /// Starts a clock that fires after `duration`, or when `shutdown` is cancelled.
    ///
    /// Cancelling the clock itself does not propagate back to `shutdown`.
    pub fn start(duration: Duration, shutdown: &CancellationToken) -> Self {
        let started_at = Instant::now();
        let deadline = started_at + duration.min(MAX_DURATION);

        Self {
            started_at,
            deadline,
            token: shutdown.child_token(),
        }
    }

    /// Returns `true` if the run has ended.
    pub fn is_fired(&self) -> bool {
        if self.token.is_cancelled() {
            return true;
        }

        if Instant::now() >= self.deadline {
            self.token.cancel();
            return true;
        }

        false
    }

    /// Resolves once the run has ended.
    ///
    /// This is cancel-safe and can be raced against other futures in `tokio::select!`.
    pub async fn fired(&self) {
        if self.is_fired() {
            return;
        }

        tokio::select! {
            _ = self.token.cancelled() => {}
            _ = tokio::time::sleep_until(self.deadline) => self.token.cancel(),
        }
    }

    /// Ends the run early. Calling this more than once has no further effect.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The instant the clock was started.
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// The instant at which the clock fires unless cancelled earlier.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Wall-clock time since the clock was started.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}
