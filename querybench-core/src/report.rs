//! The summary printed at the end of a run.

use std::time::Duration;

/// Runs shorter than this are too short to measure and report a throughput of zero.
const MIN_MEASURABLE: Duration = Duration::from_millis(1);

/// Outcome of a finished run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Report {
    /// Number of operations that completed successfully.
    pub completed: u64,
    /// Wall-clock time from the start of the run until all tasks were joined.
    pub elapsed: Duration,
}

impl Report {
    /// Successful operations per second of elapsed time.
    pub fn throughput(&self) -> f64 {
        if self.completed == 0 || self.elapsed < MIN_MEASURABLE {
            return 0.0;
        }

        self.completed as f64 / self.elapsed.as_secs_f64()
    }
}
