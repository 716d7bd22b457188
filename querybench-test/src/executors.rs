//! Executors with scripted behavior, for testing the load loop without a database.
//!
//! ```
//! use std::time::Duration;
//!
//! use querybench_test::executors::{Sleeping, Tracked};
//!
//! let executor = Tracked::new(Sleeping::new(Duration::from_millis(5)));
//! let probe = executor.probe();
//! // hand `executor` to a run, then inspect `probe` afterwards...
//! assert_eq!(probe.calls(), 0);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use querybench_core::{Executor, ExecutorError, ExecutorResult};

/// Succeeds immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct Succeeding;

#[async_trait::async_trait]
impl Executor for Succeeding {
    fn name(&self) -> &'static str {
        "succeeding"
    }

    async fn execute(&self) -> ExecutorResult<()> {
        Ok(())
    }
}

/// Fails immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct Failing;

#[async_trait::async_trait]
impl Executor for Failing {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn execute(&self) -> ExecutorResult<()> {
        Err(ExecutorError::generic("scripted failure"))
    }
}

/// Sleeps for a fixed time, then succeeds.
#[derive(Clone, Copy, Debug)]
pub struct Sleeping {
    delay: Duration,
}

impl Sleeping {
    /// Creates an executor that takes `delay` per call.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait::async_trait]
impl Executor for Sleeping {
    fn name(&self) -> &'static str {
        "sleeping"
    }

    async fn execute(&self) -> ExecutorResult<()> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Sleeps for a fixed time, then fails on every `n`-th call and succeeds otherwise.
#[derive(Debug)]
pub struct Flaky {
    every: u64,
    delay: Duration,
    calls: AtomicU64,
}

impl Flaky {
    /// Creates an executor failing the `every`-th, `2 * every`-th, ... call.
    pub fn new(every: u64, delay: Duration) -> Self {
        assert!(every > 0, "`every` must be positive");
        Self {
            every,
            delay,
            calls: AtomicU64::new(0),
        }
    }
}

#[async_trait::async_trait]
impl Executor for Flaky {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn execute(&self) -> ExecutorResult<()> {
        tokio::time::sleep(self.delay).await;
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if call % self.every == 0 {
            return Err(ExecutorError::generic(format!("scripted failure #{call}")));
        }
        Ok(())
    }
}

/// Panics after a fixed time.
#[derive(Clone, Copy, Debug)]
pub struct Panicking {
    delay: Duration,
}

impl Panicking {
    /// Creates an executor that panics after `delay`.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait::async_trait]
impl Executor for Panicking {
    fn name(&self) -> &'static str {
        "panicking"
    }

    async fn execute(&self) -> ExecutorResult<()> {
        tokio::time::sleep(self.delay).await;
        panic!("scripted panic");
    }
}

#[derive(Debug, Default)]
struct Counters {
    calls: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    finished: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Wraps another executor and records how it was called.
///
/// Use [`probe`](Self::probe) to keep a handle to the recordings after handing the executor to a
/// run.
#[derive(Debug)]
pub struct Tracked<E> {
    inner: E,
    counters: Arc<Counters>,
}

impl<E> Tracked<E> {
    /// Wraps `inner`.
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            counters: Arc::default(),
        }
    }

    /// Returns a handle to the recordings of this executor.
    pub fn probe(&self) -> Probe {
        Probe(Arc::clone(&self.counters))
    }
}

/// Marks a call as finished when dropped, including when the inner executor panics.
struct InFlight<'a>(&'a Counters);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.finished.fetch_add(1, Ordering::SeqCst);
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl<E: Executor> Executor for Tracked<E> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn execute(&self) -> ExecutorResult<()> {
        let counters = &*self.counters;
        counters.calls.fetch_add(1, Ordering::SeqCst);
        let current = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        counters.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlight(counters);

        let result = self.inner.execute().await;
        match result {
            Ok(()) => counters.successes.fetch_add(1, Ordering::SeqCst),
            Err(_) => counters.failures.fetch_add(1, Ordering::SeqCst),
        };
        result
    }
}

/// Read access to the recordings of a [`Tracked`] executor.
#[derive(Clone, Debug)]
pub struct Probe(Arc<Counters>);

impl Probe {
    /// Number of calls that were started.
    pub fn calls(&self) -> u64 {
        self.0.calls.load(Ordering::SeqCst)
    }

    /// Number of calls that returned successfully.
    pub fn successes(&self) -> u64 {
        self.0.successes.load(Ordering::SeqCst)
    }

    /// Number of calls that returned an error.
    pub fn failures(&self) -> u64 {
        self.0.failures.load(Ordering::SeqCst)
    }

    /// Number of calls that ended, by returning or by panicking.
    pub fn finished(&self) -> u64 {
        self.0.finished.load(Ordering::SeqCst)
    }

    /// Number of calls currently running.
    pub fn in_flight(&self) -> usize {
        self.0.in_flight.load(Ordering::SeqCst)
    }

    /// The highest number of calls that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.0.peak_in_flight.load(Ordering::SeqCst)
    }
}
