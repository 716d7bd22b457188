//! The dispatch loop driving a run.
//!
//! A [`Run`] moves through the phases `Init → Dispatching → Draining → Done`. While
//! dispatching, it admits one operation per acquired permit and spawns it onto a task set without
//! waiting for it. Once the clock fires, admission stops and every spawned task is joined before
//! the [`Report`] is produced.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::admission::PermitPool;
use crate::clock::RunClock;
use crate::counter::CompletionCounter;
use crate::executor::Executor;
use crate::report::Report;

/// Parameters of a run that are independent of the operation itself.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RunConfig {
    /// How long new operations are admitted.
    pub duration: Duration,
    /// Maximum number of operations in flight at any time.
    pub concurrency: NonZeroUsize,
}

/// The lifecycle of a [`Run`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Phase {
    /// Clock and counter are set up, nothing has been admitted yet.
    Init,
    /// Operations are being admitted as permits become available.
    Dispatching,
    /// Admission has stopped, in-flight operations are finishing.
    Draining,
    /// All operations have been joined.
    Done,
}

/// A single load run against one [`Executor`].
///
/// Each run owns its own permits, clock and counter, so several runs can execute in the same
/// process without affecting each other.
#[derive(Debug)]
pub struct Run<E> {
    config: RunConfig,
    executor: Arc<E>,
    pool: PermitPool,
    shutdown: CancellationToken,
    phase: Phase,
}

impl<E: Executor> Run<E> {
    /// Creates a new run with the given configuration and executor.
    pub fn new(config: RunConfig, executor: E) -> Self {
        Self {
            config,
            executor: Arc::new(executor),
            pool: PermitPool::new(config.concurrency),
            shutdown: CancellationToken::new(),
            phase: Phase::Init,
        }
    }

    /// Stops admission early once `shutdown` is cancelled.
    ///
    /// In-flight operations still drain and a report is produced as usual.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Returns the configuration of this run.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Returns a handle to the permits of this run, for inspection.
    pub fn permit_pool(&self) -> &PermitPool {
        &self.pool
    }

    /// Executes the run to completion.
    ///
    /// This always produces a report, even if every operation failed.
    pub async fn run(mut self) -> Report {
        let counter = Arc::new(CompletionCounter::new());
        let clock = RunClock::start(self.config.duration, &self.shutdown);
        let mut tasks = JoinSet::new();

        tracing::info!(
            executor = self.executor.name(),
            duration = ?self.config.duration,
            concurrency = self.config.concurrency.get(),
            "starting run"
        );

        self.transition(Phase::Dispatching);
        while !clock.is_fired() {
            let Ok(permit) = self.pool.acquire(&clock).await else {
                break;
            };

            let executor = Arc::clone(&self.executor);
            let counter = Arc::clone(&counter);
            tasks.spawn(async move {
                match executor.execute().await {
                    Ok(()) => counter.increment(),
                    Err(err) => {
                        tracing::error!(
                            error = &err as &dyn std::error::Error,
                            executor = executor.name(),
                            "execution error"
                        );
                    }
                }
                drop(permit);
            });

            // Reap finished tasks so the set does not grow over long runs.
            while let Some(result) = tasks.try_join_next() {
                reap(result);
            }
        }

        self.transition(Phase::Draining);
        tracing::debug!(in_flight = tasks.len(), "waiting for in-flight operations");
        while let Some(result) = tasks.join_next().await {
            reap(result);
        }
        // Every task owned a permit, so all of them are back once the set is empty.
        self.pool.wait_all().await;

        self.transition(Phase::Done);
        let report = Report {
            completed: counter.get(),
            elapsed: clock.elapsed(),
        };

        let stats = self.pool.stats();
        tracing::info!(
            completed = report.completed,
            admitted = stats.acquired,
            elapsed = ?report.elapsed,
            "run finished"
        );

        report
    }

    fn transition(&mut self, phase: Phase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "run phase changed");
        self.phase = phase;
    }
}

fn reap(result: Result<(), JoinError>) {
    if let Err(err) = result {
        tracing::error!(
            error = &err as &dyn std::error::Error,
            "operation task terminated abnormally"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use crate::error::{ExecutorError, ExecutorResult};

    use super::*;

    #[derive(Debug, Default)]
    struct Alternating(AtomicU64);

    #[async_trait::async_trait]
    impl Executor for Alternating {
        fn name(&self) -> &'static str {
            "alternating"
        }

        async fn execute(&self) -> ExecutorResult<()> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            match self.0.fetch_add(1, Ordering::Relaxed) % 2 {
                0 => Ok(()),
                _ => Err(ExecutorError::generic("odd call")),
            }
        }
    }

    fn config(duration: Duration, concurrency: usize) -> RunConfig {
        RunConfig {
            duration,
            concurrency: NonZeroUsize::new(concurrency).unwrap(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn counts_only_successes() {
        let run = Run::new(config(Duration::from_millis(100), 1), Alternating::default());
        let pool = run.permit_pool().clone();
        let executor = Arc::clone(&run.executor);

        let report = run.run().await;

        let calls = executor.0.load(Ordering::Relaxed);
        assert_eq!(calls, 10);
        assert_eq!(report.completed, 5);
        assert!(report.elapsed >= Duration::from_millis(100));
        assert!(report.elapsed < Duration::from_millis(110));
        assert!((report.throughput() - 5.0 / report.elapsed.as_secs_f64()).abs() < 1e-9);

        let stats = pool.stats();
        assert_eq!(stats.acquired, calls);
        assert_eq!(stats.released, calls);
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_admits_nothing() {
        let run = Run::new(config(Duration::ZERO, 1), Alternating::default());
        let pool = run.permit_pool().clone();

        let report = run.run().await;

        assert_eq!(report.completed, 0);
        assert_eq!(report.throughput(), 0.0);
        assert_eq!(pool.stats().acquired, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_admission() {
        let shutdown = CancellationToken::new();
        let run = Run::new(config(Duration::from_secs(3600), 2), Alternating::default())
            .with_shutdown(shutdown.clone());
        let executor = Arc::clone(&run.executor);

        let handle = tokio::spawn(run.run());
        tokio::time::sleep(Duration::from_millis(55)).await;
        shutdown.cancel();

        let report = handle.await.unwrap();

        // Two operations every 10ms, plus the pair that was in flight at cancellation.
        assert_eq!(executor.0.load(Ordering::Relaxed), 12);
        assert_eq!(report.completed, 6);
        assert!(report.elapsed >= Duration::from_millis(60));
        assert!(report.elapsed < Duration::from_millis(70));
    }
}
