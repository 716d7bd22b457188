use std::num::NonZeroUsize;
use std::time::Duration;

use querybench_core::{BoxedExecutor, Run, RunConfig};
use querybench_test::executors::{Failing, Flaky, Panicking, Sleeping, Succeeding, Tracked};
use tokio_util::sync::CancellationToken;

fn config(duration: Duration, concurrency: usize) -> RunConfig {
    RunConfig {
        duration,
        concurrency: NonZeroUsize::new(concurrency).unwrap(),
    }
}

#[tokio::test]
async fn instant_successes_single_permit() {
    querybench_test::tracing::init();

    let executor = Tracked::new(Succeeding);
    let probe = executor.probe();
    let run = Run::new(config(Duration::from_millis(100), 1), executor);
    let pool = run.permit_pool().clone();

    let report = run.run().await;

    assert!(report.completed > 0);
    assert_eq!(report.completed, probe.successes());
    assert!(report.elapsed >= Duration::from_millis(100));
    assert!(report.elapsed < Duration::from_secs(5));

    let expected = report.completed as f64 / report.elapsed.as_secs_f64();
    assert!((report.throughput() - expected).abs() < 1e-6);

    assert_eq!(probe.peak_in_flight(), 1);
    assert_eq!(pool.stats().peak_in_flight, 1);
}

#[tokio::test]
async fn always_failing_counts_nothing() {
    querybench_test::tracing::init();

    let executor = Tracked::new(Failing);
    let probe = executor.probe();
    let run = Run::new(config(Duration::from_millis(50), 10), executor);
    let pool = run.permit_pool().clone();

    let report = run.run().await;

    assert_eq!(report.completed, 0);
    assert_eq!(report.throughput(), 0.0);
    assert!(probe.failures() > 0);

    let stats = pool.stats();
    assert_eq!(stats.acquired, probe.calls());
    assert_eq!(stats.released, stats.acquired);
    assert_eq!(pool.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn concurrency_ceiling_holds() {
    for concurrency in [1, 2, 7, 32] {
        let executor = Tracked::new(Flaky::new(3, Duration::from_millis(3)));
        let probe = executor.probe();
        let run = Run::new(config(Duration::from_millis(200), concurrency), executor);
        let pool = run.permit_pool().clone();

        let report = run.run().await;

        assert_eq!(probe.peak_in_flight(), concurrency);
        assert!(pool.stats().peak_in_flight <= concurrency);
        assert_eq!(report.completed, probe.successes());
        assert_eq!(probe.calls(), probe.successes() + probe.failures());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn counts_are_exact_across_threads() {
    let executor = Tracked::new(Flaky::new(5, Duration::from_micros(200)));
    let probe = executor.probe();
    let run = Run::new(config(Duration::from_millis(200), 64), executor);
    let pool = run.permit_pool().clone();

    let report = run.run().await;

    assert!(report.completed > 0);
    assert_eq!(report.completed, probe.successes());
    assert_eq!(probe.calls(), probe.finished());
    assert_eq!(pool.stats().acquired, probe.calls());
    assert_eq!(pool.stats().released, probe.calls());
    assert!(probe.peak_in_flight() <= 64);
}

#[tokio::test(start_paused = true)]
async fn drains_in_flight_operations() {
    let executor = Tracked::new(Sleeping::new(Duration::from_millis(500)));
    let probe = executor.probe();
    let run = Run::new(config(Duration::from_millis(50), 4), executor);

    let report = run.run().await;

    // Four operations were admitted right away and all of them finished before the report.
    assert_eq!(probe.calls(), 4);
    assert_eq!(probe.finished(), 4);
    assert_eq!(probe.in_flight(), 0);
    assert_eq!(report.completed, 4);
    assert!(report.elapsed >= Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn panicking_operations_release_permits() {
    let executor = Tracked::new(Panicking::new(Duration::from_millis(10)));
    let probe = executor.probe();
    let run = Run::new(config(Duration::from_millis(100), 3), executor);
    let pool = run.permit_pool().clone();

    let report = run.run().await;

    assert_eq!(report.completed, 0);
    assert!(probe.calls() > 3);
    assert_eq!(probe.finished(), probe.calls());

    let stats = pool.stats();
    assert_eq!(stats.acquired, probe.calls());
    assert_eq!(stats.released, stats.acquired);
}

#[tokio::test(start_paused = true)]
async fn shutdown_ends_run_early() {
    let shutdown = CancellationToken::new();
    let executor = Tracked::new(Sleeping::new(Duration::from_millis(20)));
    let probe = executor.probe();
    let run = Run::new(config(Duration::from_secs(3600), 5), executor)
        .with_shutdown(shutdown.clone());

    let handle = tokio::spawn(run.run());
    tokio::time::sleep(Duration::from_millis(110)).await;
    shutdown.cancel();
    shutdown.cancel();

    let report = handle.await.unwrap();

    assert!(report.elapsed < Duration::from_secs(1));
    assert_eq!(report.completed, probe.calls());
    assert_eq!(probe.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn zero_duration_reports_zero_throughput() {
    let executor = Tracked::new(Succeeding);
    let probe = executor.probe();
    let run = Run::new(config(Duration::ZERO, 1), executor);

    let report = run.run().await;

    assert_eq!(probe.calls(), 0);
    assert_eq!(report.completed, 0);
    assert_eq!(report.throughput(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn independent_runs_do_not_interfere() {
    let slow = Tracked::new(Sleeping::new(Duration::from_millis(10)));
    let slow_probe = slow.probe();
    let failing = Tracked::new(Flaky::new(1, Duration::from_millis(1)));
    let failing_probe = failing.probe();

    let slow_run = Run::new(config(Duration::from_millis(100), 2), slow);
    let failing_run = Run::new(config(Duration::from_millis(30), 1), failing);

    let (slow_report, failing_report) = tokio::join!(slow_run.run(), failing_run.run());

    assert_eq!(slow_report.completed, 20);
    assert_eq!(slow_report.completed, slow_probe.successes());
    assert_eq!(failing_report.completed, 0);
    assert!(failing_probe.failures() > 0);
    assert_eq!(failing_probe.successes(), 0);
}

#[tokio::test(start_paused = true)]
async fn runs_type_erased_executors() {
    let executor = Tracked::new(Sleeping::new(Duration::from_millis(10)));
    let probe = executor.probe();
    let boxed: BoxedExecutor = Box::new(executor);

    let run = Run::new(config(Duration::from_millis(50), 3), boxed);
    assert_eq!(run.config().concurrency.get(), 3);

    let report = run.run().await;

    assert_eq!(report.completed, 15);
    assert_eq!(report.completed, probe.successes());
}
