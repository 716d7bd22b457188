//! Runs the configured query against the database and prints the throughput.

use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use querybench_core::backend::{self, PostgresExecutor};
use querybench_core::{Report, Run, RunConfig};
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;
use yansi::Paint;

use crate::config::Config;

/// Connects to the database, runs the benchmark, and prints the report.
///
/// Connection failures are returned before any query is admitted. Once the run has started it
/// always completes with a report; SIGINT or SIGTERM end it early.
pub async fn bench(config: Config, progress: bool) -> Result<()> {
    let executor = connect(&config).await?;

    let shutdown = CancellationToken::new();
    listen_for_shutdown(shutdown.clone());

    let bar = if progress {
        ProgressBar::new_spinner()
            .with_style(ProgressStyle::with_template("{spinner} {msg} {elapsed}")?)
            .with_message("Running benchmark:")
    } else {
        ProgressBar::hidden()
    };
    bar.enable_steady_tick(Duration::from_millis(100));

    let run_config = RunConfig {
        duration: config.duration,
        concurrency: config.concurrency,
    };
    let report = Run::new(run_config, executor.clone())
        .with_shutdown(shutdown)
        .run()
        .await;

    bar.finish_and_clear();
    executor.close().await;

    print_report(&report);
    Ok(())
}

/// Opens the connection pool, sized to the concurrency ceiling.
pub(crate) async fn connect(config: &Config) -> Result<PostgresExecutor> {
    let max_connections = u32::try_from(config.concurrency.get()).unwrap_or(u32::MAX);

    tracing::debug!(max_connections, "connecting to database");
    let pool = backend::connect(
        config.dsn.expose_secret(),
        max_connections,
        config.connect_timeout,
    )
    .await
    .context("failed to connect to database")?;

    Ok(PostgresExecutor::new(pool, config.query.as_str()))
}

/// Cancels `shutdown` on the first termination signal.
fn listen_for_shutdown(shutdown: CancellationToken) {
    tokio::spawn(async move {
        elegant_departure::get_shutdown_guard().wait().await;
        tracing::info!("shutdown requested, draining in-flight queries");
        shutdown.cancel();
    });

    tokio::spawn(
        elegant_departure::tokio::depart()
            .on_termination()
            .on_sigint(),
    );
}

fn print_report(report: &Report) {
    println!("{}", format_report(report));
}

fn format_report(report: &Report) -> String {
    format!(
        "{} {}\n{} {:.2?}\n{} {:.2}",
        "Total Requests:".bold(),
        report.completed.bold(),
        "Duration:".bold(),
        report.elapsed,
        "RPS:".bold(),
        report.throughput().bold().green()
    )
}
