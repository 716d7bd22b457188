use anyhow::{Context, Result};
use querybench_core::Executor;

use crate::bench;
use crate::config::Config;

/// Connects to the database and executes the configured query once.
pub async fn check(config: Config) -> Result<()> {
    let executor = bench::connect(&config).await?;

    tracing::debug!(query = executor.query(), "executing query once");
    let result = executor.execute().await.context("query failed");
    executor.close().await;
    result?;

    tracing::info!("OK");
    Ok(())
}
