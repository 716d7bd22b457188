//! Bounded-concurrency load generator for PostgreSQL.
//!
//! Repeatedly executes one SQL statement for a fixed duration with a capped number of statements
//! in flight, then prints the number of successful statements and the throughput.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

use anyhow::Result;

fn main() -> Result<()> {
    querybench::cli::execute()
}
