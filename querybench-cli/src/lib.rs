//! The querybench command line tool.
//!
//! This builds on top of [`querybench_core`], wiring its load loop to a PostgreSQL connection
//! pool, layered configuration, logging and signal handling.

pub mod bench;
pub mod check;
pub mod cli;
pub mod config;
pub mod observability;
