//! Executors for the backends querybench can load.

mod postgres;

pub use postgres::{PostgresExecutor, connect, validate_dsn};
