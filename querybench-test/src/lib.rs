//! Test utilities for querybench.
//!
//! This crate provides executors with scripted behavior and a logger for tests. See the modules
//! for all available utilities.

pub mod executors;
pub mod tracing;
