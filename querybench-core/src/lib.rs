//! The core load loop of querybench.
//!
//! A [`Run`] repeatedly issues one fixed operation through an [`Executor`] for a configured
//! wall-clock duration, never allowing more than a configured number of operations in flight, and
//! produces a [`Report`] with the total number of successful operations and the throughput.
//!
//! The pieces are deliberately small and composable:
//!
//! - [`PermitPool`] bounds the number of in-flight operations,
//! - [`RunClock`] decides when admission stops, either on expiry or on external cancellation,
//! - [`CompletionCounter`] aggregates successes across tasks,
//! - [`Run`] ties them together and drains all tasks before reporting.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod admission;
pub mod backend;
pub mod clock;
pub mod counter;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod report;

pub use admission::{Cancelled, Permit, PermitPool, PoolStats};
pub use clock::RunClock;
pub use counter::CompletionCounter;
pub use dispatch::{Run, RunConfig};
pub use error::{ExecutorError, ExecutorResult};
pub use executor::{BoxedExecutor, Executor};
pub use report::Report;
