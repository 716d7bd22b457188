//! Errors reported by executors.

use thiserror::Error;

/// Errors that can occur while executing a single operation.
///
/// None of these abort a run. The dispatch loop logs them and moves on.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// An error returned by the database, or by the driver while talking to it.
    ///
    /// This covers connection loss and pool timeouts as well as statement errors.
    #[error("database error: {context}")]
    Database {
        /// What the executor was doing when the error occurred.
        context: String,
        /// The underlying driver error.
        #[source]
        cause: sqlx::Error,
    },

    /// Any other error stemming from an executor.
    #[error("execution error: {context}")]
    Generic {
        /// What the executor was doing when the error occurred.
        context: String,
        /// The underlying error, if any.
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ExecutorError {
    /// Creates a [`Generic`](Self::Generic) error without an underlying cause.
    pub fn generic(context: impl Into<String>) -> Self {
        Self::Generic {
            context: context.into(),
            cause: None,
        }
    }
}

/// Result type for executor operations.
pub type ExecutorResult<T> = Result<T, ExecutorError>;
