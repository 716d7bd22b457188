//! The seam between the load loop and the system under test.

use std::fmt::Debug;

use crate::error::ExecutorResult;

/// A type-erased [`Executor`] instance.
pub type BoxedExecutor = Box<dyn Executor>;

/// Performs one unit of work against the target resource.
///
/// Implementations must be safe to call from any number of tasks at once. They must not keep
/// any mutable state between invocations other than the backend resource itself, and they never
/// see permits or counters: bookkeeping is done by the [`Run`](crate::Run).
#[async_trait::async_trait]
pub trait Executor: Debug + Send + Sync + 'static {
    /// The executor name, used for diagnostics.
    fn name(&self) -> &'static str;

    /// Executes the operation exactly once.
    async fn execute(&self) -> ExecutorResult<()>;
}

#[async_trait::async_trait]
impl<E: Executor + ?Sized> Executor for Box<E> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn execute(&self) -> ExecutorResult<()> {
        (**self).execute().await
    }
}
