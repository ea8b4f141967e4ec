//! # Async control flow
//!
//! Building blocks for coordinating async work on Tokio.
//!
//! ## Features
//!
//! - **Task queues**: Bounded worker pools with saturation, unsaturation and drain hooks
//! - **Failure isolation**: A failing or panicking task only affects its own handle
//! - **Priority scheduling**: The same pool over priority-bucketed backlogs
//! - **Waiters**: Rearmable single-shot completion signals with many listeners
//! - **Extensible joins**: `all` that accepts more work while it is pending
//! - **Retries**: Fixed-interval retry of fallible async tasks
//! - **Combinators**: Parallel, series and limited forms of map, filter, detect and friends
//!
//! ## Example
//!
//! ```
//! use everruns_flow::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let queue = TaskQueue::from_fn(4, |n: u64| async move {
//!     retry(RetryPolicy::new(3), || async move { Ok::<_, String>(n * n) }).await
//! });
//!
//! let handles = queue.push_all(1..=3);
//! let join = all(handles);
//! assert_eq!(join.wait().await, Ok(vec![1, 4, 9]));
//! # }
//! ```

pub mod all;
pub mod collection;
pub mod control;
pub mod error;
pub mod queue;
pub mod reliability;
pub mod tick;
pub mod waiter;

/// Prelude for common imports
pub mod prelude {
    pub use crate::all::{all, All, AllStatus};
    pub use crate::error::{AllError, QueueError, TaskError, WaitError};
    pub use crate::queue::{
        worker_fn, HookId, PriorityTaskQueue, QueueConfig, QueueEvent, QueueStats, TaskHandle,
        TaskQueue, Worker,
    };
    pub use crate::reliability::{retry, RetryPolicy};
    pub use crate::waiter::Waiter;
}

// Re-export key types at crate root
pub use all::{all, All, AllStatus};
pub use error::{AllError, FatalError, QueueError, TaskError, WaitError};
pub use queue::{
    worker_fn, HookId, PriorityTaskQueue, QueueConfig, QueueEvent, QueueStats, TaskHandle,
    TaskQueue, Worker, WorkerFn,
};
pub use reliability::{retry, RetryPolicy};
pub use waiter::{WaitFuture, Waiter};
