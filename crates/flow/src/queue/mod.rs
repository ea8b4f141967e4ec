//! Bounded-concurrency task queues
//!
//! This module provides:
//! - [`TaskQueue`] - FIFO queue with head insertion (`unshift`)
//! - [`PriorityTaskQueue`] - Queue ordered by `i64` priority buckets
//! - [`Worker`] - The per-task function, as a trait or via [`worker_fn`]
//! - [`QueueEvent`] - Lifecycle events observers can subscribe to
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              TaskQueue / PriorityTaskQueue                   │
//! │  push / unshift ──► Backlog (FIFO deque | priority buckets) │
//! └─────────────────────────────────────────────────────────────┘
//!                              │  while running < concurrency
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Pool                                │
//! │  [Task 1] [Task 2] ... [Task N]   (one tokio task each)     │
//! │      │                                                       │
//! │      ├── saturated    (start filled the last slot)          │
//! │      ├── task_error   (worker failed or panicked)           │
//! │      ├── unsaturated  (finish in a full pool)               │
//! │      └── drain        (nothing running, nothing waiting)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use everruns_flow::queue::TaskQueue;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let queue = TaskQueue::from_fn(2, |url: &'static str| async move {
//!     Ok::<_, String>(url.len())
//! });
//! queue.on_drain(|| async { println!("all done") });
//!
//! let sizes = queue.push_all(["a", "bb"]);
//! for size in sizes {
//!     size.await.unwrap();
//! }
//! # }
//! ```

/// Constructors, accessors and hook registration shared by every queue type
///
/// `$queue` is a single-field struct `{ pool: Arc<Pool<..>> }`; `$backlog`
/// builds its empty backlog.
macro_rules! queue_common {
    ($queue:ident, $backlog:expr) => {
        impl<T, R, E> $queue<T, R, E>
        where
            T: Clone + Send + 'static,
            R: Send + 'static,
            E: Clone + ::std::fmt::Debug + Send + 'static,
        {
            /// Create a queue running at most `concurrency` tasks at once
            ///
            /// A concurrency of zero is raised to one.
            pub fn new<W>(worker: W, concurrency: usize) -> Self
            where
                W: $crate::queue::Worker<T, Output = R, Error = E>,
            {
                let config = $crate::queue::QueueConfig::new(concurrency.max(1));
                Self::build(::std::sync::Arc::new(worker), config)
            }

            /// Create a queue whose worker is an async closure
            pub fn from_fn<F, Fut>(concurrency: usize, f: F) -> Self
            where
                F: Fn(T) -> Fut + Send + Sync + 'static,
                Fut: ::std::future::Future<Output = Result<R, E>> + Send + 'static,
            {
                Self::new($crate::queue::worker_fn(f), concurrency)
            }

            /// Create a queue from validated configuration
            pub fn with_config<W>(
                worker: W,
                config: $crate::queue::QueueConfig,
            ) -> Result<Self, $crate::error::QueueError>
            where
                W: $crate::queue::Worker<T, Output = R, Error = E>,
            {
                config.validate()?;
                Ok(Self::build(::std::sync::Arc::new(worker), config))
            }

            fn build(
                worker: $crate::queue::pool::DynWorker<T, R, E>,
                config: $crate::queue::QueueConfig,
            ) -> Self {
                Self {
                    pool: ::std::sync::Arc::new($crate::queue::pool::Pool::new(
                        config.name,
                        config.concurrency,
                        worker,
                        $backlog,
                    )),
                }
            }

            /// Number of tasks waiting to start
            pub fn len(&self) -> usize {
                self.pool.len()
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            /// Number of tasks currently executing
            pub fn running(&self) -> usize {
                self.pool.running()
            }

            /// True when nothing is running and nothing is waiting
            pub fn idle(&self) -> bool {
                self.pool.idle()
            }

            pub fn concurrency(&self) -> usize {
                self.pool.concurrency()
            }

            pub fn name(&self) -> &str {
                self.pool.name()
            }

            pub fn stats(&self) -> $crate::queue::QueueStats {
                self.pool.stats()
            }

            /// Observe task failures with the error and the failed task
            pub fn on_task_error<F, Fut>(&self, hook: F) -> $crate::queue::HookId
            where
                F: Fn($crate::error::TaskError<E>, T) -> Fut + Send + Sync + 'static,
                Fut: ::std::future::Future<Output = ()> + Send + 'static,
            {
                self.pool.hooks().write().register_task_error(hook)
            }

            /// Observe the last free slot being taken
            pub fn on_saturated<F, Fut>(&self, hook: F) -> $crate::queue::HookId
            where
                F: Fn() -> Fut + Send + Sync + 'static,
                Fut: ::std::future::Future<Output = ()> + Send + 'static,
            {
                self.pool
                    .hooks()
                    .write()
                    .register($crate::queue::QueueEvent::Saturated, hook)
            }

            /// Observe a slot about to be freed in a full pool
            pub fn on_unsaturated<F, Fut>(&self, hook: F) -> $crate::queue::HookId
            where
                F: Fn() -> Fut + Send + Sync + 'static,
                Fut: ::std::future::Future<Output = ()> + Send + 'static,
            {
                self.pool
                    .hooks()
                    .write()
                    .register($crate::queue::QueueEvent::Unsaturated, hook)
            }

            /// Observe the running count dropping to zero
            ///
            /// Fires on every such transition, including ones where the
            /// backlog still holds tasks that start right after.
            pub fn on_drain<F, Fut>(&self, hook: F) -> $crate::queue::HookId
            where
                F: Fn() -> Fut + Send + Sync + 'static,
                Fut: ::std::future::Future<Output = ()> + Send + 'static,
            {
                self.pool
                    .hooks()
                    .write()
                    .register($crate::queue::QueueEvent::Drain, hook)
            }

            /// Unregister an observer; returns whether it was registered
            pub fn remove_hook(&self, id: $crate::queue::HookId) -> bool {
                self.pool.remove_hook(id)
            }
        }

        impl<T, R, E> Clone for $queue<T, R, E> {
            fn clone(&self) -> Self {
                Self {
                    pool: ::std::sync::Arc::clone(&self.pool),
                }
            }
        }

        impl<T, R, E> ::std::fmt::Debug for $queue<T, R, E>
        where
            T: Clone + Send + 'static,
            R: Send + 'static,
            E: Clone + ::std::fmt::Debug + Send + 'static,
        {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(stringify!($queue))
                    .field("name", &self.name())
                    .field("concurrency", &self.concurrency())
                    .field("stats", &self.stats())
                    .finish()
            }
        }
    };
}

mod backlog;
mod config;
mod fifo;
mod hooks;
mod pool;
mod priority;
mod worker;

pub use config::{QueueConfig, QueueStats};
pub use fifo::TaskQueue;
pub use hooks::{EventHook, HookId, QueueEvent, TaskErrorHook};
pub use pool::TaskHandle;
pub use priority::PriorityTaskQueue;
pub use worker::{worker_fn, Worker, WorkerFn};
