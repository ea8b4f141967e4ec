//! Priority task queue
//!
//! Same scheduler as [`TaskQueue`](super::TaskQueue), but waiting tasks are
//! bucketed by an `i64` priority. Lower numbers start first; ties start in
//! insertion order.

use std::sync::Arc;

use super::backlog::PriorityBacklog;
use super::pool::{Admission, Pool, TaskHandle};

/// Bounded-concurrency task queue ordered by priority
///
/// Dequeue order follows priority; see [`TaskQueue`](super::TaskQueue) for
/// how that maps onto start order on a multi-threaded runtime.
pub struct PriorityTaskQueue<T, R, E> {
    pool: Arc<Pool<T, R, E, PriorityBacklog<Admission<T, R, E>>>>,
}

queue_common!(PriorityTaskQueue, PriorityBacklog::new());

impl<T, R, E> PriorityTaskQueue<T, R, E>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
    E: Clone + std::fmt::Debug + Send + 'static,
{
    /// Add a task to the bucket for `priority`
    ///
    /// Must be called from within a Tokio runtime.
    pub fn push(&self, task: T, priority: i64) -> TaskHandle<R, E> {
        let (admission, handle) = Admission::new(task);
        self.pool.admit(|backlog| backlog.insert(priority, admission));
        handle
    }

    /// Add several tasks with the same priority, keeping their order
    ///
    /// Must be called from within a Tokio runtime.
    pub fn push_all(
        &self,
        tasks: impl IntoIterator<Item = T>,
        priority: i64,
    ) -> Vec<TaskHandle<R, E>> {
        let (admissions, handles): (Vec<_>, Vec<_>) =
            tasks.into_iter().map(Admission::new).unzip();
        self.pool.admit(|backlog| {
            for admission in admissions {
                backlog.insert(priority, admission);
            }
        });
        handles
    }
}
