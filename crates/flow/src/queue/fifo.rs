//! FIFO task queue with head insertion

use std::sync::Arc;

use super::backlog::FifoBacklog;
use super::pool::{Admission, Pool, TaskHandle};

/// Bounded-concurrency task queue
///
/// Tasks pushed with [`push`](Self::push) are dequeued in insertion order;
/// tasks inserted with [`unshift`](Self::unshift) are dequeued before
/// everything already waiting, but never before tasks that are already
/// running.
///
/// Each dequeued task runs as its own tokio task. On a `current_thread`
/// runtime workers begin in dequeue order; on a multi-threaded runtime two
/// tasks dequeued in the same scheduling round may begin in either order.
///
/// Cloning a queue yields another handle to the same pool.
///
/// # Example
///
/// ```
/// use everruns_flow::TaskQueue;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let queue = TaskQueue::from_fn(2, |n: u32| async move { Ok::<_, String>(n * 2) });
///
/// let handles = queue.push_all([1, 2, 3]);
/// let mut doubled = Vec::new();
/// for handle in handles {
///     doubled.push(handle.await.unwrap());
/// }
/// assert_eq!(doubled, vec![2, 4, 6]);
/// # }
/// ```
pub struct TaskQueue<T, R, E> {
    pool: Arc<Pool<T, R, E, FifoBacklog<Admission<T, R, E>>>>,
}

queue_common!(TaskQueue, FifoBacklog::new());

impl<T, R, E> TaskQueue<T, R, E>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
    E: Clone + std::fmt::Debug + Send + 'static,
{
    /// Append a task to the tail of the backlog
    ///
    /// Must be called from within a Tokio runtime.
    pub fn push(&self, task: T) -> TaskHandle<R, E> {
        let (admission, handle) = Admission::new(task);
        self.pool.admit(|backlog| backlog.push_back(admission));
        handle
    }

    /// Append several tasks, keeping their order
    ///
    /// Must be called from within a Tokio runtime.
    pub fn push_all(&self, tasks: impl IntoIterator<Item = T>) -> Vec<TaskHandle<R, E>> {
        let (admissions, handles): (Vec<_>, Vec<_>) =
            tasks.into_iter().map(Admission::new).unzip();
        self.pool.admit(|backlog| {
            for admission in admissions {
                backlog.push_back(admission);
            }
        });
        handles
    }

    /// Insert a task at the head of the backlog
    ///
    /// Must be called from within a Tokio runtime.
    pub fn unshift(&self, task: T) -> TaskHandle<R, E> {
        let (admission, handle) = Admission::new(task);
        self.pool.admit(|backlog| backlog.push_front_all(vec![admission]));
        handle
    }

    /// Insert several tasks at the head; the batch keeps its own order
    ///
    /// Must be called from within a Tokio runtime.
    pub fn unshift_all(&self, tasks: impl IntoIterator<Item = T>) -> Vec<TaskHandle<R, E>> {
        let (admissions, handles): (Vec<_>, Vec<_>) =
            tasks.into_iter().map(Admission::new).unzip();
        self.pool.admit(|backlog| backlog.push_front_all(admissions));
        handles
    }
}
