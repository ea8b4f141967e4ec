//! Extensible join over a growing set of operations
//!
//! Unlike `futures::future::try_join_all`, an [`All`] can keep accepting
//! operations after it was created, right up until every tracked operation
//! has resolved. Results come back in push order, not completion order.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{panic_message, AllError, WaitError};
use crate::waiter::{WaitFuture, Waiter};

/// Completion state of an [`All`]
///
/// Transitions are monotonic: once `Resolved` or `Rejected`, the state never
/// changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllStatus {
    /// At least one tracked operation is still running, or nothing was pushed
    Pending,
    /// Every tracked operation resolved
    Resolved,
    /// A tracked operation failed or panicked
    Rejected,
}

impl fmt::Display for AllStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Resolved => write!(f, "resolved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

struct AllState<T> {
    results: Vec<Option<T>>,
    tracked: usize,
    resolved: usize,
    status: AllStatus,
}

struct AllInner<T, E> {
    state: Mutex<AllState<T>>,
    outcome: Waiter<Vec<T>, E>,
}

impl<T, E> AllInner<T, E>
where
    T: Clone,
    E: Clone,
{
    fn complete(&self, index: usize, outcome: Result<T, WaitError<E>>) {
        let mut state = self.state.lock();
        if state.status != AllStatus::Pending {
            // Outcomes after rejection are discarded
            return;
        }

        match outcome {
            Ok(value) => {
                state.results[index] = Some(value);
                state.resolved += 1;
                if state.resolved == state.tracked {
                    state.status = AllStatus::Resolved;
                    let results = std::mem::take(&mut state.results)
                        .into_iter()
                        .flatten()
                        .collect();
                    debug!(tracked = state.tracked, "all operations resolved");
                    self.outcome.settle(Ok(results));
                }
            }
            Err(err) => {
                state.status = AllStatus::Rejected;
                debug!(index, "operation rejected, discarding further outcomes");
                self.outcome.settle(Err(err));
            }
        }
    }
}

/// A join that accepts new operations while pending
///
/// Cloning an `All` yields another handle to the same join.
///
/// # Example
///
/// ```
/// use everruns_flow::all;
/// use futures::future::ready;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let join = all::<u32, (), _, _>(vec![ready(Ok(1)), ready(Ok(2))]);
/// join.push(ready(Ok(3))).unwrap();
///
/// assert_eq!(join.wait().await, Ok(vec![1, 2, 3]));
/// # }
/// ```
pub struct All<T, E> {
    inner: Arc<AllInner<T, E>>,
}

impl<T, E> All<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create an empty join
    ///
    /// An empty join stays pending until at least one operation is pushed
    /// and every pushed operation resolves.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(AllInner {
                state: Mutex::new(AllState {
                    results: Vec::new(),
                    tracked: 0,
                    resolved: 0,
                    status: AllStatus::Pending,
                }),
                outcome: Waiter::new(),
            }),
        }
    }

    /// Track another operation
    ///
    /// Must be called from within a Tokio runtime. Pushing after the join
    /// rejected is accepted and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AllError::AlreadyResolved`] if every tracked operation
    /// already resolved.
    pub fn push<F>(&self, operation: F) -> Result<(), AllError>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.push_all(std::iter::once(operation))
    }

    /// Track a batch of operations
    ///
    /// Every slot in the batch is reserved before any operation starts, so
    /// an early finisher cannot resolve the join halfway through the batch.
    ///
    /// # Errors
    ///
    /// Same as [`All::push`].
    pub fn push_all<I, F>(&self, operations: I) -> Result<(), AllError>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let operations: Vec<F> = operations.into_iter().collect();
        let first = {
            let mut state = self.inner.state.lock();
            match state.status {
                AllStatus::Resolved => return Err(AllError::AlreadyResolved),
                AllStatus::Rejected => {
                    debug!(
                        ignored = operations.len(),
                        "ignoring operations pushed after rejection"
                    );
                    return Ok(());
                }
                AllStatus::Pending => {}
            }
            let first = state.tracked;
            state.results.extend(operations.iter().map(|_| None));
            state.tracked += operations.len();
            first
        };

        for (offset, operation) in operations.into_iter().enumerate() {
            let inner = Arc::clone(&self.inner);
            let index = first + offset;
            tokio::spawn(async move {
                let outcome = match AssertUnwindSafe(operation).catch_unwind().await {
                    Ok(result) => result.map_err(WaitError::Rejected),
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        warn!(index, panic = %message, "tracked operation panicked");
                        Err(WaitError::Panicked(message))
                    }
                };
                inner.complete(index, outcome);
            });
        }
        Ok(())
    }

    /// Track a plain value as an already-resolved operation
    ///
    /// # Errors
    ///
    /// Same as [`All::push`].
    pub fn push_value(&self, value: T) -> Result<(), AllError> {
        self.push(futures::future::ready(Ok(value)))
    }

    /// Number of operations tracked so far
    pub fn len(&self) -> usize {
        self.inner.state.lock().tracked
    }

    /// Check whether nothing was pushed yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current completion state
    pub fn status(&self) -> AllStatus {
        self.inner.state.lock().status
    }

    /// Wait for every tracked operation, or for the first failure
    ///
    /// A panicking operation rejects the join with [`WaitError::Panicked`].
    pub fn wait(&self) -> WaitFuture<Vec<T>, E> {
        self.inner.outcome.wait()
    }
}

impl<T, E> Default for All<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for All<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for All<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("All")
            .field("tracked", &state.tracked)
            .field("resolved", &state.resolved)
            .field("status", &state.status)
            .finish()
    }
}

/// Create a join pre-seeded with an initial batch of operations
///
/// Must be called from within a Tokio runtime.
pub fn all<T, E, I, F>(operations: I) -> All<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>> + Send + 'static,
{
    let join = All::new();
    // A fresh join is pending, so pushing cannot fail
    let _ = join.push_all(operations);
    join
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use futures::future::BoxFuture;

    use super::*;

    async fn after(ms: u64, value: u32) -> Result<u32, &'static str> {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(value)
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_follow_push_order() {
        let join = all(vec![
            Box::pin(after(2, 1)),
            Box::pin(after(6, 2)),
            Box::pin(after(4, 3)),
        ]);

        assert_eq!(join.wait().await, Ok(vec![1, 2, 3]));
        assert_eq!(join.status(), AllStatus::Resolved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_while_pending() {
        let join = all(vec![Box::pin(after(2, 1)), Box::pin(after(16, 2))]);

        tokio::time::sleep(Duration::from_millis(10)).await;
        join.push(after(18, 3)).unwrap();

        assert_eq!(join.wait().await, Ok(vec![1, 2, 3]));
        assert_eq!(join.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_join_waits_for_first_push() {
        let join: All<u32, &str> = All::new();
        let listener = join.wait();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(join.status(), AllStatus::Pending);
        join.push(after(2, 1)).unwrap();

        assert_eq!(listener.await, Ok(vec![1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_rejection_wins() {
        let join = all(vec![
            Box::pin(after(2, 1)) as BoxFuture<'static, Result<u32, &'static str>>,
            Box::pin(after(6, 2)) as BoxFuture<'static, Result<u32, &'static str>>,
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(4)).await;
                Err("err")
            }) as BoxFuture<'static, Result<u32, &'static str>>,
        ]);

        assert_eq!(join.wait().await, Err(WaitError::Rejected("err")));

        // Let the slower operation finish; the outcome must not change
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(join.status(), AllStatus::Rejected);
        assert_eq!(join.wait().await, Err(WaitError::Rejected("err")));
    }

    async fn explode() -> Result<u32, &'static str> {
        panic!("operation bug")
    }

    #[tokio::test]
    async fn test_panicking_operation_rejects_join() {
        let join = all(vec![
            Box::pin(async { Ok::<u32, &'static str>(1) }) as BoxFuture<'static, Result<u32, &'static str>>,
            Box::pin(explode()) as BoxFuture<'static, Result<u32, &'static str>>,
        ]);

        let outcome = tokio::time::timeout(Duration::from_secs(2), join.wait())
            .await
            .expect("join settled");
        assert_eq!(
            outcome,
            Err(WaitError::Panicked("operation bug".to_string()))
        );
        assert_eq!(join.status(), AllStatus::Rejected);

        // Later pushes are ignored like after any other rejection
        join.push_value(2).unwrap();
        assert_eq!(join.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_batch_is_tracked_before_it_starts() {
        let mut batch: Vec<BoxFuture<'static, Result<u32, &'static str>>> = (0..32)
            .map(|n: u32| Box::pin(futures::future::ready(Ok(n))) as BoxFuture<'static, _>)
            .collect();
        batch.push(Box::pin(after(5, 32)));

        let join = all(batch);
        let results = join.wait().await.unwrap();
        assert_eq!(results, (0..=32).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_push_after_resolution_is_usage_error() {
        let join: All<u32, ()> = All::new();
        join.push_value(1).unwrap();
        assert_eq!(join.wait().await, Ok(vec![1]));

        assert_eq!(join.push_value(2), Err(AllError::AlreadyResolved));
    }

    #[tokio::test]
    async fn test_push_after_rejection_is_ignored() {
        let join: All<u32, &str> = All::new();
        join.push(async { Err("first") }).unwrap();
        assert_eq!(join.wait().await, Err(WaitError::Rejected("first")));

        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        join.push(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("second")
        })
        .unwrap();

        tokio::task::yield_now().await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(join.len(), 1);
        assert_eq!(join.wait().await, Err(WaitError::Rejected("first")));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(AllStatus::Pending.to_string(), "pending");
        assert_eq!(AllStatus::Resolved.to_string(), "resolved");
        assert_eq!(AllStatus::Rejected.to_string(), "rejected");
    }
}
