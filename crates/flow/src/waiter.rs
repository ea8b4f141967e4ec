//! Rearmable single-shot completion signal
//!
//! A [`Waiter`] owns one pending slot at a time. Settling it wakes every
//! listener attached to that slot. Settling again after the slot already
//! settled rearms a fresh slot first, so earlier listeners keep the outcome
//! they saw and later listeners observe the new one.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};
use parking_lot::Mutex;

use crate::error::WaitError;

type SlotReceiver<T, E> = Shared<oneshot::Receiver<Result<T, WaitError<E>>>>;

struct Slot<T, E> {
    tx: Option<oneshot::Sender<Result<T, WaitError<E>>>>,
    rx: SlotReceiver<T, E>,
}

impl<T: Clone, E: Clone> Slot<T, E> {
    fn pending() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            tx: Some(tx),
            rx: rx.shared(),
        }
    }

    fn is_settled(&self) -> bool {
        self.tx.is_none()
    }
}

/// A resettable promise that can be awaited by many listeners
///
/// Cloning a `Waiter` yields another handle to the same slot.
///
/// # Example
///
/// ```
/// use everruns_flow::Waiter;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let waiter: Waiter<&str, ()> = Waiter::new();
/// let first = waiter.wait();
///
/// waiter.resolve("foo");
/// waiter.resolve("baz"); // rearms, then settles the new slot
///
/// assert_eq!(first.await, Ok("foo"));
/// assert_eq!(waiter.wait().await, Ok("baz"));
/// # }
/// ```
pub struct Waiter<T, E> {
    slot: Arc<Mutex<Slot<T, E>>>,
}

impl<T, E> Waiter<T, E>
where
    T: Clone,
    E: Clone,
{
    /// Create a waiter with a fresh pending slot
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::pending())),
        }
    }

    /// Settle the current slot with a value
    ///
    /// If the slot already settled, a new slot is armed and settled instead.
    pub fn resolve(&self, value: T) -> &Self {
        self.settle(Ok(value))
    }

    /// Settle the current slot with an error
    ///
    /// If the slot already settled, a new slot is armed and settled instead.
    pub fn reject(&self, error: E) -> &Self {
        self.settle(Err(WaitError::Rejected(error)))
    }

    /// Arm a fresh slot if the current one has settled; no-op while pending
    pub fn reset(&self) -> &Self {
        let mut slot = self.slot.lock();
        if slot.is_settled() {
            *slot = Slot::pending();
        }
        self
    }

    /// Check whether the current slot has settled
    pub fn is_settled(&self) -> bool {
        self.slot.lock().is_settled()
    }

    /// Attach a listener to the current slot
    pub fn wait(&self) -> WaitFuture<T, E> {
        WaitFuture {
            rx: self.slot.lock().rx.clone(),
        }
    }

    /// Settle the current slot with any listener outcome, rearming first if
    /// it already settled
    pub(crate) fn settle(&self, outcome: Result<T, WaitError<E>>) -> &Self {
        let mut slot = self.slot.lock();
        if slot.is_settled() {
            *slot = Slot::pending();
        }
        if let Some(tx) = slot.tx.take() {
            // The slot keeps its own receiver alive, so this cannot fail
            let _ = tx.send(outcome);
        }
        self
    }
}

impl<T: Clone, E: Clone> Default for Waiter<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for Waiter<T, E> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T, E> fmt::Debug for Waiter<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter")
            .field("settled", &self.slot.lock().tx.is_none())
            .finish()
    }
}

/// Listener bound to one slot of a [`Waiter`]
#[must_use = "futures do nothing unless awaited"]
pub struct WaitFuture<T, E> {
    rx: SlotReceiver<T, E>,
}

impl<T: Clone, E: Clone> Future for WaitFuture<T, E> {
    type Output = Result<T, WaitError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.rx.poll_unpin(cx).map(|settled| match settled {
            Ok(outcome) => outcome,
            Err(oneshot::Canceled) => Err(WaitError::Abandoned),
        })
    }
}

impl<T, E> fmt::Debug for WaitFuture<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitFuture").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(
        outcomes: Vec<Result<&'static str, WaitError<&'static str>>>,
    ) -> (Vec<&'static str>, Vec<&'static str>) {
        let mut results = Vec::new();
        let mut errors = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(value) => results.push(value),
                Err(WaitError::Rejected(err)) => errors.push(err),
                Err(other) => panic!("unexpected listener outcome: {}", other),
            }
        }
        (results, errors)
    }

    #[tokio::test]
    async fn test_resolve_reaches_all_listeners() {
        let waiter: Waiter<&str, &str> = Waiter::new();
        let a = waiter.wait();
        let b = waiter.wait();

        waiter.resolve("foo");
        tokio::task::yield_now().await;
        let c = waiter.wait();

        let (results, errors) = collect(vec![a.await, b.await, c.await]);
        assert_eq!(results, vec!["foo", "foo", "foo"]);
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_reject_reaches_all_listeners() {
        let waiter: Waiter<&str, &str> = Waiter::new();
        let a = waiter.wait();
        let b = waiter.wait();

        waiter.reject("foo");
        let c = waiter.wait();

        let (results, errors) = collect(vec![a.await, b.await, c.await]);
        assert!(results.is_empty());
        assert_eq!(errors, vec!["foo", "foo", "foo"]);
    }

    #[tokio::test]
    async fn test_reset_is_noop_while_pending() {
        let waiter: Waiter<&str, &str> = Waiter::new();
        let a = waiter.wait();
        waiter.reset();
        let b = waiter.wait();

        waiter.resolve("foo");
        let c = waiter.wait();

        let (results, errors) = collect(vec![a.await, b.await, c.await]);
        assert_eq!(results, vec!["foo", "foo", "foo"]);
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_settling_again_rearms_first() {
        let waiter: Waiter<&str, &str> = Waiter::new();
        waiter.resolve("foo");
        let a = waiter.wait();
        waiter.reject("bar");
        let b = waiter.wait();
        waiter.resolve("baz");
        let c = waiter.wait();

        let (results, errors) = collect(vec![a.await, b.await, c.await]);
        assert_eq!(results, vec!["foo", "baz"]);
        assert_eq!(errors, vec!["bar"]);
    }

    #[tokio::test]
    async fn test_reset_after_settle_arms_new_slot() {
        let waiter: Waiter<u32, ()> = Waiter::new();
        waiter.resolve(1);
        assert!(waiter.is_settled());

        waiter.reset();
        assert!(!waiter.is_settled());

        let listener = waiter.wait();
        waiter.resolve(2);
        assert_eq!(listener.await, Ok(2));
    }

    #[tokio::test]
    async fn test_clones_share_the_slot() {
        let waiter: Waiter<u32, ()> = Waiter::new();
        let listener = waiter.wait();

        let producer = waiter.clone();
        tokio::spawn(async move {
            producer.resolve(42);
        });

        assert_eq!(listener.await, Ok(42));
    }

    #[tokio::test]
    async fn test_dropped_waiter_abandons_listeners() {
        let waiter: Waiter<u32, ()> = Waiter::new();
        let listener = waiter.wait();
        drop(waiter);

        assert_eq!(listener.await, Err(WaitError::Abandoned));
    }

    #[test]
    fn test_unobserved_rejection_is_dropped() {
        let waiter: Waiter<u32, String> = Waiter::new();
        waiter.reject("nobody listens".to_string());
        drop(waiter);
    }
}
