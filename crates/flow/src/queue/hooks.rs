//! Lifecycle hooks fired by the queue scheduler
//!
//! Observers for one event run sequentially in registration order. Each one
//! is fully awaited before the next starts. A panicking observer is logged
//! and skipped; it never reaches the scheduler.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{panic_message, TaskError};

/// Zero-argument lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueEvent {
    /// A task start filled the last free slot
    Saturated,
    /// A task completion is about to free a slot in a full pool
    Unsaturated,
    /// A task completion dropped the running count to zero
    Drain,
}

impl fmt::Display for QueueEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saturated => write!(f, "saturated"),
            Self::Unsaturated => write!(f, "unsaturated"),
            Self::Drain => write!(f, "drain"),
        }
    }
}

/// Identifies a registered observer so it can be removed later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(u64);

/// Observer for [`QueueEvent`]s
pub type EventHook = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Observer for task failures, called with the error and the failed task
pub type TaskErrorHook<T, E> =
    Arc<dyn Fn(TaskError<E>, T) -> BoxFuture<'static, ()> + Send + Sync>;

/// Typed registry of observers, one ordered list per event kind
pub(crate) struct HookRegistry<T, E> {
    next_id: u64,
    task_error: Vec<(HookId, TaskErrorHook<T, E>)>,
    saturated: Vec<(HookId, EventHook)>,
    unsaturated: Vec<(HookId, EventHook)>,
    drain: Vec<(HookId, EventHook)>,
}

impl<T, E> HookRegistry<T, E> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            task_error: Vec::new(),
            saturated: Vec::new(),
            unsaturated: Vec::new(),
            drain: Vec::new(),
        }
    }

    fn allocate_id(&mut self) -> HookId {
        let id = HookId(self.next_id);
        self.next_id += 1;
        id
    }

    fn list_mut(&mut self, event: QueueEvent) -> &mut Vec<(HookId, EventHook)> {
        match event {
            QueueEvent::Saturated => &mut self.saturated,
            QueueEvent::Unsaturated => &mut self.unsaturated,
            QueueEvent::Drain => &mut self.drain,
        }
    }

    fn list(&self, event: QueueEvent) -> &[(HookId, EventHook)] {
        match event {
            QueueEvent::Saturated => &self.saturated,
            QueueEvent::Unsaturated => &self.unsaturated,
            QueueEvent::Drain => &self.drain,
        }
    }

    /// Register an observer for a lifecycle event
    pub(crate) fn register<F, Fut>(&mut self, event: QueueEvent, hook: F) -> HookId
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.allocate_id();
        let hook: EventHook = Arc::new(move || hook().boxed());
        self.list_mut(event).push((id, hook));
        id
    }

    /// Register a task failure observer
    pub(crate) fn register_task_error<F, Fut>(&mut self, hook: F) -> HookId
    where
        F: Fn(TaskError<E>, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.allocate_id();
        let hook: TaskErrorHook<T, E> = Arc::new(move |err, task| hook(err, task).boxed());
        self.task_error.push((id, hook));
        id
    }

    /// Remove an observer; returns whether it was registered
    pub(crate) fn remove(&mut self, id: HookId) -> bool {
        let before = self.len();
        self.task_error.retain(|(hook_id, _)| *hook_id != id);
        self.saturated.retain(|(hook_id, _)| *hook_id != id);
        self.unsaturated.retain(|(hook_id, _)| *hook_id != id);
        self.drain.retain(|(hook_id, _)| *hook_id != id);
        self.len() != before
    }

    fn len(&self) -> usize {
        self.task_error.len() + self.saturated.len() + self.unsaturated.len() + self.drain.len()
    }

    /// Snapshot the observers for an event so they can run without the lock
    pub(crate) fn event_hooks(&self, event: QueueEvent) -> Vec<EventHook> {
        self.list(event).iter().map(|(_, hook)| Arc::clone(hook)).collect()
    }

    /// Snapshot the task failure observers
    pub(crate) fn task_error_hooks(&self) -> Vec<TaskErrorHook<T, E>> {
        self.task_error
            .iter()
            .map(|(_, hook)| Arc::clone(hook))
            .collect()
    }
}

/// Run event observers one after another
pub(crate) async fn fire_event(queue: &str, event: QueueEvent, hooks: Vec<EventHook>) {
    for hook in hooks {
        let outcome = AssertUnwindSafe(async move { hook().await })
            .catch_unwind()
            .await;
        if let Err(payload) = outcome {
            warn!(
                queue,
                %event,
                panic = %panic_message(payload.as_ref()),
                "Lifecycle hook panicked"
            );
        }
    }
}

/// Run task failure observers one after another
pub(crate) async fn fire_task_error<T, E>(
    queue: &str,
    hooks: Vec<TaskErrorHook<T, E>>,
    error: TaskError<E>,
    task: T,
) where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    for hook in hooks {
        let (error, task) = (error.clone(), task.clone());
        let outcome = AssertUnwindSafe(async move { hook(error, task).await })
            .catch_unwind()
            .await;
        if let Err(payload) = outcome {
            warn!(
                queue,
                panic = %panic_message(payload.as_ref()),
                "Task error hook panicked"
            );
        }
    }
}
