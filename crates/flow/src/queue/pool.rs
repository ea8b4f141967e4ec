//! Bounded worker pool shared by the FIFO and priority queues
//!
//! The pool owns the running count, the backlog and the hook registry. All
//! three sit behind locks that are never held across an `.await`.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use super::backlog::Backlog;
use super::config::QueueStats;
use super::hooks::{fire_event, fire_task_error, HookId, HookRegistry, QueueEvent};
use super::worker::Worker;
use crate::error::{panic_message, TaskError};

/// Per-task outcome sender paired with the task payload
pub(crate) struct Admission<T, R, E> {
    id: Uuid,
    task: T,
    reply: oneshot::Sender<Result<R, TaskError<E>>>,
}

impl<T, R, E> Admission<T, R, E> {
    /// Create an admission record and the handle that observes it
    pub(crate) fn new(task: T) -> (Self, TaskHandle<R, E>) {
        let id = Uuid::now_v7();
        let (reply, rx) = oneshot::channel();
        (Self { id, task, reply }, TaskHandle { id, rx })
    }
}

/// Resolves with the outcome of exactly one queued task
///
/// Dropping the handle does not cancel the task.
#[must_use = "dropping a TaskHandle discards the task's outcome"]
pub struct TaskHandle<R, E> {
    id: Uuid,
    rx: oneshot::Receiver<Result<R, TaskError<E>>>,
}

impl<R, E> TaskHandle<R, E> {
    /// Identifier of the task, as used in log fields
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl<R, E> Future for TaskHandle<R, E> {
    type Output = Result<R, TaskError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.rx
            .poll_unpin(cx)
            .map(|settled| settled.unwrap_or(Err(TaskError::Abandoned)))
    }
}

impl<R, E> fmt::Debug for TaskHandle<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle").field("id", &self.id).finish()
    }
}

struct PoolState<B> {
    backlog: B,
    running: usize,
    completed: u64,
    failed: u64,
}

pub(crate) type DynWorker<T, R, E> = Arc<dyn Worker<T, Output = R, Error = E>>;

/// Scheduler core: admits tasks, starts them up to the concurrency limit and
/// fires lifecycle hooks
pub(crate) struct Pool<T, R, E, B> {
    name: String,
    concurrency: usize,
    worker: DynWorker<T, R, E>,
    state: Mutex<PoolState<B>>,
    hooks: RwLock<HookRegistry<T, E>>,
}

impl<T, R, E, B> Pool<T, R, E, B>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
    E: Clone + fmt::Debug + Send + 'static,
    B: Backlog<Admission<T, R, E>>,
{
    pub(crate) fn new(
        name: String,
        concurrency: usize,
        worker: DynWorker<T, R, E>,
        backlog: B,
    ) -> Self {
        Self {
            name,
            concurrency,
            worker,
            state: Mutex::new(PoolState {
                backlog,
                running: 0,
                completed: 0,
                failed: 0,
            }),
            hooks: RwLock::new(HookRegistry::new()),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().backlog.len()
    }

    pub(crate) fn running(&self) -> usize {
        self.state.lock().running
    }

    pub(crate) fn idle(&self) -> bool {
        let state = self.state.lock();
        state.running == 0 && state.backlog.is_empty()
    }

    pub(crate) fn stats(&self) -> QueueStats {
        let state = self.state.lock();
        QueueStats {
            pending: state.backlog.len(),
            running: state.running,
            completed: state.completed,
            failed: state.failed,
        }
    }

    pub(crate) fn hooks(&self) -> &RwLock<HookRegistry<T, E>> {
        &self.hooks
    }

    pub(crate) fn remove_hook(&self, id: HookId) -> bool {
        self.hooks.write().remove(id)
    }

    /// Place entries in the backlog, then try to start work
    pub(crate) fn admit(self: &Arc<Self>, place: impl FnOnce(&mut B)) {
        {
            let mut state = self.state.lock();
            place(&mut state.backlog);
            debug!(
                queue = %self.name,
                pending = state.backlog.len(),
                running = state.running,
                "Tasks admitted"
            );
        }
        self.schedule();
    }

    /// Start backlog entries while slots are free
    fn schedule(self: &Arc<Self>) {
        let mut state = self.state.lock();
        while state.running < self.concurrency {
            let Some(admission) = state.backlog.pop_next() else {
                break;
            };
            state.running += 1;
            let saturated = state.running == self.concurrency;

            debug!(
                queue = %self.name,
                task_id = %admission.id,
                running = state.running,
                saturated,
                "Starting task"
            );

            let pool = Arc::clone(self);
            tokio::spawn(async move { pool.run(admission, saturated).await });
        }
    }

    async fn run(self: Arc<Self>, admission: Admission<T, R, E>, saturated: bool) {
        let Admission { id, task, reply } = admission;

        if saturated {
            self.fire(QueueEvent::Saturated).await;
        }

        let worker = Arc::clone(&self.worker);
        let input = task.clone();
        let outcome = AssertUnwindSafe(async move { worker.run(input).await })
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(err)) => Err(TaskError::Failed(err)),
            Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
        };

        let failure = match &result {
            Ok(_) => {
                self.state.lock().completed += 1;
                debug!(queue = %self.name, task_id = %id, "Task completed");
                None
            }
            Err(err) => {
                self.state.lock().failed += 1;
                warn!(queue = %self.name, task_id = %id, error = ?err, "Task failed");
                Some(err.clone())
            }
        };

        if let Some(err) = failure {
            let hooks = self.hooks.read().task_error_hooks();
            fire_task_error(&self.name, hooks, err, task).await;
        }

        // The caller may have dropped the handle
        let _ = reply.send(result);

        self.finish(id).await;
    }

    /// Release the slot held by a finished task and pick up more work
    async fn finish(self: Arc<Self>, id: Uuid) {
        let full = self.state.lock().running == self.concurrency;
        if full {
            self.fire(QueueEvent::Unsaturated).await;
        }

        let drained = {
            let mut state = self.state.lock();
            if state.running == 0 {
                drop(state);
                crate::tick::abort(format!(
                    "queue {} released task {} while no task was running",
                    self.name, id
                ));
                return;
            }
            state.running -= 1;
            state.running == 0
        };

        if drained {
            debug!(queue = %self.name, "Running count reached zero");
            self.fire(QueueEvent::Drain).await;
        }

        // Defer the next round so instantly-resolving workers cannot grow the stack
        tokio::task::yield_now().await;
        self.schedule();
    }

    async fn fire(&self, event: QueueEvent) {
        let hooks = self.hooks.read().event_hooks(event);
        if hooks.is_empty() {
            return;
        }
        debug!(queue = %self.name, %event, observers = hooks.len(), "Firing hooks");
        fire_event(&self.name, event, hooks).await;
    }
}
