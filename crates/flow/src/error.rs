//! Error types shared across the crate

use std::any::Any;

use thiserror::Error;

/// Outcome of a single queued task that did not produce a value
///
/// The pool itself never fails because of a task; this error is only ever
/// delivered to the task's own [`TaskHandle`](crate::queue::TaskHandle) and to
/// `task_error` observers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError<E> {
    /// The worker returned an error
    #[error("task failed: {0}")]
    Failed(E),

    /// The worker panicked while running the task
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The queue was dropped before the task settled
    #[error("task abandoned before it settled")]
    Abandoned,
}

impl<E> TaskError<E> {
    /// Get the worker error, if the task failed with one
    pub fn as_failed(&self) -> Option<&E> {
        match self {
            TaskError::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Consume the error and return the worker error, if any
    pub fn into_failed(self) -> Option<E> {
        match self {
            TaskError::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Error observed by a listener on a [`Waiter`](crate::waiter::Waiter)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError<E> {
    /// The slot was rejected
    #[error("rejected: {0}")]
    Rejected(E),

    /// The operation behind the slot panicked
    #[error("panicked: {0}")]
    Panicked(String),

    /// The waiter was dropped while the slot was still pending
    #[error("waiter dropped before it settled")]
    Abandoned,
}

impl<E> WaitError<E> {
    /// Get the rejection reason, if any
    pub fn as_rejected(&self) -> Option<&E> {
        match self {
            WaitError::Rejected(err) => Some(err),
            _ => None,
        }
    }
}

/// Usage errors for the all-combinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllError {
    /// Tried to push after every tracked operation already resolved
    #[error("tried to add an operation after the join already resolved")]
    AlreadyResolved,
}

/// Queue construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Invalid configuration
    #[error("invalid queue configuration: {0}")]
    InvalidConfig(String),
}

/// Unrecoverable error delivered through [`abort`](crate::tick::abort)
#[derive(Debug, Error)]
#[error("fatal: {source}")]
pub struct FatalError {
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl FatalError {
    /// Wrap an error as fatal
    pub fn new(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            source: error.into(),
        }
    }
}

/// Render a caught panic payload for logs and [`TaskError::Panicked`]
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_error_display() {
        let err: TaskError<String> = TaskError::Failed("boom".to_string());
        assert_eq!(err.to_string(), "task failed: boom");

        let err: TaskError<String> = TaskError::Panicked("index out of bounds".to_string());
        assert_eq!(err.to_string(), "task panicked: index out of bounds");
    }

    #[test]
    fn test_task_error_accessors() {
        let err: TaskError<&str> = TaskError::Failed("boom");
        assert_eq!(err.as_failed(), Some(&"boom"));
        assert_eq!(err.into_failed(), Some("boom"));

        let err: TaskError<&str> = TaskError::Abandoned;
        assert!(err.as_failed().is_none());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload: Box<dyn Any + Send> = Box::new(format!("formatted {}", 7));
        assert_eq!(panic_message(payload.as_ref()), "formatted 7");

        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }

    #[test]
    fn test_wait_error_accessors() {
        let err = WaitError::Rejected(7);
        assert_eq!(err.as_rejected(), Some(&7));
        assert!(WaitError::<i32>::Abandoned.as_rejected().is_none());
        assert!(WaitError::<i32>::Panicked("boom".to_string())
            .as_rejected()
            .is_none());
    }
}
