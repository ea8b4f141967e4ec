//! Worker abstraction executed once per task

use std::fmt;
use std::future::Future;

use async_trait::async_trait;

/// Executes one task and reports success or failure
///
/// The queue only distinguishes `Ok` from `Err`; it never inspects the
/// output value.
///
/// # Example
///
/// ```ignore
/// struct Resize;
///
/// #[async_trait]
/// impl Worker<ImageJob> for Resize {
///     type Output = Thumbnail;
///     type Error = ResizeError;
///
///     async fn run(&self, job: ImageJob) -> Result<Thumbnail, ResizeError> {
///         resize(job).await
///     }
/// }
/// ```
#[async_trait]
pub trait Worker<T: Send + 'static>: Send + Sync + 'static {
    /// Value produced by a successful task
    type Output: Send + 'static;

    /// Error produced by a failed task
    type Error: Send + 'static;

    /// Run a single task
    async fn run(&self, task: T) -> Result<Self::Output, Self::Error>;
}

/// A [`Worker`] backed by an async closure
///
/// Created with [`worker_fn`].
#[derive(Clone)]
pub struct WorkerFn<F> {
    f: F,
}

impl<F> fmt::Debug for WorkerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerFn").finish_non_exhaustive()
    }
}

/// Wrap an async closure as a [`Worker`]
pub fn worker_fn<F>(f: F) -> WorkerFn<F> {
    WorkerFn { f }
}

#[async_trait]
impl<T, F, Fut, R, E> Worker<T> for WorkerFn<F>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    type Output = R;
    type Error = E;

    async fn run(&self, task: T) -> Result<R, E> {
        (self.f)(task).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubler;

    #[async_trait]
    impl Worker<u32> for Doubler {
        type Output = u32;
        type Error = String;

        async fn run(&self, task: u32) -> Result<u32, String> {
            task.checked_mul(2).ok_or_else(|| "overflow".to_string())
        }
    }

    #[tokio::test]
    async fn test_trait_worker() {
        assert_eq!(Doubler.run(21).await, Ok(42));
        assert_eq!(Doubler.run(u32::MAX).await, Err("overflow".to_string()));
    }

    #[tokio::test]
    async fn test_closure_worker() {
        let worker = worker_fn(|name: String| async move {
            if name.is_empty() {
                Err("empty name")
            } else {
                Ok(name.len())
            }
        });

        assert_eq!(worker.run("flow".to_string()).await, Ok(4));
        assert_eq!(worker.run(String::new()).await, Err("empty name"));
    }
}
