//! Loop and pipeline combinators
//!
//! Loop conditions are async and fallible, like the tasks they guard. An
//! error from either side ends the loop and is returned as is.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

async fn run_loop<T, TFut, F, FFut, R, E>(
    mut test: T,
    mut task: F,
    task_first: bool,
    continue_on: bool,
) -> Result<Option<R>, E>
where
    T: FnMut() -> TFut,
    TFut: Future<Output = Result<bool, E>>,
    F: FnMut() -> FFut,
    FFut: Future<Output = Result<R, E>>,
{
    let mut last = None;
    if task_first {
        last = Some(task().await?);
    }
    while test().await? == continue_on {
        last = Some(task().await?);
    }
    Ok(last)
}

/// Run `task` while `test` holds
///
/// Returns the last task result, or `None` if the task never ran.
///
/// # Example
///
/// ```
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let count = AtomicU32::new(0);
/// let last = everruns_flow::control::whilst(
///     || async { Ok::<_, ()>(count.load(Ordering::SeqCst) < 3) },
///     || async { Ok(count.fetch_add(1, Ordering::SeqCst) + 1) },
/// )
/// .await;
/// assert_eq!(last, Ok(Some(3)));
/// # }
/// ```
pub async fn whilst<T, TFut, F, FFut, R, E>(test: T, task: F) -> Result<Option<R>, E>
where
    T: FnMut() -> TFut,
    TFut: Future<Output = Result<bool, E>>,
    F: FnMut() -> FFut,
    FFut: Future<Output = Result<R, E>>,
{
    run_loop(test, task, false, true).await
}

/// Like [`whilst`], but the task runs once before the first test
pub async fn do_whilst<F, FFut, T, TFut, R, E>(task: F, test: T) -> Result<Option<R>, E>
where
    F: FnMut() -> FFut,
    FFut: Future<Output = Result<R, E>>,
    T: FnMut() -> TFut,
    TFut: Future<Output = Result<bool, E>>,
{
    run_loop(test, task, true, true).await
}

/// Run `task` until `test` holds
pub async fn until<T, TFut, F, FFut, R, E>(test: T, task: F) -> Result<Option<R>, E>
where
    T: FnMut() -> TFut,
    TFut: Future<Output = Result<bool, E>>,
    F: FnMut() -> FFut,
    FFut: Future<Output = Result<R, E>>,
{
    run_loop(test, task, false, false).await
}

/// Like [`until`], but the task runs once before the first test
pub async fn do_until<F, FFut, T, TFut, R, E>(task: F, test: T) -> Result<Option<R>, E>
where
    F: FnMut() -> FFut,
    FFut: Future<Output = Result<R, E>>,
    T: FnMut() -> TFut,
    TFut: Future<Output = Result<bool, E>>,
{
    run_loop(test, task, true, false).await
}

/// Run `task` until it fails, then return the error
pub async fn forever<F, Fut, E>(mut task: F) -> E
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    loop {
        if let Err(err) = task().await {
            return err;
        }
    }
}

/// Thread a value through `tasks`, each receiving its predecessor's result
///
/// The first task receives `A::default()`.
pub async fn waterfall<I, F, Fut, A, E>(tasks: I) -> Result<A, E>
where
    I: IntoIterator<Item = F>,
    F: FnOnce(A) -> Fut,
    Fut: Future<Output = Result<A, E>>,
    A: Default,
{
    let mut value = A::default();
    for task in tasks {
        value = task(value).await?;
    }
    Ok(value)
}

/// Build a function that threads its argument through `tasks` in order
///
/// The returned function can be called any number of times.
///
/// # Example
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let double = |n: i64| async move { Ok::<_, ()>(n * 2) };
/// let quadruple = everruns_flow::control::compose([double, double]);
/// assert_eq!(quadruple(3).await, Ok(12));
/// # }
/// ```
pub fn compose<F, Fut, A, E>(
    tasks: impl IntoIterator<Item = F>,
) -> impl Fn(A) -> BoxFuture<'static, Result<A, E>> + Send + Sync
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<A, E>> + Send + 'static,
    A: Send + 'static,
    E: Send + 'static,
{
    let tasks: Arc<[F]> = tasks.into_iter().collect();
    move |arg: A| {
        let tasks = Arc::clone(&tasks);
        async move {
            let mut value = arg;
            for task in tasks.iter() {
                value = task(value).await?;
            }
            Ok(value)
        }
        .boxed()
    }
}
