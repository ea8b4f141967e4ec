//! Collection combinators over async closures
//!
//! Every operation comes in up to three flavours:
//! - parallel (`map`): all items start at once
//! - series (`map_series`): one item at a time, in input order
//! - limit (`map_limit`): at most `limit` items in flight
//!
//! All of them short-circuit on the first error. Pending work of a parallel
//! or limited run is dropped at that point. Results always follow input
//! order, except for [`detect`] which reports the first hit to complete.

use std::future::Future;

use futures::future::try_join_all;
use futures::stream::{self, FuturesUnordered, StreamExt, TryStreamExt};

fn keep_matching<T>(items: Vec<T>, flags: Vec<bool>, wanted: bool) -> Vec<T> {
    items
        .into_iter()
        .zip(flags)
        .filter_map(|(item, flag)| (flag == wanted).then_some(item))
        .collect()
}

/// Run `f` for every item in parallel
pub async fn each<I, F, Fut, E>(items: I, f: F) -> Result<(), E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    try_join_all(items.into_iter().map(f)).await.map(|_| ())
}

/// Run `f` for every item, one at a time
pub async fn each_series<I, F, Fut, E>(items: I, mut f: F) -> Result<(), E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    for item in items {
        f(item).await?;
    }
    Ok(())
}

/// Run `f` for every item with at most `limit` in flight
pub async fn each_limit<I, F, Fut, E>(items: I, limit: usize, f: F) -> Result<(), E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    stream::iter(items)
        .map(f)
        .buffer_unordered(limit.max(1))
        .try_for_each(|()| async { Ok(()) })
        .await
}

/// Transform every item in parallel
///
/// # Example
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let lengths = everruns_flow::collection::map(["a", "bcd"], |s: &'static str| async move {
///     Ok::<_, ()>(s.len())
/// })
/// .await;
/// assert_eq!(lengths, Ok(vec![1, 3]));
/// # }
/// ```
pub async fn map<I, F, Fut, R, E>(items: I, f: F) -> Result<Vec<R>, E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    try_join_all(items.into_iter().map(f)).await
}

/// Transform every item, one at a time
pub async fn map_series<I, F, Fut, R, E>(items: I, mut f: F) -> Result<Vec<R>, E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let items = items.into_iter();
    let mut results = Vec::with_capacity(items.size_hint().0);
    for item in items {
        results.push(f(item).await?);
    }
    Ok(results)
}

/// Transform every item with at most `limit` in flight
pub async fn map_limit<I, F, Fut, R, E>(items: I, limit: usize, f: F) -> Result<Vec<R>, E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    stream::iter(items)
        .map(f)
        .buffered(limit.max(1))
        .try_collect()
        .await
}

/// Transform the values of key/value pairs in parallel, keeping the keys
///
/// The output collection is chosen by the caller, e.g. a `HashMap` or a
/// `Vec<(K, R)>`.
pub async fn map_values<C, K, V, F, Fut, R, E>(
    entries: impl IntoIterator<Item = (K, V)>,
    f: F,
) -> Result<C, E>
where
    C: FromIterator<(K, R)>,
    F: FnMut(V) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let (keys, values): (Vec<K>, Vec<V>) = entries.into_iter().unzip();
    let results = map(values, f).await?;
    Ok(keys.into_iter().zip(results).collect())
}

pub async fn map_values_series<C, K, V, F, Fut, R, E>(
    entries: impl IntoIterator<Item = (K, V)>,
    f: F,
) -> Result<C, E>
where
    C: FromIterator<(K, R)>,
    F: FnMut(V) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let (keys, values): (Vec<K>, Vec<V>) = entries.into_iter().unzip();
    let results = map_series(values, f).await?;
    Ok(keys.into_iter().zip(results).collect())
}

pub async fn map_values_limit<C, K, V, F, Fut, R, E>(
    entries: impl IntoIterator<Item = (K, V)>,
    limit: usize,
    f: F,
) -> Result<C, E>
where
    C: FromIterator<(K, R)>,
    F: FnMut(V) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let (keys, values): (Vec<K>, Vec<V>) = entries.into_iter().unzip();
    let results = map_limit(values, limit, f).await?;
    Ok(keys.into_iter().zip(results).collect())
}

/// Keep the items whose predicate holds, testing them in parallel
pub async fn filter<I, T, F, Fut, E>(items: I, f: F) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = T>,
    T: Clone,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let items: Vec<T> = items.into_iter().collect();
    let flags = map(items.iter().cloned(), f).await?;
    Ok(keep_matching(items, flags, true))
}

pub async fn filter_series<I, T, F, Fut, E>(items: I, f: F) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = T>,
    T: Clone,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let items: Vec<T> = items.into_iter().collect();
    let flags = map_series(items.iter().cloned(), f).await?;
    Ok(keep_matching(items, flags, true))
}

pub async fn filter_limit<I, T, F, Fut, E>(items: I, limit: usize, f: F) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = T>,
    T: Clone,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let items: Vec<T> = items.into_iter().collect();
    let flags = map_limit(items.iter().cloned(), limit, f).await?;
    Ok(keep_matching(items, flags, true))
}

/// Drop the items whose predicate holds, testing them in parallel
pub async fn reject<I, T, F, Fut, E>(items: I, f: F) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = T>,
    T: Clone,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let items: Vec<T> = items.into_iter().collect();
    let flags = map(items.iter().cloned(), f).await?;
    Ok(keep_matching(items, flags, false))
}

pub async fn reject_series<I, T, F, Fut, E>(items: I, f: F) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = T>,
    T: Clone,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let items: Vec<T> = items.into_iter().collect();
    let flags = map_series(items.iter().cloned(), f).await?;
    Ok(keep_matching(items, flags, false))
}

/// Find an item whose predicate holds
///
/// All predicates start at once; the first one to complete with `true` wins
/// and the rest are dropped.
pub async fn detect<I, T, F, Fut, E>(items: I, mut f: F) -> Result<Option<T>, E>
where
    I: IntoIterator<Item = T>,
    T: Clone,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let mut pending: FuturesUnordered<_> = items
        .into_iter()
        .map(|item| {
            let test = f(item.clone());
            async move { Ok::<_, E>(test.await?.then_some(item)) }
        })
        .collect();

    while let Some(outcome) = pending.next().await {
        if let Some(item) = outcome? {
            return Ok(Some(item));
        }
    }
    Ok(None)
}

/// Find the first item, in input order, whose predicate holds
pub async fn detect_series<I, T, F, Fut, E>(items: I, mut f: F) -> Result<Option<T>, E>
where
    I: IntoIterator<Item = T>,
    T: Clone,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    for item in items {
        if f(item.clone()).await? {
            return Ok(Some(item));
        }
    }
    Ok(None)
}

/// Map every item to a collection in parallel and flatten the results
pub async fn concat<I, F, Fut, C, E>(items: I, f: F) -> Result<Vec<C::Item>, E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<C, E>>,
    C: IntoIterator,
{
    let nested = map(items, f).await?;
    Ok(nested.into_iter().flatten().collect())
}

pub async fn concat_series<I, F, Fut, C, E>(items: I, f: F) -> Result<Vec<C::Item>, E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<C, E>>,
    C: IntoIterator,
{
    let nested = map_series(items, f).await?;
    Ok(nested.into_iter().flatten().collect())
}

/// Call `f` with `0..n` in parallel
pub async fn times<F, Fut, R, E>(n: usize, f: F) -> Result<Vec<R>, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    map(0..n, f).await
}

pub async fn times_series<F, Fut, R, E>(n: usize, f: F) -> Result<Vec<R>, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    map_series(0..n, f).await
}

pub async fn times_limit<F, Fut, R, E>(n: usize, limit: usize, f: F) -> Result<Vec<R>, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    map_limit(0..n, limit, f).await
}

/// Await a batch of fallible futures concurrently
pub async fn parallel<I, R, E>(tasks: I) -> Result<Vec<R>, E>
where
    I: IntoIterator,
    I::Item: Future<Output = Result<R, E>>,
{
    try_join_all(tasks).await
}

/// Await a batch of fallible futures one after another
///
/// Futures are lazy, so a task does not start before its predecessor
/// finished.
pub async fn series<I, R, E>(tasks: I) -> Result<Vec<R>, E>
where
    I: IntoIterator,
    I::Item: Future<Output = Result<R, E>>,
{
    map_series(tasks, |task| task).await
}

pub async fn parallel_limit<I, R, E>(tasks: I, limit: usize) -> Result<Vec<R>, E>
where
    I: IntoIterator,
    I::Item: Future<Output = Result<R, E>>,
{
    map_limit(tasks, limit, |task| task).await
}

/// Call every function with a clone of `arg`, in parallel
pub async fn apply_each<I, F, A, Fut, R, E>(functions: I, arg: A) -> Result<Vec<R>, E>
where
    I: IntoIterator<Item = F>,
    F: FnOnce(A) -> Fut,
    A: Clone,
    Fut: Future<Output = Result<R, E>>,
{
    map(functions, |f| f(arg.clone())).await
}

pub async fn apply_each_series<I, F, A, Fut, R, E>(functions: I, arg: A) -> Result<Vec<R>, E>
where
    I: IntoIterator<Item = F>,
    F: FnOnce(A) -> Fut,
    A: Clone,
    Fut: Future<Output = Result<R, E>>,
{
    map_series(functions, |f| f(arg.clone())).await
}

/// Fold items left to right with an async step
pub async fn reduce<I, Acc, F, Fut, E>(items: I, init: Acc, mut f: F) -> Result<Acc, E>
where
    I: IntoIterator,
    F: FnMut(Acc, I::Item) -> Fut,
    Fut: Future<Output = Result<Acc, E>>,
{
    let mut acc = init;
    for item in items {
        acc = f(acc, item).await?;
    }
    Ok(acc)
}

/// Fold items right to left with an async step
pub async fn reduce_right<I, Acc, F, Fut, E>(items: I, init: Acc, f: F) -> Result<Acc, E>
where
    I: IntoIterator,
    I::IntoIter: DoubleEndedIterator,
    F: FnMut(Acc, I::Item) -> Fut,
    Fut: Future<Output = Result<Acc, E>>,
{
    reduce(items.into_iter().rev(), init, f).await
}

/// Sort items by keys computed in parallel
///
/// The sort is stable.
pub async fn sort_by<I, T, F, Fut, K, E>(items: I, f: F) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = T>,
    T: Clone,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<K, E>>,
    K: Ord,
{
    let items: Vec<T> = items.into_iter().collect();
    let keys = map(items.iter().cloned(), f).await?;

    let mut keyed: Vec<(K, T)> = keys.into_iter().zip(items).collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}

/// True if the predicate holds for at least one item
///
/// Items are tested one at a time; testing stops at the first hit.
pub async fn some<I, F, Fut, E>(items: I, mut f: F) -> Result<bool, E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    for item in items {
        if f(item).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// True if the predicate holds for every item
///
/// Items are tested one at a time; testing stops at the first miss.
pub async fn every<I, F, Fut, E>(items: I, mut f: F) -> Result<bool, E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    for item in items {
        if !f(item).await? {
            return Ok(false);
        }
    }
    Ok(true)
}
