//! Retry policy and executor

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Configuration for task retries
///
/// Attempts are separated by a fixed interval. The interval is skipped after
/// the last attempt.
///
/// # Example
///
/// ```
/// use everruns_flow::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(3).with_interval(Duration::from_millis(250));
/// assert_eq!(policy.times, 3);
///
/// // A bare count converts into a policy without an interval
/// let policy: RetryPolicy = 4u32.into();
/// assert_eq!(policy.interval, Duration::ZERO);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first one)
    pub times: u32,

    /// Delay between attempts
    #[serde(with = "duration_millis")]
    pub interval: Duration,
}

impl Default for RetryPolicy {
    /// 5 attempts, no delay between them
    fn default() -> Self {
        Self {
            times: 5,
            interval: Duration::ZERO,
        }
    }
}

impl From<u32> for RetryPolicy {
    fn from(times: u32) -> Self {
        Self::new(times)
    }
}

impl RetryPolicy {
    /// Create a policy with the given attempt count and no interval
    ///
    /// Zero attempts is raised to one.
    pub fn new(times: u32) -> Self {
        Self {
            times: times.max(1),
            ..Default::default()
        }
    }

    /// Set the maximum number of attempts
    pub fn with_times(mut self, times: u32) -> Self {
        self.times = times.max(1);
        self
    }

    /// Set the delay between attempts
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Attempt count actually used by [`retry`]
    pub fn attempts(&self) -> u32 {
        self.times.max(1)
    }

    /// Check if there are remaining attempts after `current_attempt` (1-based)
    pub fn has_attempts_remaining(&self, current_attempt: u32) -> bool {
        current_attempt < self.attempts()
    }
}

/// Run `task` until it succeeds or the policy runs out of attempts
///
/// Returns the first success, or the error of the last attempt.
///
/// # Example
///
/// ```
/// use everruns_flow::{retry, RetryPolicy};
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let calls = AtomicU32::new(0);
/// let result = retry(RetryPolicy::new(3), || async {
///     if calls.fetch_add(1, Ordering::SeqCst) < 2 {
///         Err("flaky")
///     } else {
///         Ok("done")
///     }
/// })
/// .await;
///
/// assert_eq!(result, Ok("done"));
/// assert_eq!(calls.load(Ordering::SeqCst), 3);
/// # }
/// ```
#[instrument(skip_all, fields(times, interval_ms))]
pub async fn retry<P, F, Fut, T, E>(policy: P, mut task: F) -> Result<T, E>
where
    P: Into<RetryPolicy>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Debug,
{
    let policy = policy.into();
    let span = tracing::Span::current();
    span.record("times", policy.attempts());
    span.record("interval_ms", policy.interval.as_millis() as u64);

    let mut attempt = 1;
    loop {
        match task().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "Task succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if policy.has_attempts_remaining(attempt) => {
                debug!(attempt, error = ?err, "Attempt failed, retrying");
                if !policy.interval.is_zero() {
                    tokio::time::sleep(policy.interval).await;
                }
                attempt += 1;
            }
            Err(err) => {
                warn!(attempt, error = ?err, "Retries exhausted");
                return Err(err);
            }
        }
    }
}

/// Serde support for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.times, 5);
        assert_eq!(policy.interval, Duration::ZERO);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0).times, 1);
        assert_eq!(RetryPolicy::from(0u32).attempts(), 1);
        assert_eq!(RetryPolicy::default().with_times(0).times, 1);
    }

    #[test]
    fn test_has_attempts_remaining() {
        let policy = RetryPolicy::new(3);
        assert!(policy.has_attempts_remaining(1));
        assert!(policy.has_attempts_remaining(2));
        assert!(!policy.has_attempts_remaining(3));
    }

    #[test]
    fn test_serialization() {
        let policy = RetryPolicy::new(4).with_interval(Duration::from_millis(1500));
        let json = serde_json::to_string(&policy).unwrap();
        assert_eq!(json, r#"{"times":4,"interval":1500}"#);

        let parsed: RetryPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(policy, parsed);

        let partial: RetryPolicy = serde_json::from_str(r#"{"interval": 20}"#).unwrap();
        assert_eq!(partial.times, 5);
        assert_eq!(partial.interval, Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry(4u32, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Err(format!("attempt {}", n))
        })
        .await;

        assert_eq!(result, Err("attempt 4".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let calls = AtomicU32::new(0);
        let result = retry(RetryPolicy::default(), || async {
            match calls.fetch_add(1, Ordering::SeqCst) {
                0 => Err("cold cache"),
                n => Ok(n),
            }
        })
        .await;

        assert_eq!(result, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_between_attempts_only() {
        let start = tokio::time::Instant::now();
        let policy = RetryPolicy::new(3).with_interval(Duration::from_millis(100));

        let result: Result<(), &str> = retry(policy, || async { Err("down") }).await;

        assert_eq!(result, Err("down"));
        // Two gaps for three attempts
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(300));
    }
}
