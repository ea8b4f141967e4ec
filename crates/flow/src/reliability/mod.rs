//! Reliability patterns
//!
//! This module provides:
//! - [`RetryPolicy`] - Attempt count and fixed interval between attempts
//! - [`retry`] - Re-run a fallible async task under a policy

mod retry;

pub use retry::{retry, RetryPolicy};
