//! Scheduling utilities and the fatal-error channel
//!
//! `abort` replaces the "throw from a detached callback to crash the process"
//! pattern with an explicit handler. Applications that want to shut down
//! gracefully install their own handler with [`set_fatal_handler`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::error;

use crate::error::FatalError;

/// Handler invoked for unrecoverable errors
pub type FatalHandler = Arc<dyn Fn(&FatalError) + Send + Sync>;

static FATAL_HANDLER: RwLock<Option<FatalHandler>> = parking_lot::const_rwlock(None);

/// Yield to the runtime once, letting other ready tasks run first
pub async fn next_tick() {
    tokio::task::yield_now().await;
}

/// Wait for the given duration
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Install the process-wide handler for unrecoverable errors
///
/// Replaces any previously installed handler.
pub fn set_fatal_handler<F>(handler: F)
where
    F: Fn(&FatalError) + Send + Sync + 'static,
{
    *FATAL_HANDLER.write() = Some(Arc::new(handler));
}

/// Restore the default handler, which aborts the process
pub fn clear_fatal_handler() {
    *FATAL_HANDLER.write() = None;
}

/// Report an unrecoverable error
///
/// The error is logged, then passed to the installed handler. Without a
/// handler the process aborts.
pub fn abort(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) {
    let fatal = FatalError::new(error);
    error!(error = %fatal, "Unrecoverable error");

    let handler = FATAL_HANDLER.read().clone();
    match handler {
        Some(handler) => handler(&fatal),
        None => std::process::abort(),
    }
}
