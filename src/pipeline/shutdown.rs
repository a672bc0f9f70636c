//! Graceful shutdown support via a shared atomic flag

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Cancellation handle shared between the signal handler and the pipeline
///
/// Loops check the flag between items and race in-flight work against
/// `requested()`, so a request is observed even in the middle of a download
/// or a retry backoff.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown and wakes every task waiting in `requested()`
    ///
    /// Returns true if shutdown had already been requested.
    pub fn request(&self) -> bool {
        let already = self.flag.swap(true, Ordering::SeqCst);
        self.notify.notify_waiters();
        already
    }

    /// Check if shutdown was requested
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Completes once shutdown has been requested
    pub async fn requested(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before reading the flag so a request in between is not lost.
        notified.as_mut().enable();
        if self.is_requested() {
            return;
        }
        notified.await;
    }
}
