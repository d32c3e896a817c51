//! Deadline enforcement for in-flight requests.
//!
//! Each execution resolves an effective timeout (per-call override, then
//! the client default, then none) and arms a [`TimeoutGuard`]. The guard
//! runs a timer on its own task; the executor races the transport against
//! the guard's expiry notification and cleans the guard up on every exit
//! path. Cleanup is idempotent, so the win-the-race path and the drop
//! path may both run it.

use restfetch_core::{ClientSettings, FetchError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Per-call timeout selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Timeout {
    /// Use the client's configured default.
    #[default]
    Default,
    /// No deadline at all, even if the client has a default.
    Never,
    /// A deadline of this many milliseconds.
    After(u64),
}

/// Resolves effective deadlines from call options and client settings.
#[derive(Clone, Default)]
pub struct TimeoutController;

impl TimeoutController {
    pub fn new() -> Self {
        Self
    }

    /// The effective deadline for one execution, or `None` for no
    /// deadline.
    pub fn resolve(&self, timeout: Timeout, settings: &ClientSettings) -> Option<u64> {
        match timeout {
            Timeout::After(ms) => Some(ms),
            Timeout::Never => None,
            Timeout::Default => settings.timeout_ms,
        }
    }

    /// Arms a guard for the resolved deadline. `None` arms a guard that
    /// never fires.
    pub fn arm(&self, deadline_ms: Option<u64>) -> TimeoutGuard {
        TimeoutGuard::new(deadline_ms)
    }
}

/// A one-shot timer tied to a single execution.
pub struct TimeoutGuard {
    deadline_ms: Option<u64>,
    expired: Arc<Notify>,
    done: Arc<AtomicBool>,
    timer: Option<JoinHandle<()>>,
}

impl TimeoutGuard {
    fn new(deadline_ms: Option<u64>) -> Self {
        let expired = Arc::new(Notify::new());
        let done = Arc::new(AtomicBool::new(false));
        let timer = deadline_ms.map(|ms| {
            let expired = Arc::clone(&expired);
            let done = Arc::clone(&done);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                if !done.load(Ordering::SeqCst) {
                    // notify_one stores a permit, so a waiter that
                    // registers after expiry still wakes.
                    expired.notify_one();
                }
            })
        });
        Self {
            deadline_ms,
            expired,
            done,
            timer,
        }
    }

    /// The deadline this guard enforces, if any.
    pub fn deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }

    /// Resolves when the deadline passes. Never resolves for guards with
    /// no deadline.
    pub async fn expired(&self) {
        if self.deadline_ms.is_none() {
            std::future::pending::<()>().await;
        }
        self.expired.notified().await;
    }

    /// The error an expired guard maps to.
    pub fn timeout_error(&self) -> FetchError {
        FetchError::Timeout {
            ms: self.deadline_ms.unwrap_or(0),
        }
    }

    /// Disarms the timer. Safe to call more than once; only the first
    /// call does anything.
    pub fn cleanup(&mut self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for TimeoutGuard {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_timeout(ms: Option<u64>) -> ClientSettings {
        let settings = ClientSettings::new("https://api.test");
        match ms {
            Some(ms) => settings.with_timeout_ms(ms),
            None => settings,
        }
    }

    #[test]
    fn test_resolve_precedence() {
        let controller = TimeoutController::new();
        let with_default = settings_with_timeout(Some(5_000));
        let without_default = settings_with_timeout(None);

        assert_eq!(
            controller.resolve(Timeout::After(250), &with_default),
            Some(250)
        );
        assert_eq!(controller.resolve(Timeout::Never, &with_default), None);
        assert_eq!(
            controller.resolve(Timeout::Default, &with_default),
            Some(5_000)
        );
        assert_eq!(controller.resolve(Timeout::Default, &without_default), None);
    }

    #[tokio::test]
    async fn test_guard_fires_after_deadline() {
        let guard = TimeoutController::new().arm(Some(10));
        tokio::time::timeout(Duration::from_secs(1), guard.expired())
            .await
            .expect("guard should expire");
        assert!(matches!(
            guard.timeout_error(),
            FetchError::Timeout { ms: 10 }
        ));
    }

    #[test]
    fn test_guard_without_deadline_never_fires() {
        let guard = TimeoutController::new().arm(None);
        let mut expiry = tokio_test::task::spawn(guard.expired());
        tokio_test::assert_pending!(expiry.poll());
    }

    #[tokio::test]
    async fn test_cleanup_disarms_timer() {
        let mut guard = TimeoutController::new().arm(Some(10));
        guard.cleanup();
        let result = tokio::time::timeout(Duration::from_millis(50), guard.expired()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let mut guard = TimeoutController::new().arm(Some(1_000));
        guard.cleanup();
        guard.cleanup();
        guard.cleanup();
        assert!(guard.timer.is_none());
    }

    #[tokio::test]
    async fn test_waiter_registered_after_expiry_still_wakes() {
        let guard = TimeoutController::new().arm(Some(1));
        tokio::time::sleep(Duration::from_millis(20)).await;
        tokio::time::timeout(Duration::from_millis(100), guard.expired())
            .await
            .expect("stored permit should wake a late waiter");
    }
}
