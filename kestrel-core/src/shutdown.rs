//! Shutdown signalling shared by every supervised task.
//!
//! A single [`ShutdownSignal`] is cloned into every worker, and
//! any worker's `tokio::select!` loop treats it as just another branch
//! alongside its normal bus/timer inputs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// A marker type returned by a worker's run loop once it has observed
/// shutdown and unwound cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shutdown;

/// Cooperative shutdown flag, cheap to clone and safe to poll from many
/// tasks. [`ShutdownSignal::trigger`] both flips the flag and wakes any
/// task parked in [`ShutdownSignal::wait`], so a worker blocked on
/// `tokio::select!` doesn't need to separately poll the flag.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Resolves once [`Self::trigger`] has been called, for use as a
    /// `tokio::select!` branch. Resolves immediately if already triggered.
    pub async fn wait(&self) {
        if self.is_triggered() {
            return;
        }
        self.notify.notified().await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_wakes_a_waiting_task() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_triggered());

        let waiter = signal.clone();
        let handle = tokio::spawn(async move {
            waiter.wait().await;
        });

        signal.trigger();
        handle.await.unwrap();
        assert!(signal.is_triggered());
    }

    #[tokio::test]
    async fn wait_returns_immediately_if_already_triggered() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        signal.wait().await;
    }
}
