/*!
 * Shutdown Signal
 *
 * Async-signal-safe shutdown flag. Triggering only stores atomics and wakes
 * waiters; all teardown happens in the controller's ordinary control flow.
 * The first reason recorded wins.
 */

use super::types::ShutdownReason;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

const NOT_TRIGGERED: u8 = 0;

#[derive(Debug, Default)]
struct Inner {
    reason: AtomicU8,
    notify: Notify,
}

/// Cloneable handle to the process-wide shutdown flag
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Returns true if this call set the reason.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        let won = self
            .inner
            .reason
            .compare_exchange(
                NOT_TRIGGERED,
                reason as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        self.inner.notify.notify_waiters();
        won
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.reason.load(Ordering::Acquire) != NOT_TRIGGERED
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        ShutdownReason::from_u8(self.inner.reason.load(Ordering::Acquire))
    }

    /// Resolve once shutdown has been requested
    pub async fn wait(&self) -> ShutdownReason {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a trigger in between is not lost
            notified.as_mut().enable();

            if let Some(reason) = self.reason() {
                return reason;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_reason_wins() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_triggered());
        assert_eq!(signal.reason(), None);

        assert!(signal.trigger(ShutdownReason::WallTimeout));
        assert!(!signal.trigger(ShutdownReason::Interrupted));
        assert_eq!(signal.reason(), Some(ShutdownReason::WallTimeout));
    }

    #[tokio::test]
    async fn test_wait_wakes_on_trigger() {
        let signal = ShutdownSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.trigger(ShutdownReason::Interrupted);

        let reason = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reason, ShutdownReason::Interrupted);
    }

    #[tokio::test]
    async fn test_wait_after_trigger_returns_immediately() {
        let signal = ShutdownSignal::new();
        signal.trigger(ShutdownReason::SimEndReached);
        assert_eq!(signal.wait().await, ShutdownReason::SimEndReached);
    }
}
