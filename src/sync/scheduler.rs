//! Single-shot autosave timer
//!
//! Armed only on a clean-to-dirty transition; edits made while already dirty
//! do not reset the timer, so worst-case staleness is bounded by the interval
//! from the first edit of a dirty streak. The pending timer is a cancellable
//! task handle, cancelled on teardown or when a manual save supersedes it.

use std::future::Future;
use std::time::Duration;

use log::debug;
use tokio::task::AbortHandle;

/// Delay between the first edit of a dirty streak and the automatic save.
pub const AUTO_SAVE_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub struct AutoSaveScheduler {
    interval: Duration,
    pending: Option<AbortHandle>,
}

impl AutoSaveScheduler {
    pub fn new() -> Self {
        Self::with_interval(AUTO_SAVE_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            pending: None,
        }
    }

    /// Arm the one-shot timer; `fire` runs after the interval elapses.
    ///
    /// An already-pending timer is superseded rather than doubled up.
    pub fn arm<F, Fut>(&mut self, fire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        self.cancel();

        let interval = self.interval;
        let task = tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            fire().await;
        });
        debug!("autosave timer armed for {interval:?}");
        self.pending = Some(task.abort_handle());
    }

    /// Cancel a pending timer, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
            debug!("autosave timer cancelled");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Default for AutoSaveScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_interval() {
        let mut scheduler = AutoSaveScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));
        let counter = fired.clone();

        scheduler.arm(move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(scheduler.is_armed());

        tokio::time::sleep(AUTO_SAVE_INTERVAL - Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_fire() {
        let mut scheduler = AutoSaveScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));
        let counter = fired.clone();

        scheduler.arm(move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        scheduler.cancel();
        assert!(!scheduler.is_armed());

        tokio::time::sleep(AUTO_SAVE_INTERVAL * 2).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_supersedes_pending_timer() {
        let mut scheduler = AutoSaveScheduler::with_interval(Duration::from_secs(10));
        let fired = Arc::new(AtomicU32::new(0));

        let first = fired.clone();
        scheduler.arm(move || async move {
            first.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(5)).await;

        let second = fired.clone();
        scheduler.arm(move || async move {
            second.fetch_add(10, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(30)).await;
        // Only the superseding timer fired
        assert_eq!(fired.load(Ordering::SeqCst), 10);
    }
}
