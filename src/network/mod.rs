//! Connectivity signal for the synchronization engine
//!
//! The host feeds the runtime's online/offline events into a `Connectivity`
//! handle. The retry layer prechecks it before any transport call and the
//! listing path uses it to decide cache eligibility; interested parties can
//! also watch for transitions.

pub mod retry;

use std::sync::Arc;

use log::info;
use tokio::sync::watch;

/// Shared online/offline state.
///
/// Cheap to clone; all clones observe the same signal.
#[derive(Clone)]
pub struct Connectivity {
    sender: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    /// Create a connectivity handle, initially online.
    pub fn new() -> Self {
        Self::with_state(true)
    }

    pub fn with_state(online: bool) -> Self {
        let (sender, _) = watch::channel(online);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    /// Record an online/offline event from the host runtime.
    pub fn set_online(&self, online: bool) {
        let changed = self.sender.send_if_modified(|current| {
            if *current != online {
                *current = online;
                true
            } else {
                false
            }
        });
        if changed {
            info!(
                "connectivity changed: {}",
                if online { "online" } else { "offline" }
            );
        }
    }

    /// Watch for connectivity transitions.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_online() {
        let connectivity = Connectivity::new();
        assert!(connectivity.is_online());
    }

    #[tokio::test]
    async fn test_transitions_are_observable() {
        let connectivity = Connectivity::new();
        let mut watcher = connectivity.subscribe();

        connectivity.set_online(false);
        watcher.changed().await.unwrap();
        assert!(!*watcher.borrow());
        assert!(!connectivity.is_online());

        connectivity.set_online(true);
        watcher.changed().await.unwrap();
        assert!(*watcher.borrow());
    }
}
