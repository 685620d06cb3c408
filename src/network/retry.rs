//! Transport-level retry with exponential backoff
//!
//! Wraps a single asynchronous persistence call: preflight the connectivity
//! signal, classify the fault, and retry transient failures with capped
//! exponential backoff. Permanent faults (auth, validation) propagate
//! immediately; the final failed attempt's error is what the caller sees.
//!
//! This layer is independent of the coordinator's coarse fixed-delay retry;
//! the two stack with no shared budget.

use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::network::Connectivity;
use crate::store::ApiError;
use crate::sync::SyncError;

/// HTTP statuses worth retrying; everything else is permanent.
const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

fn is_retryable(error: &ApiError) -> bool {
    match error {
        ApiError::Connection(_) | ApiError::Timeout => true,
        ApiError::Status { status, .. } => RETRYABLE_STATUSES.contains(status),
    }
}

fn into_sync_error(error: ApiError) -> SyncError {
    match &error {
        ApiError::Status { status: 401, .. } => SyncError::AuthenticationRequired,
        _ => SyncError::Persistence(error.to_string()),
    }
}

/// Bounded exponential backoff policy for individual transport calls.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2,
        }
    }
}

impl RetryPolicy {
    /// Run `call` with offline preflight and transient-fault retries.
    ///
    /// If the connectivity signal reports offline, fails immediately with
    /// `NetworkUnavailable` without attempting the call.
    pub async fn execute<T, F, Fut>(
        &self,
        connectivity: &Connectivity,
        mut call: F,
    ) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if !connectivity.is_online() {
            return Err(SyncError::NetworkUnavailable);
        }

        let mut attempt: u32 = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if !is_retryable(&error) || attempt >= self.max_retries {
                        return Err(into_sync_error(error));
                    }

                    let delay = self
                        .base_delay
                        .saturating_mul(self.backoff_factor.saturating_pow(attempt))
                        .min(self.max_delay);
                    warn!(
                        "transport attempt {} failed ({}), retrying in {:?}",
                        attempt + 1,
                        error,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn http(status: u16) -> ApiError {
        ApiError::Status {
            status,
            message: "test".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_preflight_makes_no_attempt() {
        let connectivity = Connectivity::with_state(false);
        let calls = Arc::new(AtomicU32::new(0));
        let counted = calls.clone();

        let result: Result<(), _> = RetryPolicy::default()
            .execute(&connectivity, move || {
                counted.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::Timeout) }
            })
            .await;

        assert!(matches!(result, Err(SyncError::NetworkUnavailable)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_fault_recovers() {
        let connectivity = Connectivity::new();
        let calls = Arc::new(AtomicU32::new(0));
        let counted = calls.clone();

        let result = RetryPolicy::default()
            .execute(&connectivity, move || {
                let n = counted.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(http(503))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_surface_last_error() {
        let connectivity = Connectivity::new();
        let calls = Arc::new(AtomicU32::new(0));
        let counted = calls.clone();
        let started = Instant::now();

        let result: Result<(), _> = RetryPolicy::default()
            .execute(&connectivity, move || {
                counted.fetch_add(1, Ordering::SeqCst);
                async { Err(http(503)) }
            })
            .await;

        assert!(matches!(result, Err(SyncError::Persistence(_))));
        // Initial attempt + 3 retries
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // Backoff slept 1s + 2s + 4s
        assert_eq!(started.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_fault_is_not_retried() {
        let connectivity = Connectivity::new();
        let calls = Arc::new(AtomicU32::new(0));
        let counted = calls.clone();

        let result: Result<(), _> = RetryPolicy::default()
            .execute(&connectivity, move || {
                counted.fetch_add(1, Ordering::SeqCst);
                async { Err(http(401)) }
            })
            .await;

        assert!(matches!(result, Err(SyncError::AuthenticationRequired)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_fault_is_not_retried() {
        let connectivity = Connectivity::new();

        let result: Result<(), _> = RetryPolicy::default()
            .execute(&connectivity, || async { Err(http(400)) })
            .await;

        assert!(matches!(result, Err(SyncError::Persistence(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_is_capped() {
        let connectivity = Connectivity::new();
        let policy = RetryPolicy {
            max_retries: 5,
            ..RetryPolicy::default()
        };
        let started = Instant::now();

        let result: Result<(), _> = policy
            .execute(&connectivity, || async { Err(ApiError::Timeout) })
            .await;

        assert!(result.is_err());
        // 1s + 2s + 4s + 8s + 10s (16s capped at 10s)
        assert_eq!(started.elapsed(), Duration::from_secs(25));
    }
}
