//! Save orchestration types and the engine's error taxonomy

pub mod coordinator;
pub mod detector;
pub mod scheduler;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the synchronization engine.
///
/// Transient transport faults are recovered inside the retry layer and only
/// appear here, as `Persistence`, once retries are exhausted. `Validation`
/// and `AuthenticationRequired` are never retried.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The client is offline; no network attempt was made.
    #[error("network unavailable")]
    NetworkUnavailable,

    /// The session is no longer authenticated; re-authentication required.
    #[error("authentication required")]
    AuthenticationRequired,

    /// A local precondition failed before any transport call.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The persistence call failed, including exhausted transient retries.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// The listing could not be fetched and no cached copy exists.
    /// Distinct from a successful-but-empty listing.
    #[error("no cached listing available")]
    CacheMiss(#[source] Box<SyncError>),
}

/// Host-visible save status.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SaveState {
    Saved,
    Saving,
    Unsaved,
    Error,
}

/// What initiated a save attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveTrigger {
    /// The user asked for a save explicitly.
    Manual,
    /// The autosave timer fired, a coordinator retry ran, or an unload flush.
    Auto,
}

/// How a save call resolved without error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The payload was persisted; carries the bound draft id.
    Saved(String),
    /// Another save was already in flight; this call did nothing.
    Coalesced,
    /// Nothing to save (clean or empty document, or the session closed).
    Skipped,
}
