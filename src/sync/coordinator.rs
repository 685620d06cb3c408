//! Coordinator-owned save state
//!
//! Tracks the draft's persistence identity, the host-visible save status,
//! the coarse retry counter, and the draft's human-readable name. The
//! orchestration itself (snapshotting, in-flight guard, transport calls)
//! lives in the editor session; this is the state machine it drives.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::store::ProjectRecord;
use crate::sync::{SaveState, SaveTrigger, SyncError};

/// Coarse saves retried after a failure before requiring a manual retry.
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Fixed delay before a coordinator-level retry. Deliberately not
/// exponential; the transport layer already backs off per attempt.
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Whether the draft has ever been persisted, and under what server id.
///
/// Transitions `Unsaved -> Bound` exactly once per session and never back;
/// every save after the first successful create is an update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DraftIdentity {
    Unsaved,
    Bound(String),
}

impl DraftIdentity {
    pub fn is_bound(&self) -> bool {
        matches!(self, DraftIdentity::Bound(_))
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            DraftIdentity::Unsaved => None,
            DraftIdentity::Bound(id) => Some(id),
        }
    }
}

#[derive(Debug)]
pub struct SaveCoordinator {
    identity: DraftIdentity,
    save_state: SaveState,
    last_save_time: Option<DateTime<Utc>>,
    last_error: Option<String>,
    retry_count: u32,
    draft_name: Option<String>,
}

impl SaveCoordinator {
    /// State for a brand-new, never-persisted draft.
    pub fn new() -> Self {
        Self {
            identity: DraftIdentity::Unsaved,
            save_state: SaveState::Saved,
            last_save_time: None,
            last_error: None,
            retry_count: 0,
            draft_name: None,
        }
    }

    /// State for an editor opened on an existing record.
    pub fn for_record(record: &ProjectRecord) -> Self {
        Self {
            identity: DraftIdentity::Bound(record.id.clone()),
            save_state: SaveState::Saved,
            last_save_time: Some(record.updated_at),
            last_error: None,
            retry_count: 0,
            draft_name: Some(record.name.clone()),
        }
    }

    pub fn identity(&self) -> &DraftIdentity {
        &self.identity
    }

    pub fn save_state(&self) -> SaveState {
        self.save_state
    }

    pub fn last_save_time(&self) -> Option<DateTime<Utc>> {
        self.last_save_time
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn draft_name(&self) -> Option<&str> {
        self.draft_name.as_deref()
    }

    pub fn mark_unsaved(&mut self) {
        if self.save_state != SaveState::Saving {
            self.save_state = SaveState::Unsaved;
        }
    }

    /// Called when change detection flips back to clean without a save, e.g.
    /// an undo returning to the baseline.
    pub fn mark_clean(&mut self) {
        if self.save_state == SaveState::Unsaved {
            self.save_state = SaveState::Saved;
        }
    }

    pub fn mark_saving(&mut self) {
        self.save_state = SaveState::Saving;
    }

    /// Settle on the name to send with the payload.
    ///
    /// A supplied name always wins (and sticks for later saves). With no name
    /// on record, a manual save of a never-created draft is a local
    /// validation failure — the host must prompt for one — while an automatic
    /// save falls back to a generated placeholder.
    pub fn resolve_name(
        &mut self,
        trigger: SaveTrigger,
        supplied: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<String, SyncError> {
        if let Some(name) = supplied {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(SyncError::Validation("newsletter name is required".into()));
            }
            self.draft_name = Some(trimmed.to_string());
        }

        if self.draft_name.is_none() {
            if trigger == SaveTrigger::Manual && !self.identity.is_bound() {
                return Err(SyncError::Validation("newsletter name is required".into()));
            }
            self.draft_name = Some(generate_draft_name(now));
        }

        Ok(self
            .draft_name
            .clone()
            .unwrap_or_else(|| generate_draft_name(now)))
    }

    /// Record a confirmed successful persistence.
    ///
    /// Binds the identity on the first create; the transition happens at most
    /// once because a bound identity is never overwritten.
    pub fn complete_success(&mut self, record: &ProjectRecord, now: DateTime<Utc>) {
        if !self.identity.is_bound() {
            self.identity = DraftIdentity::Bound(record.id.clone());
        }
        self.draft_name = Some(record.name.clone());
        self.save_state = SaveState::Saved;
        self.last_save_time = Some(now);
        self.last_error = None;
        self.retry_count = 0;
    }

    /// Record a failed save. Returns whether a coordinator-level retry should
    /// be scheduled: only persistence failures are worth retrying blindly,
    /// and only up to the bound.
    pub fn complete_failure(&mut self, error: &SyncError) -> bool {
        self.save_state = SaveState::Error;
        self.last_error = Some(error.to_string());

        let retryable = matches!(error, SyncError::Persistence(_));
        if retryable && self.retry_count < MAX_RETRY_ATTEMPTS {
            self.retry_count += 1;
            true
        } else {
            false
        }
    }

    /// Clear the retry budget ahead of a user-initiated retry.
    pub fn reset_retries(&mut self) {
        self.retry_count = 0;
    }
}

impl Default for SaveCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Placeholder name for drafts the user never titled, e.g. `Draft - Aug 29, 02:15 PM`.
pub fn generate_draft_name(now: DateTime<Utc>) -> String {
    format!("Draft - {}", now.format("%b %-d, %I:%M %p"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::store::ProjectStatus;
    use chrono::TimeZone;

    fn record(id: &str, name: &str) -> ProjectRecord {
        ProjectRecord {
            id: id.to_string(),
            name: name.to_string(),
            content_data: Document::new(),
            status: ProjectStatus::Draft,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_identity_binds_once() {
        let mut coordinator = SaveCoordinator::new();
        assert_eq!(coordinator.identity(), &DraftIdentity::Unsaved);

        coordinator.complete_success(&record("p-1", "First"), Utc::now());
        assert_eq!(coordinator.identity().id(), Some("p-1"));

        // A later response can never rebind the identity
        coordinator.complete_success(&record("p-2", "Second"), Utc::now());
        assert_eq!(coordinator.identity().id(), Some("p-1"));
    }

    #[test]
    fn test_manual_save_without_name_requires_one() {
        let mut coordinator = SaveCoordinator::new();
        let result = coordinator.resolve_name(SaveTrigger::Manual, None, Utc::now());
        assert!(matches!(result, Err(SyncError::Validation(_))));

        // Whitespace-only names are rejected the same way
        let result =
            coordinator.resolve_name(SaveTrigger::Manual, Some("   ".into()), Utc::now());
        assert!(matches!(result, Err(SyncError::Validation(_))));
    }

    #[test]
    fn test_auto_save_generates_placeholder_name() {
        let mut coordinator = SaveCoordinator::new();
        let now = Utc.with_ymd_and_hms(2024, 8, 29, 14, 15, 0).unwrap();

        let name = coordinator
            .resolve_name(SaveTrigger::Auto, None, now)
            .unwrap();
        assert_eq!(name, "Draft - Aug 29, 02:15 PM");

        // The generated name sticks for later manual saves
        let again = coordinator
            .resolve_name(SaveTrigger::Manual, None, Utc::now())
            .unwrap();
        assert_eq!(again, name);
    }

    #[test]
    fn test_supplied_name_wins_and_sticks() {
        let mut coordinator = SaveCoordinator::new();
        let name = coordinator
            .resolve_name(SaveTrigger::Manual, Some(" My Letter ".into()), Utc::now())
            .unwrap();
        assert_eq!(name, "My Letter");
        assert_eq!(coordinator.draft_name(), Some("My Letter"));
    }

    #[test]
    fn test_failure_retry_budget() {
        let mut coordinator = SaveCoordinator::new();
        let failure = SyncError::Persistence("boom".into());

        assert!(coordinator.complete_failure(&failure));
        assert!(coordinator.complete_failure(&failure));
        assert!(coordinator.complete_failure(&failure));
        // Budget of 3 exhausted
        assert!(!coordinator.complete_failure(&failure));
        assert_eq!(coordinator.save_state(), SaveState::Error);

        // Success resets the budget
        coordinator.complete_success(&record("p-1", "n"), Utc::now());
        assert_eq!(coordinator.retry_count(), 0);
        assert!(coordinator.complete_failure(&failure));
    }

    #[test]
    fn test_auth_and_validation_failures_never_schedule_retries() {
        let mut coordinator = SaveCoordinator::new();
        assert!(!coordinator.complete_failure(&SyncError::AuthenticationRequired));
        assert!(!coordinator.complete_failure(&SyncError::Validation("name".into())));
        assert!(!coordinator.complete_failure(&SyncError::NetworkUnavailable));
        assert_eq!(coordinator.save_state(), SaveState::Error);
    }

    #[test]
    fn test_for_record_starts_bound_and_saved() {
        let coordinator = SaveCoordinator::for_record(&record("p-9", "Existing"));
        assert_eq!(coordinator.identity().id(), Some("p-9"));
        assert_eq!(coordinator.save_state(), SaveState::Saved);
        assert_eq!(coordinator.draft_name(), Some("Existing"));
    }
}
