//! The editor session: the one object that owns a document's sync state
//!
//! An `EditorSession` owns the document, its history, the change detector,
//! the autosave timer, and the save coordinator state. All timers and
//! references live inside the session — there is no module-level mutable
//! state — and `close()` tears everything down explicitly.
//!
//! Concurrency model: state sits behind one mutex that is never held across
//! an await. A save snapshots the payload and fingerprint under the lock,
//! performs the transport call unlocked, then re-acquires the lock to settle
//! the outcome; completion checks that the session is still open before
//! touching anything. The in-flight flag guarantees at most one transport
//! save per session at a time.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use tokio::task::AbortHandle;

use crate::document::fingerprint::Fingerprint;
use crate::document::history::HistoryStack;
use crate::document::{BlockEdit, BrandKit, ContentBlock, Document, DocumentError, ViewMode};
use crate::store::{ProjectPayload, ProjectRecord, ProjectStatus, ProjectStore};
use crate::sync::coordinator::{SaveCoordinator, RETRY_DELAY};
use crate::sync::detector::ChangeDetector;
use crate::sync::scheduler::{AutoSaveScheduler, AUTO_SAVE_INTERVAL};
use crate::sync::{SaveOutcome, SaveState, SaveTrigger, SyncError};

/// Tunables for a session. Defaults match production behavior; tests inject
/// shorter intervals.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub autosave_interval: Duration,
    pub retry_delay: Duration,
    pub auto_save_enabled: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autosave_interval: AUTO_SAVE_INTERVAL,
            retry_delay: RETRY_DELAY,
            auto_save_enabled: true,
        }
    }
}

struct SessionState {
    document: Document,
    history: HistoryStack,
    detector: ChangeDetector,
    scheduler: AutoSaveScheduler,
    coordinator: SaveCoordinator,
    in_flight: bool,
    auto_save_enabled: bool,
    retry_task: Option<AbortHandle>,
    closed: bool,
}

struct Shared {
    store: ProjectStore,
    config: SessionConfig,
    state: Mutex<SessionState>,
}

/// Handle to one logical editor session. Cheap to clone; all clones drive
/// the same session.
#[derive(Clone)]
pub struct EditorSession {
    shared: Arc<Shared>,
}

impl EditorSession {
    /// Start a session on a brand-new, empty document.
    pub fn new(store: ProjectStore, config: SessionConfig) -> Self {
        Self::build(store, config, Document::new(), SaveCoordinator::new(), None)
    }

    /// Start a session on an existing persisted record.
    ///
    /// The baseline is the hydrated content, so the session opens clean.
    pub fn open(store: ProjectStore, config: SessionConfig, record: &ProjectRecord) -> Self {
        let document = record.content_data.clone();
        let baseline = Fingerprint::compute(&document);
        Self::build(
            store,
            config,
            document,
            SaveCoordinator::for_record(record),
            Some(baseline),
        )
    }

    fn build(
        store: ProjectStore,
        config: SessionConfig,
        document: Document,
        coordinator: SaveCoordinator,
        baseline: Option<Fingerprint>,
    ) -> Self {
        let mut detector = ChangeDetector::new();
        if let Some(baseline) = baseline {
            detector.commit_baseline(baseline);
        }

        let auto_save_enabled = config.auto_save_enabled;
        let state = SessionState {
            history: HistoryStack::new(document.clone()),
            document,
            detector,
            scheduler: AutoSaveScheduler::with_interval(config.autosave_interval),
            coordinator,
            in_flight: false,
            auto_save_enabled,
            retry_task: None,
            closed: false,
        };

        Self {
            shared: Arc::new(Shared {
                store,
                config,
                state: Mutex::new(state),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // === Mutation surface ===
    //
    // Every structural block mutation pushes exactly one history entry after
    // it completes, then re-evaluates dirty state. Brand kit and view mode
    // tweaks re-evaluate without a history entry.

    pub fn insert_block(&self, block: ContentBlock) {
        let mut st = self.state();
        st.document.insert_block(block);
        self.record_mutation(&mut st);
    }

    pub fn remove_block(&self, id: &str) -> Result<ContentBlock, DocumentError> {
        let mut st = self.state();
        let removed = st.document.remove_block(id)?;
        self.record_mutation(&mut st);
        Ok(removed)
    }

    pub fn duplicate_block(&self, id: &str) -> Result<String, DocumentError> {
        let mut st = self.state();
        let new_id = st.document.duplicate_block(id)?;
        self.record_mutation(&mut st);
        Ok(new_id)
    }

    pub fn reorder_blocks(&self, from: usize, to: usize) -> Result<(), DocumentError> {
        let mut st = self.state();
        st.document.reorder_blocks(from, to)?;
        self.record_mutation(&mut st);
        Ok(())
    }

    pub fn edit_block(&self, id: &str, edit: BlockEdit) -> Result<(), DocumentError> {
        let mut st = self.state();
        st.document.edit_block(id, edit)?;
        self.record_mutation(&mut st);
        Ok(())
    }

    pub fn set_brand_kit(&self, brand_kit: BrandKit) {
        let mut st = self.state();
        st.document.set_brand_kit(brand_kit);
        self.reevaluate(&mut st);
    }

    pub fn set_view_mode(&self, view_mode: ViewMode) {
        let mut st = self.state();
        st.document.set_view_mode(view_mode);
        self.reevaluate(&mut st);
    }

    fn record_mutation(&self, st: &mut SessionState) {
        let snapshot = st.document.clone();
        st.history.push(snapshot);
        self.reevaluate(st);
    }

    /// Re-run change detection and keep the save status and autosave timer in
    /// step with it.
    fn reevaluate(&self, st: &mut SessionState) {
        let evaluation = {
            let doc = st.document.clone();
            st.detector.evaluate(&doc)
        };

        if evaluation.dirty {
            st.coordinator.mark_unsaved();
            if evaluation.transitioned {
                self.arm_autosave(st);
            }
        } else if evaluation.transitioned {
            // Back at the baseline (e.g. an undo): nothing left to save.
            st.coordinator.mark_clean();
            st.scheduler.cancel();
        }
    }

    fn arm_autosave(&self, st: &mut SessionState) {
        if !st.auto_save_enabled {
            return;
        }
        let session = self.clone();
        st.scheduler.arm(move || session.deferred_save());
    }

    /// An automatic save attempt for timer and retry tasks. Those tasks are
    /// spawned from inside the save path, so the future is boxed to keep the
    /// save future's type non-recursive.
    fn deferred_save(&self) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        let session = self.clone();
        Box::pin(async move {
            if let Err(e) = session.save(SaveTrigger::Auto, None).await {
                debug!("deferred save attempt failed: {e}");
            }
        })
    }

    // === History ===
    //
    // Undo/redo replace the live document from a retained snapshot; they
    // never touch the network or wait on an in-flight save.

    pub fn can_undo(&self) -> bool {
        self.state().history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.state().history.can_redo()
    }

    /// Step the document back one history entry. Returns false at the
    /// earliest retained entry.
    pub fn undo(&self) -> bool {
        let mut st = self.state();
        match st.history.undo() {
            Some(snapshot) => {
                st.document = snapshot;
                self.reevaluate(&mut st);
                true
            }
            None => false,
        }
    }

    /// Step the document forward one history entry. Returns false at the
    /// latest entry.
    pub fn redo(&self) -> bool {
        let mut st = self.state();
        match st.history.redo() {
            Some(snapshot) => {
                st.document = snapshot;
                self.reevaluate(&mut st);
                true
            }
            None => false,
        }
    }

    // === Host-visible state ===

    /// A snapshot of the current document.
    pub fn document(&self) -> Document {
        self.state().document.clone()
    }

    pub fn save_state(&self) -> SaveState {
        self.state().coordinator.save_state()
    }

    pub fn last_save_time(&self) -> Option<DateTime<Utc>> {
        self.state().coordinator.last_save_time()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state()
            .coordinator
            .last_error()
            .map(|s| s.to_string())
    }

    pub fn draft_id(&self) -> Option<String> {
        self.state()
            .coordinator
            .identity()
            .id()
            .map(|s| s.to_string())
    }

    pub fn draft_name(&self) -> Option<String> {
        self.state()
            .coordinator
            .draft_name()
            .map(|s| s.to_string())
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.state().detector.is_dirty()
    }

    pub fn autosave_pending(&self) -> bool {
        self.state().scheduler.is_armed()
    }

    /// Enable or disable automatic saves. Disabling cancels a pending timer;
    /// manual saves still work.
    pub fn set_auto_save_enabled(&self, enabled: bool) {
        let mut st = self.state();
        st.auto_save_enabled = enabled;
        if !enabled {
            st.scheduler.cancel();
        } else if st.detector.is_dirty() && !st.scheduler.is_armed() {
            self.arm_autosave(&mut st);
        }
    }

    // === Saving ===

    /// User-initiated save. For a never-persisted draft with no name on
    /// record, `name` is required and its absence is a validation error the
    /// host should resolve by prompting.
    pub async fn trigger_manual_save(
        &self,
        name: Option<String>,
    ) -> Result<SaveOutcome, SyncError> {
        self.save(SaveTrigger::Manual, name).await
    }

    /// User-initiated retry after the coordinator gave up; restores the
    /// automatic retry budget.
    pub async fn retry_save(&self) -> Result<SaveOutcome, SyncError> {
        self.state().coordinator.reset_retries();
        self.save(SaveTrigger::Manual, None).await
    }

    async fn save(
        &self,
        trigger: SaveTrigger,
        name: Option<String>,
    ) -> Result<SaveOutcome, SyncError> {
        // Phase 1: snapshot under the lock.
        let (payload, fingerprint, bound_id) = {
            let mut st = self.state();
            if st.closed {
                return Ok(SaveOutcome::Skipped);
            }
            if st.in_flight {
                debug!("save already in flight, coalescing {trigger:?} trigger");
                return Ok(SaveOutcome::Coalesced);
            }

            if trigger == SaveTrigger::Auto
                && (!st.auto_save_enabled || !st.detector.is_dirty() || st.document.is_empty())
            {
                debug!("autosave skipped: nothing worth saving");
                return Ok(SaveOutcome::Skipped);
            }

            let resolved = st.coordinator.resolve_name(trigger, name, Utc::now())?;
            if trigger == SaveTrigger::Manual {
                // The save is going ahead; it supersedes any pending auto
                // timer. A validation failure above leaves the timer armed so
                // a dirty document still gets its automatic save.
                st.scheduler.cancel();
            }
            let payload = ProjectPayload {
                name: resolved,
                content_data: st.document.clone(),
                status: ProjectStatus::Draft,
            };
            // The baseline candidate is the fingerprint of exactly this
            // payload; the live document may move on while we are in flight.
            let fingerprint = Fingerprint::compute(&payload.content_data);

            st.in_flight = true;
            st.coordinator.mark_saving();
            let bound_id = st.coordinator.identity().id().map(str::to_string);
            (payload, fingerprint, bound_id)
        };

        // Phase 2: the transport call, unlocked.
        let result = match &bound_id {
            Some(id) => {
                info!("updating draft {id} ({trigger:?} trigger)");
                self.shared.store.update(id, payload).await
            }
            None => {
                info!("creating draft \"{}\" ({trigger:?} trigger)", payload.name);
                self.shared.store.create(payload).await
            }
        };

        // Phase 3: settle the outcome, verifying the session still stands.
        let mut st = self.state();
        st.in_flight = false;
        if st.closed {
            debug!("session closed while save was in flight, dropping response");
            return Ok(SaveOutcome::Skipped);
        }

        match result {
            Ok(record) => {
                st.coordinator.complete_success(&record, Utc::now());
                st.detector.commit_baseline(fingerprint);
                info!("draft {} saved", record.id);

                // Edits that landed while the save was in flight leave the
                // live document ahead of the committed baseline; pick that up
                // immediately so the next autosave cycle starts now.
                self.reevaluate(&mut st);
                Ok(SaveOutcome::Saved(record.id))
            }
            Err(failure) => {
                error!("save failed: {failure}");
                let schedule_retry = st.coordinator.complete_failure(&failure);
                if schedule_retry {
                    let attempt = st.coordinator.retry_count();
                    info!(
                        "scheduling save retry {attempt}/{} in {:?}",
                        crate::sync::coordinator::MAX_RETRY_ATTEMPTS,
                        self.shared.config.retry_delay
                    );
                    let session = self.clone();
                    let delay = self.shared.config.retry_delay;
                    let task = tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        session.deferred_save().await;
                    });
                    if let Some(previous) = st.retry_task.replace(task.abort_handle()) {
                        previous.abort();
                    }
                } else if matches!(failure, SyncError::NetworkUnavailable)
                    && st.detector.is_dirty()
                {
                    // Offline failures get no fixed-delay retry; the autosave
                    // timer keeps the dirty document on its normal cadence so
                    // the next attempt happens once connectivity returns.
                    self.arm_autosave(&mut st);
                }
                Err(failure)
            }
        }
    }

    // === Lifecycle ===

    /// Best-effort flush for page teardown. If there are unsaved changes, a
    /// fire-and-forget save attempt is launched (no completion guarantee) and
    /// `true` is returned so the host can show an unsaved-changes
    /// confirmation.
    pub fn prepare_unload(&self) -> bool {
        let dirty = {
            let st = self.state();
            !st.closed && st.detector.is_dirty() && !st.document.is_empty()
        };
        if dirty {
            info!("unload with unsaved changes, firing best-effort save");
            tokio::spawn(self.deferred_save());
        }
        dirty
    }

    /// Tear the session down: cancel the pending autosave timer and any
    /// scheduled retry. In-flight requests are not cancelled; their
    /// completions notice the closed flag and do nothing.
    pub fn close(&self) {
        let mut st = self.state();
        st.closed = true;
        st.scheduler.cancel();
        if let Some(task) = st.retry_task.take() {
            task.abort();
        }
        debug!("editor session closed");
    }
}

/// Render a last-save timestamp the way the toolbar shows it.
pub fn format_save_time(time: Option<DateTime<Utc>>) -> String {
    match time {
        None => "Saved".to_string(),
        Some(t) => t.format("%I:%M %p").to_string(),
    }
}
