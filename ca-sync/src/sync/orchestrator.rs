//! Sync orchestrator
//!
//! Owns the canonical in-memory state and is the only component that
//! commits changes to it. Coordinates the load-time merge of local cache and
//! remote store, the debounced write-back, remote divergence polling, remote
//! healing and the external lesson import.
//!
//! # Phases
//! INITIALIZING → LOADED → (SYNCING ⇄ IDLE), or INITIALIZING → FAILED when
//! neither source could be read. FAILED is left only through [`SyncOrchestrator::reset`].

use super::context::{HealReport, SyncContext, SyncStatus};
use super::error::{SyncError, SyncResult};
use super::hash::content_hash;
use crate::merge::{has_changes, import_batch, lessons_to_batch, merge_snapshots, ImportDiff};
use crate::schedule::{self, DaySchedule};
use crate::stores::{LessonSource, LocalCache, RawLesson, RemoteStore};
use ca_common::config::SyncConfig;
use ca_common::events::{ChangeSource, EventBus, NotificationLevel, SyncEvent, SyncPhase};
use ca_common::time::{month_range, now_millis, today};
use ca_common::{LocalSnapshot, Snapshot};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Ids due for deletion, drained from the context for one push
struct Deletions {
    teachers: Vec<String>,
    slots: Vec<String>,
    expenses: Vec<String>,
}

fn id_set<'a>(ids: impl Iterator<Item = &'a str>) -> HashSet<&'a str> {
    ids.collect()
}

pub struct SyncOrchestrator {
    pub(super) local_cache: Arc<dyn LocalCache>,
    pub(super) remote: Arc<dyn RemoteStore>,
    pub(super) lessons: Arc<dyn LessonSource>,
    pub(super) context: RwLock<SyncContext>,
    pub(super) event_bus: EventBus,
    pub(super) config: SyncConfig,
    pub(super) shutdown: CancellationToken,
    /// Pending debounced push
    pub(super) debounce: Mutex<Option<JoinHandle<()>>>,
    /// Held for the duration of every remote push
    pub(super) remote_lock: Mutex<()>,
}

impl SyncOrchestrator {
    pub fn new(
        local_cache: Arc<dyn LocalCache>,
        remote: Arc<dyn RemoteStore>,
        lessons: Arc<dyn LessonSource>,
        event_bus: EventBus,
        config: SyncConfig,
    ) -> Self {
        Self {
            local_cache,
            remote,
            lessons,
            context: RwLock::new(SyncContext::default()),
            event_bus,
            config,
            shutdown: CancellationToken::new(),
            debounce: Mutex::new(None),
            remote_lock: Mutex::new(()),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn phase(&self) -> SyncPhase {
        self.context.read().await.phase
    }

    pub async fn status(&self) -> SyncStatus {
        SyncStatus::from(&*self.context.read().await)
    }

    /// Copy of the full in-memory state
    pub async fn snapshot(&self) -> SyncResult<LocalSnapshot> {
        let ctx = self.context.read().await;
        if !ctx.phase.is_ready() {
            return Err(SyncError::NotLoaded(ctx.phase));
        }
        Ok(ctx.local.clone())
    }

    pub async fn day_schedule(&self, date: &str, teacher_id: Option<&str>) -> SyncResult<DaySchedule> {
        let ctx = self.context.read().await;
        if !ctx.phase.is_ready() {
            return Err(SyncError::NotLoaded(ctx.phase));
        }
        schedule::day_schedule(&ctx.local, date, teacher_id)
            .ok_or_else(|| SyncError::InvalidInput(format!("Invalid date: {date}")))
    }

    pub async fn lesson_count(&self, date: &str, teacher_id: Option<&str>) -> SyncResult<usize> {
        let ctx = self.context.read().await;
        if !ctx.phase.is_ready() {
            return Err(SyncError::NotLoaded(ctx.phase));
        }
        Ok(schedule::lesson_count(&ctx.local, date, teacher_id))
    }

    // ------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------

    pub(super) fn transition(&self, ctx: &mut SyncContext, new_phase: SyncPhase) {
        if ctx.phase == new_phase {
            return;
        }
        let old_phase = ctx.phase;
        ctx.phase = new_phase;
        info!(?old_phase, ?new_phase, "Sync phase changed");
        self.event_bus.emit_lossy(SyncEvent::PhaseChanged {
            old_phase,
            new_phase,
            timestamp: Utc::now(),
        });
    }

    /// Move between SYNCING and IDLE; never leaves INITIALIZING or FAILED
    async fn set_active_phase(&self, phase: SyncPhase) {
        let mut ctx = self.context.write().await;
        if ctx.phase.is_ready() {
            self.transition(&mut ctx, phase);
        }
    }

    pub(super) fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        self.event_bus.emit_lossy(SyncEvent::notification(level, message));
    }

    pub(super) async fn ensure_ready(&self) -> SyncResult<()> {
        let phase = self.phase().await;
        if phase.is_ready() {
            Ok(())
        } else {
            Err(SyncError::NotLoaded(phase))
        }
    }

    async fn save_local(&self, local: &LocalSnapshot) {
        if let Err(e) = self.local_cache.save(local).await {
            warn!(error = %e, "Failed to write local cache");
            self.notify(NotificationLevel::Error, format!("Could not save local copy: {e}"));
        }
    }

    async fn debounce_active(&self) -> bool {
        self.debounce
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    async fn cancel_debounce(&self) {
        if let Some(handle) = self.debounce.lock().await.take() {
            handle.abort();
        }
    }

    async fn write_remote(&self, snapshot: &Snapshot, deletions: &Deletions) -> ca_common::Result<()> {
        if !deletions.teachers.is_empty() {
            self.remote.delete_teachers(&deletions.teachers).await?;
        }
        if !deletions.slots.is_empty() {
            self.remote.delete_slots(&deletions.slots).await?;
        }
        if !deletions.expenses.is_empty() {
            self.remote.delete_expenses(&deletions.expenses).await?;
        }
        self.remote.upsert_all(snapshot).await
    }

    // ------------------------------------------------------------------
    // Load
    // ------------------------------------------------------------------

    /// Read both sources concurrently and merge them
    ///
    /// A failing source counts as empty; only both failing is fatal.
    pub async fn initial_load(&self) -> SyncResult<()> {
        self.load_with_source(ChangeSource::InitialLoad).await
    }

    async fn load_with_source(&self, source: ChangeSource) -> SyncResult<()> {
        info!("Loading local cache and remote store");
        let (local_result, remote_result) =
            tokio::join!(self.local_cache.load(), self.remote.fetch_snapshot());

        let (local, remote) = match (local_result, remote_result) {
            (Err(local_err), Err(remote_err)) => {
                let err = SyncError::Fatal {
                    local: local_err.to_string(),
                    remote: remote_err.to_string(),
                };
                error!("{}", err);
                let mut ctx = self.context.write().await;
                ctx.fatal_error = Some(err.to_string());
                self.transition(&mut ctx, SyncPhase::Failed);
                return Err(err);
            }
            (local, remote) => (local, remote),
        };

        let local = local.unwrap_or_else(|e| {
            warn!(error = %e, "Local cache unreadable, starting from remote only");
            self.notify(NotificationLevel::Error, "Local data was unreadable and has been ignored");
            LocalSnapshot::default()
        });
        let remote = match remote {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(error = %e, "Remote store unreachable, continuing in local-only mode");
                self.notify(NotificationLevel::Error, "Remote store unreachable, working offline");
                None
            }
        };

        let empty = Snapshot::default();
        let merged = merge_snapshots(remote.as_ref().unwrap_or(&empty), &local.snapshot);
        let hash = content_hash(&merged.snapshot);
        let remote_in_sync = remote
            .as_ref()
            .is_some_and(|r| content_hash(r) == hash)
            && !merged.remote_diverges();

        let state = LocalSnapshot {
            snapshot: merged.snapshot,
            overrides: local.overrides,
            contacted: local.contacted,
        };

        {
            let mut ctx = self.context.write().await;
            ctx.local = state.clone();
            ctx.fatal_error = None;
            ctx.has_updates = false;
            ctx.last_pushed_hash = remote_in_sync.then(|| hash.clone());
            ctx.push_pending = !remote_in_sync;
            ctx.pending_teacher_deletes.extend(merged.superseded_teacher_ids);
            ctx.pending_slot_deletes.extend(merged.superseded_slot_ids);
            self.transition(&mut ctx, SyncPhase::Loaded);
        }

        info!(
            teachers = state.snapshot.teachers.len(),
            slots = state.snapshot.slots.len(),
            remote_in_sync,
            hash = %hash,
            "Initial load complete"
        );

        self.save_local(&state).await;
        self.event_bus.emit_lossy(SyncEvent::SnapshotChanged {
            source,
            hash,
            timestamp: Utc::now(),
        });

        if self.config.heal_on_load && remote.is_some() {
            if let Err(e) = self.heal_remote().await {
                warn!(error = %e, "Remote heal after load failed");
            }
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Remote write-back
    // ------------------------------------------------------------------

    /// Make the remote store match the in-memory state
    ///
    /// Deletes every queued teacher/slot/expense id that is no longer live,
    /// then upserts the whole snapshot. Does nothing when the snapshot hash
    /// equals the last pushed hash and no deletions are queued, so a second
    /// call without intervening changes performs no writes.
    pub async fn heal_remote(&self) -> SyncResult<HealReport> {
        let _guard = self.remote_lock.lock().await;

        let (snapshot, hash, drained) = {
            let mut ctx = self.context.write().await;
            if !ctx.phase.is_ready() {
                return Err(SyncError::NotLoaded(ctx.phase));
            }
            let hash = content_hash(&ctx.local.snapshot);
            if ctx.last_pushed_hash.as_deref() == Some(hash.as_str()) && !ctx.has_pending_deletes() {
                ctx.push_pending = false;
                debug!(hash = %hash, "Remote store already up to date");
                return Ok(HealReport::default());
            }
            let drained = Deletions {
                teachers: ctx.pending_teacher_deletes.iter().cloned().collect(),
                slots: ctx.pending_slot_deletes.iter().cloned().collect(),
                expenses: ctx.pending_expense_deletes.iter().cloned().collect(),
            };
            (ctx.local.snapshot.clone(), hash, drained)
        };

        // An id that is live again (re-added after deletion) must survive
        let live_teachers = id_set(snapshot.teachers.iter().map(|t| t.id.as_str()));
        let live_slots = id_set(snapshot.slots.iter().map(|s| s.id.as_str()));
        let live_expenses = id_set(snapshot.expenses.iter().map(|e| e.id.as_str()));
        let deletions = Deletions {
            teachers: drained
                .teachers
                .iter()
                .filter(|id| !live_teachers.contains(id.as_str()))
                .cloned()
                .collect(),
            slots: drained
                .slots
                .iter()
                .filter(|id| !live_slots.contains(id.as_str()))
                .cloned()
                .collect(),
            expenses: drained
                .expenses
                .iter()
                .filter(|id| !live_expenses.contains(id.as_str()))
                .cloned()
                .collect(),
        };

        if let Err(e) = self.write_remote(&snapshot, &deletions).await {
            warn!(error = %e, "Remote push failed, will retry");
            self.notify(NotificationLevel::Error, format!("Remote sync failed: {e}"));
            return Err(SyncError::Remote(e));
        }

        let report = HealReport {
            deleted_teachers: deletions.teachers.len(),
            deleted_slots: deletions.slots.len(),
            deleted_expenses: deletions.expenses.len(),
            upserted: true,
        };

        {
            let mut ctx = self.context.write().await;
            for id in &drained.teachers {
                ctx.pending_teacher_deletes.remove(id);
            }
            for id in &drained.slots {
                ctx.pending_slot_deletes.remove(id);
            }
            for id in &drained.expenses {
                ctx.pending_expense_deletes.remove(id);
            }
            // Edits that landed during the push stay pending
            ctx.push_pending = content_hash(&ctx.local.snapshot) != hash;
            ctx.last_pushed_hash = Some(hash.clone());
        }

        info!(
            deleted_teachers = report.deleted_teachers,
            deleted_slots = report.deleted_slots,
            deleted_expenses = report.deleted_expenses,
            hash = %hash,
            "Remote store updated"
        );
        self.event_bus.emit_lossy(SyncEvent::RemoteHealed {
            deleted_teachers: report.deleted_teachers,
            deleted_slots: report.deleted_slots,
            upserted: report.upserted,
            timestamp: Utc::now(),
        });

        Ok(report)
    }

    /// Persist locally now and push to the remote store after the debounce delay
    ///
    /// Every call restarts the delay. The push reads the state current at
    /// fire time.
    pub async fn schedule_write_back(self: &Arc<Self>, source: ChangeSource) {
        let (local, hash) = {
            let mut ctx = self.context.write().await;
            ctx.push_pending = true;
            (ctx.local.clone(), content_hash(&ctx.local.snapshot))
        };

        self.save_local(&local).await;
        self.event_bus.emit_lossy(SyncEvent::SnapshotChanged {
            source,
            hash,
            timestamp: Utc::now(),
        });

        let mut pending = self.debounce.lock().await;
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        if self.shutdown.is_cancelled() {
            return;
        }

        let this = Arc::clone(self);
        let delay = self.config.debounce();
        *pending = Some(tokio::spawn(async move {
            tokio::select! {
                _ = this.shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if let Err(e) = this.heal_remote().await {
                        debug!(error = %e, "Debounced push did not complete");
                    }
                }
            }
        }));
    }

    /// Push immediately if anything is waiting
    pub async fn flush(&self) -> SyncResult<HealReport> {
        let waiting = {
            let ctx = self.context.read().await;
            ctx.phase.is_ready() && (ctx.push_pending || ctx.has_pending_deletes())
        };
        if waiting {
            self.heal_remote().await
        } else {
            Ok(HealReport::default())
        }
    }

    // ------------------------------------------------------------------
    // Remote polling
    // ------------------------------------------------------------------

    /// Re-fetch the remote snapshot and adopt collections that changed elsewhere
    ///
    /// Teachers and slots are compared by id set, confirmations and expenses
    /// by full equality. While local changes wait to be pushed the poll
    /// retries the push instead (unless a debounced push is still scheduled).
    /// Returns whether in-memory state changed.
    pub async fn poll_for_divergence(&self) -> SyncResult<bool> {
        if self.shutdown.is_cancelled() {
            return Ok(false);
        }

        let needs_push = {
            let ctx = self.context.read().await;
            if !ctx.phase.is_ready() {
                return Ok(false);
            }
            ctx.push_pending || ctx.has_pending_deletes()
        };
        if needs_push {
            if !self.debounce_active().await {
                debug!("Retrying pending remote push from poll");
                self.heal_remote().await?;
            }
            return Ok(false);
        }

        let Ok(_guard) = self.remote_lock.try_lock() else {
            debug!("Remote push in flight, skipping poll");
            return Ok(false);
        };

        let remote = self.remote.fetch_snapshot().await.map_err(|e| {
            warn!(error = %e, "Remote poll failed");
            SyncError::Remote(e)
        })?;

        if self.shutdown.is_cancelled() {
            debug!("Discarding poll result after shutdown");
            return Ok(false);
        }

        let (changed, local, hash) = {
            let mut ctx = self.context.write().await;
            if !ctx.phase.is_ready() || ctx.push_pending || ctx.has_pending_deletes() {
                return Ok(false);
            }

            let current = &mut ctx.local.snapshot;
            let mut changed: Vec<&'static str> = Vec::new();

            let teachers_differ = id_set(current.teachers.iter().map(|t| t.id.as_str()))
                != id_set(remote.teachers.iter().map(|t| t.id.as_str()));
            if teachers_differ {
                current.teachers = remote.teachers.clone();
                changed.push("teachers");
            }

            let slots_differ = id_set(current.slots.iter().map(|s| s.id.as_str()))
                != id_set(remote.slots.iter().map(|s| s.id.as_str()));
            if slots_differ {
                current.slots = remote.slots.clone();
                changed.push("slots");
            }

            if current.confirmations != remote.confirmations {
                current.confirmations = remote.confirmations.clone();
                changed.push("confirmations");
            }

            if current.expenses != remote.expenses {
                current.expenses = remote.expenses.clone();
                changed.push("expenses");
            }

            if changed.is_empty() {
                return Ok(false);
            }

            let hash = content_hash(current);
            if hash == content_hash(&remote) {
                ctx.last_pushed_hash = Some(hash.clone());
            }
            (changed, ctx.local.clone(), hash)
        };

        info!(changed = ?changed, "Adopted remote changes");
        self.save_local(&local).await;
        self.event_bus.emit_lossy(SyncEvent::SnapshotChanged {
            source: ChangeSource::RemotePoll,
            hash,
            timestamp: Utc::now(),
        });
        Ok(true)
    }

    // ------------------------------------------------------------------
    // External lessons
    // ------------------------------------------------------------------

    /// Fold a batch of raw lessons into the state and push the result
    ///
    /// An empty batch leaves the state untouched and yields `NoLessons`.
    pub async fn import_external_batch(
        self: &Arc<Self>,
        lessons: &[RawLesson],
        range_label: &str,
    ) -> SyncResult<ImportDiff> {
        let batch = lessons_to_batch(lessons, now_millis());
        if batch.slots.is_empty() {
            info!(range = %range_label, fetched = lessons.len(), "No usable lessons in batch");
            return Err(SyncError::NoLessons(range_label.to_string()));
        }

        let diff = {
            let mut ctx = self.context.write().await;
            if !ctx.phase.is_ready() {
                return Err(SyncError::NotLoaded(ctx.phase));
            }
            let outcome = import_batch(batch, &ctx.local.snapshot.teachers, &ctx.local.snapshot.slots);
            ctx.local.snapshot.teachers = outcome.teachers;
            ctx.local.snapshot.slots = outcome.slots;
            ctx.pending_teacher_deletes.extend(outcome.redirect.into_keys());
            ctx.pending_slot_deletes.extend(outcome.removed_slot_ids);
            ctx.has_updates = false;
            outcome.diff
        };

        info!(
            range = %range_label,
            added = diff.added.len(),
            updated = diff.updated.len(),
            deleted = diff.deleted_count,
            "External lessons imported"
        );

        self.schedule_write_back(ChangeSource::ExternalImport).await;
        if let Err(e) = self.heal_remote().await {
            warn!(error = %e, "Remote heal after import failed");
        }

        self.event_bus.emit_lossy(SyncEvent::ImportCompleted {
            added: diff.added.len(),
            updated: diff.updated.clone(),
            deleted: diff.deleted_count,
            timestamp: Utc::now(),
        });
        self.notify(
            NotificationLevel::Success,
            format!(
                "Lessons synced: {} new, {} changed, {} removed",
                diff.added.len(),
                diff.updated.len(),
                diff.deleted_count
            ),
        );

        Ok(diff)
    }

    /// Import the current calendar month from the lesson API
    pub async fn sync_from_lesson_api(self: &Arc<Self>) -> SyncResult<ImportDiff> {
        self.ensure_ready().await?;
        self.set_active_phase(SyncPhase::Syncing).await;

        let day = today();
        let (start, end) = month_range(day);
        let label = day.format("%Y-%m").to_string();

        let result = match self.lessons.fetch_lessons_in_range(start, end).await {
            Ok(lessons) => self.import_external_batch(&lessons, &label).await,
            Err(e) => {
                warn!(error = %e, "Lesson API request failed");
                Err(SyncError::from(e))
            }
        };

        self.set_active_phase(SyncPhase::Idle).await;

        if let Err(e) = &result {
            self.notify(NotificationLevel::Error, format!("Lesson sync failed: {e}"));
        }
        result
    }

    /// Whether the lesson API has lessons that differ from the stored ones
    ///
    /// Sets the `has_updates` flag and announces the first detection.
    pub async fn check_for_updates(&self) -> SyncResult<bool> {
        self.ensure_ready().await?;

        let (start, end) = month_range(today());
        let lessons = self.lessons.fetch_lessons_in_range(start, end).await?;
        let batch = lessons_to_batch(&lessons, now_millis());
        if batch.slots.is_empty() {
            return Ok(false);
        }

        let mut ctx = self.context.write().await;
        if !ctx.phase.is_ready() {
            return Ok(false);
        }
        let found = has_changes(&ctx.local.snapshot.external_slots(), &batch.slots);
        let newly_found = found && !ctx.has_updates;
        ctx.has_updates = found;
        drop(ctx);

        if newly_found {
            info!("New lesson data available from the lesson API");
            self.event_bus.emit_lossy(SyncEvent::UpdatesAvailable { timestamp: Utc::now() });
        }
        Ok(found)
    }

    // ------------------------------------------------------------------
    // Recovery and teardown
    // ------------------------------------------------------------------

    /// Clear the local cache, forget all in-memory state and load again
    pub async fn reset(&self) -> SyncResult<()> {
        warn!("Resetting local data");
        self.cancel_debounce().await;
        let guard = self.remote_lock.lock().await;

        self.local_cache.clear().await.map_err(SyncError::LocalCache)?;
        {
            let mut ctx = self.context.write().await;
            let old_phase = ctx.phase;
            *ctx = SyncContext {
                phase: old_phase,
                ..SyncContext::default()
            };
            self.transition(&mut ctx, SyncPhase::Initializing);
        }
        drop(guard);

        self.notify(NotificationLevel::Info, "Local data cleared, reloading");
        self.load_with_source(ChangeSource::Reset).await
    }

    /// Stop timers; results of polls in flight are discarded
    pub async fn shutdown(&self) {
        info!("Stopping sync orchestrator");
        self.shutdown.cancel();
        self.cancel_debounce().await;
    }
}
