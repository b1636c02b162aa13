//! Mutable state owned by one orchestrator instance

use ca_common::events::SyncPhase;
use ca_common::LocalSnapshot;
use serde::Serialize;
use std::collections::BTreeSet;

/// Everything the orchestrator guards behind its lock
#[derive(Debug, Clone)]
pub struct SyncContext {
    /// Canonical in-memory state, device-local parts included
    pub local: LocalSnapshot,
    pub phase: SyncPhase,
    /// Hash of the snapshot last written to (or read identical from) the remote store
    pub last_pushed_hash: Option<String>,
    /// Remote teacher rows to delete on the next push
    pub pending_teacher_deletes: BTreeSet<String>,
    /// Remote slot rows to delete on the next push
    pub pending_slot_deletes: BTreeSet<String>,
    /// Remote expense rows to delete on the next push
    pub pending_expense_deletes: BTreeSet<String>,
    /// Local edits not yet pushed
    pub push_pending: bool,
    /// Set by the background update check
    pub has_updates: bool,
    /// Cause of the FAILED phase
    pub fatal_error: Option<String>,
}

impl Default for SyncContext {
    fn default() -> Self {
        Self {
            local: LocalSnapshot::default(),
            phase: SyncPhase::Initializing,
            last_pushed_hash: None,
            pending_teacher_deletes: BTreeSet::new(),
            pending_slot_deletes: BTreeSet::new(),
            pending_expense_deletes: BTreeSet::new(),
            push_pending: false,
            has_updates: false,
            fatal_error: None,
        }
    }
}

impl SyncContext {
    pub fn has_pending_deletes(&self) -> bool {
        !self.pending_teacher_deletes.is_empty()
            || !self.pending_slot_deletes.is_empty()
            || !self.pending_expense_deletes.is_empty()
    }
}

/// Read-only view for status endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub has_updates: bool,
    pub push_pending: bool,
    pub last_pushed_hash: Option<String>,
    pub teacher_count: usize,
    pub slot_count: usize,
    pub pending_deletes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal_error: Option<String>,
}

impl From<&SyncContext> for SyncStatus {
    fn from(ctx: &SyncContext) -> Self {
        SyncStatus {
            phase: ctx.phase,
            has_updates: ctx.has_updates,
            push_pending: ctx.push_pending,
            last_pushed_hash: ctx.last_pushed_hash.clone(),
            teacher_count: ctx.local.snapshot.teachers.len(),
            slot_count: ctx.local.snapshot.slots.len(),
            pending_deletes: ctx.pending_teacher_deletes.len()
                + ctx.pending_slot_deletes.len()
                + ctx.pending_expense_deletes.len(),
            fatal_error: ctx.fatal_error.clone(),
        }
    }
}

/// Remote writes performed by one heal/push
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealReport {
    pub deleted_teachers: usize,
    pub deleted_slots: usize,
    pub deleted_expenses: usize,
    pub upserted: bool,
}

impl HealReport {
    pub fn wrote_anything(&self) -> bool {
        self.upserted
            || self.deleted_teachers > 0
            || self.deleted_slots > 0
            || self.deleted_expenses > 0
    }
}
