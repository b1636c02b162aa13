//! Event types for the ConfirmAula event system
//!
//! Provides the shared SyncEvent enum and the broadcast EventBus used to push
//! sync progress and non-blocking notifications to connected clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Lifecycle of the sync orchestrator
///
/// `Initializing → Loaded → (Syncing ⇄ Idle)`, or `Initializing → Failed`
/// when neither the local cache nor the remote store could be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncPhase {
    Initializing,
    Loaded,
    Syncing,
    Idle,
    Failed,
}

impl SyncPhase {
    /// Whether in-memory state is usable by callers
    pub fn is_ready(self) -> bool {
        matches!(self, SyncPhase::Loaded | SyncPhase::Syncing | SyncPhase::Idle)
    }
}

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// Where a snapshot change came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSource {
    InitialLoad,
    LocalEdit,
    RemotePoll,
    ExternalImport,
    Reset,
}

/// ConfirmAula event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncEvent {
    /// Orchestrator phase transition
    PhaseChanged {
        old_phase: SyncPhase,
        new_phase: SyncPhase,
        timestamp: DateTime<Utc>,
    },

    /// In-memory snapshot replaced
    SnapshotChanged {
        source: ChangeSource,
        /// Content hash of the new snapshot
        hash: String,
        timestamp: DateTime<Utc>,
    },

    /// Non-blocking message for the user (transient failures, confirmations)
    Notification {
        level: NotificationLevel,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// External lesson import finished
    ImportCompleted {
        added: usize,
        updated: Vec<String>,
        deleted: usize,
        timestamp: DateTime<Utc>,
    },

    /// Background check found external lessons that differ from the stored ones
    UpdatesAvailable { timestamp: DateTime<Utc> },

    /// Remote store repaired
    RemoteHealed {
        deleted_teachers: usize,
        deleted_slots: usize,
        upserted: bool,
        timestamp: DateTime<Utc>,
    },
}

impl SyncEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            SyncEvent::PhaseChanged { .. } => "PhaseChanged",
            SyncEvent::SnapshotChanged { .. } => "SnapshotChanged",
            SyncEvent::Notification { .. } => "Notification",
            SyncEvent::ImportCompleted { .. } => "ImportCompleted",
            SyncEvent::UpdatesAvailable { .. } => "UpdatesAvailable",
            SyncEvent::RemoteHealed { .. } => "RemoteHealed",
        }
    }

    pub fn notification(level: NotificationLevel, message: impl Into<String>) -> Self {
        SyncEvent::Notification {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Broadcast bus for SyncEvent
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SyncEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
