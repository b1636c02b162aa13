//! Sync engine: the orchestrator, its state and its timers

mod background;
pub mod context;
pub mod error;
pub mod hash;
mod mutations;
pub mod orchestrator;

pub use context::{HealReport, SyncContext, SyncStatus};
pub use error::{SyncError, SyncResult};
pub use hash::content_hash;
pub use mutations::NewSlot;
pub use orchestrator::SyncOrchestrator;
