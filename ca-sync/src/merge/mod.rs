//! Merge engine
//!
//! Pure functions over snapshots: teacher unification, slot reconciliation,
//! the load-time remote/local merge and the external import path. Nothing
//! here performs I/O or returns errors.

pub mod external;
pub mod import_diff;
pub mod reconciler;
pub mod snapshot;
pub mod unifier;

pub use external::{import_batch, lessons_to_batch, ExternalBatch, ImportOutcome};
pub use import_diff::{diff, has_changes, signature, ImportDiff};
pub use reconciler::{dedup, dedup_key, merge_slot_sources, reconcile, replace_external};
pub use snapshot::{merge_confirmations, merge_expenses, merge_snapshots, MergedSnapshot};
pub use unifier::{collapse_similar, sort_by_display_name, unify, Redirects, Unification};
