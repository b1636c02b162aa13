//! Load-time merge of the remote and local snapshots
//!
//! Remote is the priority source: its teachers are visited first by the
//! unifier, its slots win first-seen dedup and its confirmation list wins
//! for a date both sides carry.

use super::reconciler::merge_slot_sources;
use super::unifier::{unify, Redirects};
use ca_common::{Confirmations, Expense, Snapshot};
use std::collections::HashSet;
use tracing::info;

/// Merged state plus what the remote store holds that is now obsolete
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedSnapshot {
    pub snapshot: Snapshot,
    pub redirect: Redirects,
    /// Remote teacher ids absent from the canonical set
    pub superseded_teacher_ids: Vec<String>,
    /// Remote slot ids dropped by dedup
    pub superseded_slot_ids: Vec<String>,
}

impl MergedSnapshot {
    /// Whether the remote store needs repairing to match
    pub fn remote_diverges(&self) -> bool {
        !self.superseded_teacher_ids.is_empty() || !self.superseded_slot_ids.is_empty()
    }
}

/// Per-date union; `primary` wins a date both sides have
pub fn merge_confirmations(primary: &Confirmations, secondary: &Confirmations) -> Confirmations {
    let mut merged = secondary.clone();
    for (date, ids) in primary {
        merged.insert(date.clone(), ids.clone());
    }
    merged
}

/// Primary when non-empty, else secondary
pub fn merge_expenses(primary: &[Expense], secondary: &[Expense]) -> Vec<Expense> {
    if primary.is_empty() {
        secondary.to_vec()
    } else {
        primary.to_vec()
    }
}

/// Ids of `remote` that no longer appear in `kept`
fn superseded<'a, I>(remote: I, kept: &HashSet<&str>) -> Vec<String>
where
    I: Iterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    remote
        .filter(|id| !kept.contains(id) && seen.insert(*id))
        .map(str::to_string)
        .collect()
}

/// Combine the remote and local snapshots into one canonical snapshot
pub fn merge_snapshots(remote: &Snapshot, local: &Snapshot) -> MergedSnapshot {
    let records: Vec<_> = remote
        .teachers
        .iter()
        .chain(local.teachers.iter())
        .cloned()
        .collect();
    let unified = unify(&records);

    let slots = merge_slot_sources(&[remote.slots.as_slice(), local.slots.as_slice()], &unified.redirect);

    let teacher_ids: HashSet<&str> = unified.canonical.iter().map(|t| t.id.as_str()).collect();
    let superseded_teacher_ids = superseded(remote.teachers.iter().map(|t| t.id.as_str()), &teacher_ids);

    let slot_ids: HashSet<&str> = slots.iter().map(|s| s.id.as_str()).collect();
    let superseded_slot_ids = superseded(remote.slots.iter().map(|s| s.id.as_str()), &slot_ids);

    let snapshot = Snapshot {
        teachers: unified.canonical,
        slots,
        confirmations: merge_confirmations(&remote.confirmations, &local.confirmations),
        expenses: merge_expenses(&remote.expenses, &local.expenses),
    };

    info!(
        teachers = snapshot.teachers.len(),
        slots = snapshot.slots.len(),
        superseded_teachers = superseded_teacher_ids.len(),
        superseded_slots = superseded_slot_ids.len(),
        "Merged remote and local snapshots"
    );

    MergedSnapshot {
        snapshot,
        redirect: unified.redirect,
        superseded_teacher_ids,
        superseded_slot_ids,
    }
}
