//! Slot reconciliation
//!
//! Rewrites slot teacher references through a redirect map and removes
//! content duplicates. Rewriting alone never changes the slot count; only
//! [`dedup`] drops slots.

use super::unifier::Redirects;
use ca_common::ScheduleSlot;
use std::collections::HashSet;
use tracing::debug;

/// Point every slot at its canonical teacher
///
/// Slots whose teacher id has no redirect entry keep it unchanged (an
/// orphaned reference is retained, never dropped).
pub fn reconcile(slots: &[ScheduleSlot], redirect: &Redirects) -> Vec<ScheduleSlot> {
    slots
        .iter()
        .map(|slot| match redirect.get(&slot.teacher_id) {
            Some(canonical) if canonical != &slot.teacher_id => ScheduleSlot {
                teacher_id: canonical.clone(),
                ..slot.clone()
            },
            _ => slot.clone(),
        })
        .collect()
}

/// `teacherId-dayOfWeek-time-STUDENT-date|RECURRING`
pub fn dedup_key(slot: &ScheduleSlot) -> String {
    format!(
        "{}-{}-{}-{}-{}",
        slot.teacher_id,
        slot.day_of_week,
        slot.time,
        slot.student_name.to_uppercase(),
        slot.date.as_deref().unwrap_or("RECURRING")
    )
}

/// Drop slots whose dedup key was already seen; first occurrence wins
pub fn dedup(slots: Vec<ScheduleSlot>) -> Vec<ScheduleSlot> {
    let before = slots.len();
    let mut seen = HashSet::new();
    let kept: Vec<ScheduleSlot> = slots
        .into_iter()
        .filter(|slot| seen.insert(dedup_key(slot)))
        .collect();

    if kept.len() != before {
        debug!(dropped = before - kept.len(), "Removed duplicate slots");
    }
    kept
}

/// Merge slot lists given in priority order: redirect, concatenate, dedup
pub fn merge_slot_sources(sources: &[&[ScheduleSlot]], redirect: &Redirects) -> Vec<ScheduleSlot> {
    let combined: Vec<ScheduleSlot> = sources
        .iter()
        .flat_map(|source| reconcile(source, redirect))
        .collect();
    dedup(combined)
}

/// Swap the externally-sourced partition for a fresh batch
///
/// Manual slots (no `em-` prefix) are kept, redirected through `redirect`;
/// the previous external slots are discarded and `batch` is appended
/// verbatim.
pub fn replace_external(
    existing: &[ScheduleSlot],
    batch: Vec<ScheduleSlot>,
    redirect: &Redirects,
) -> Vec<ScheduleSlot> {
    let manual: Vec<ScheduleSlot> = existing.iter().filter(|s| !s.is_external()).cloned().collect();
    let mut slots = reconcile(&manual, redirect);
    slots.extend(batch);
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(id: &str, teacher: &str, dow: u8, time: &str, student: &str) -> ScheduleSlot {
        ScheduleSlot {
            id: id.to_string(),
            teacher_id: teacher.to_string(),
            day_of_week: dow,
            time: time.to_string(),
            student_name: student.to_string(),
            instrument: "Violão".to_string(),
            is_experimental: false,
            date: None,
            created_at: 1_700_000_000_000,
        }
    }

    fn redirects(pairs: &[(&str, &str)]) -> Redirects {
        pairs
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn test_reconcile_rewrites_and_preserves_count() {
        let slots = vec![
            slot("s1", "a1", 2, "14:00", "Maria"),
            slot("s2", "b2", 2, "14:00", "Maria"),
            slot("s3", "orphan", 3, "09:00", "Léo"),
        ];
        let redirect = redirects(&[("a1", "t-X"), ("b2", "t-X")]);

        let result = reconcile(&slots, &redirect);

        assert_eq!(result.len(), slots.len());
        assert_eq!(result[0].teacher_id, "t-X");
        assert_eq!(result[1].teacher_id, "t-X");
        assert_eq!(result[2].teacher_id, "orphan", "unresolved ids pass through");
    }

    #[test]
    fn test_same_lesson_from_two_sources_merges_to_one() {
        let remote = vec![slot("remote-1", "t-ANA", 2, "14:00", "Maria")];
        let local = vec![slot("local-1", "old-ana", 2, "14:00", "MARIA")];
        let redirect = redirects(&[("old-ana", "t-ANA")]);

        let merged = merge_slot_sources(&[remote.as_slice(), local.as_slice()], &redirect);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "remote-1", "first source wins");
    }

    #[test]
    fn test_dated_and_recurring_are_distinct() {
        let recurring = slot("a", "t-ANA", 2, "14:00", "Maria");
        let mut dated = slot("b", "t-ANA", 2, "14:00", "Maria");
        dated.date = Some("2024-03-05".to_string());

        assert_eq!(dedup_key(&recurring), "t-ANA-2-14:00-MARIA-RECURRING");
        assert_eq!(dedup_key(&dated), "t-ANA-2-14:00-MARIA-2024-03-05");
        assert_eq!(dedup(vec![recurring, dated]).len(), 2);
    }

    #[test]
    fn test_dedup_leaves_unique_keys() {
        let slots = vec![
            slot("1", "t-A", 1, "10:00", "x"),
            slot("2", "t-A", 1, "10:00", "X"),
            slot("3", "t-A", 1, "11:00", "x"),
            slot("4", "t-B", 1, "10:00", "x"),
            slot("5", "t-B", 1, "10:00", "x"),
        ];
        let kept = dedup(slots);

        let keys: HashSet<String> = kept.iter().map(dedup_key).collect();
        assert_eq!(keys.len(), kept.len());
        let ids: Vec<&str> = kept.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "4"]);
    }

    #[test]
    fn test_replace_external_keeps_manual_slots() {
        let existing = vec![
            slot("manual-1", "old", 1, "10:00", "Ana"),
            slot("em-1", "t-A", 1, "11:00", "Bia"),
            slot("em-2", "t-A", 1, "12:00", "Caio"),
        ];
        let batch = vec![slot("em-3", "t-A", 4, "15:00", "Duda")];
        let redirect = redirects(&[("old", "t-A")]);

        let result = replace_external(&existing, batch, &redirect);
        let ids: Vec<&str> = result.iter().map(|s| s.id.as_str()).collect();

        assert_eq!(ids, vec!["manual-1", "em-3"]);
        assert_eq!(result[0].teacher_id, "t-A");
    }
}
