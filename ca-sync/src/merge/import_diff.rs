//! Change summary for an external lesson import

use ca_common::ScheduleSlot;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// What an import changed relative to the stored external slots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDiff {
    /// Incoming slots with an id not seen before
    pub added: Vec<ScheduleSlot>,
    /// Students whose existing lesson moved (trimmed, de-duplicated, first-seen order)
    pub updated: Vec<String>,
    pub deleted_count: usize,
}

/// `upper(dayOfWeek-time-studentName)`
pub fn signature(slot: &ScheduleSlot) -> String {
    format!("{}-{}-{}", slot.day_of_week, slot.time, slot.student_name).to_uppercase()
}

fn signature_map(slots: &[ScheduleSlot]) -> HashMap<&str, String> {
    slots.iter().map(|s| (s.id.as_str(), signature(s))).collect()
}

/// Compare the previous external partition with a freshly imported one
pub fn diff(previous: &[ScheduleSlot], incoming: &[ScheduleSlot]) -> ImportDiff {
    let previous_sigs = signature_map(previous);

    let mut added = Vec::new();
    let mut updated = Vec::new();
    let mut updated_seen = HashSet::new();
    let mut still_present: HashSet<&str> = HashSet::new();

    for slot in incoming {
        match previous_sigs.get(slot.id.as_str()) {
            None => added.push(slot.clone()),
            Some(previous_sig) => {
                still_present.insert(slot.id.as_str());
                if *previous_sig != signature(slot) {
                    let name = slot.student_name.trim().to_string();
                    if updated_seen.insert(name.clone()) {
                        updated.push(name);
                    }
                }
            }
        }
    }

    ImportDiff {
        added,
        updated,
        deleted_count: previous.len().saturating_sub(still_present.len()),
    }
}

/// Whether an incoming batch differs from what is stored
///
/// True when any incoming slot is new or moved, or when fewer lessons came
/// back than are stored.
pub fn has_changes(previous: &[ScheduleSlot], incoming: &[ScheduleSlot]) -> bool {
    let previous_sigs = signature_map(previous);
    let changed = incoming.iter().any(|slot| {
        previous_sigs
            .get(slot.id.as_str())
            .map_or(true, |sig| *sig != signature(slot))
    });
    changed || incoming.len() < previous_sigs.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn em(id: u32, dow: u8, time: &str, student: &str) -> ScheduleSlot {
        ScheduleSlot {
            id: format!("em-{}", id),
            teacher_id: "t-ANA".to_string(),
            day_of_week: dow,
            time: time.to_string(),
            student_name: student.to_string(),
            instrument: "Canto".to_string(),
            is_experimental: false,
            date: Some("2024-03-05".to_string()),
            created_at: 0,
        }
    }

    #[test]
    fn test_moved_lesson_is_updated_not_added() {
        let previous = vec![em(500, 2, "10:00", "Maria")];
        let incoming = vec![em(500, 2, "11:00", "Maria")];

        let result = diff(&previous, &incoming);

        assert!(result.added.is_empty());
        assert_eq!(result.updated, vec!["Maria".to_string()]);
        assert_eq!(result.deleted_count, 0);
    }

    #[test]
    fn test_removed_lesson_counts_as_deleted() {
        let previous: Vec<_> = (1..=5).map(|i| em(i, 1, "09:00", "Aluno")).collect();
        let incoming: Vec<_> = (1..=4).map(|i| em(i, 1, "09:00", "Aluno")).collect();

        let result = diff(&previous, &incoming);

        assert_eq!(result.deleted_count, 1);
        assert!(result.added.is_empty());
        assert!(result.updated.is_empty());
    }

    #[test]
    fn test_new_ids_are_added() {
        let previous = vec![em(1, 1, "09:00", "Ana")];
        let incoming = vec![em(1, 1, "09:00", "Ana"), em(2, 3, "18:00", "Bruno")];

        let result = diff(&previous, &incoming);

        assert_eq!(result.added.len(), 1);
        assert_eq!(result.added[0].id, "em-2");
        assert_eq!(result.deleted_count, 0);
    }

    #[test]
    fn test_signature_ignores_case() {
        let previous = vec![em(7, 1, "09:00", "ana souza")];
        let incoming = vec![em(7, 1, "09:00", "ANA SOUZA")];
        assert!(diff(&previous, &incoming).updated.is_empty());
    }

    #[test]
    fn test_updated_names_trimmed_and_unique() {
        let previous = vec![em(1, 1, "09:00", "Caio "), em(2, 1, "10:00", " Caio")];
        let incoming = vec![em(1, 2, "09:00", "Caio "), em(2, 2, "10:00", " Caio")];
        assert_eq!(diff(&previous, &incoming).updated, vec!["Caio".to_string()]);
    }

    #[test]
    fn test_deleted_count_never_negative() {
        let cases: Vec<(Vec<ScheduleSlot>, Vec<ScheduleSlot>)> = vec![
            (vec![], vec![]),
            (vec![], vec![em(1, 1, "09:00", "A"), em(2, 1, "09:00", "B")]),
            (vec![em(1, 1, "09:00", "A")], vec![em(1, 1, "09:00", "A"), em(1, 1, "09:00", "A")]),
            (vec![em(1, 1, "09:00", "A")], vec![]),
        ];
        let expected = [0, 0, 0, 1];
        for ((previous, incoming), want) in cases.iter().zip(expected) {
            assert_eq!(diff(previous, incoming).deleted_count, want);
        }
    }

    #[test]
    fn test_has_changes() {
        let stored = vec![em(1, 1, "09:00", "A"), em(2, 1, "10:00", "B")];

        assert!(!has_changes(&stored, &stored));
        assert!(has_changes(&stored, &[em(1, 1, "09:00", "A")]), "lesson removed");
        assert!(has_changes(&stored, &[em(1, 1, "09:30", "A"), em(2, 1, "10:00", "B")]));
        assert!(has_changes(&stored, &[em(1, 1, "09:00", "A"), em(3, 1, "10:00", "B")]));
    }
}
