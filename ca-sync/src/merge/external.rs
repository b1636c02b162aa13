//! External lesson import
//!
//! Turns raw lessons from the practice-management API into `em-` slots and
//! folds them into the current state: incoming teachers are matched against
//! the existing canonical list by similarity, the external partition is
//! replaced wholesale and the change is summarized.

use super::import_diff::{diff, ImportDiff};
use super::reconciler::replace_external;
use super::unifier::{collapse_similar, Redirects};
use crate::identity::{mint_id, similar};
use crate::stores::RawLesson;
use ca_common::time::{day_of_week, parse_date};
use ca_common::{ScheduleSlot, Teacher, EXTERNAL_SLOT_PREFIX};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

pub const UNKNOWN_TEACHER: &str = "DESCONHECIDO";
pub const NO_STUDENT: &str = "SEM ALUNO";
pub const DEFAULT_INSTRUMENT: &str = "GERAL";

/// Teachers and slots decoded from one fetch, before matching
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalBatch {
    pub teachers: Vec<Teacher>,
    pub slots: Vec<ScheduleSlot>,
}

/// Result of folding a batch into the current state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    /// Full teacher list after matching and collapsing, display-sorted
    pub teachers: Vec<Teacher>,
    /// Manual slots followed by the new external partition
    pub slots: Vec<ScheduleSlot>,
    pub diff: ImportDiff,
    /// Teacher ids folded away by the import → surviving id
    pub redirect: Redirects,
    /// External slot ids that disappeared from the API
    pub removed_slot_ids: Vec<String>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Split "YYYY-MM-DD HH:MM:SS" into (date, "HH:MM", weekday)
fn parse_start(starts_at: &str) -> Option<(String, String, u8)> {
    let (date_part, time_part) = starts_at.trim().split_once(' ')?;
    let date = parse_date(date_part)?;
    let time = time_part.get(..5)?;
    Some((date_part.to_string(), time.to_string(), day_of_week(date)))
}

/// Decode raw lessons, dropping cancelled ones
///
/// Teachers are keyed by minted id, first spelling wins.
pub fn lessons_to_batch(lessons: &[RawLesson], created_at: i64) -> ExternalBatch {
    let mut teachers: Vec<Teacher> = Vec::new();
    let mut teacher_ids: HashSet<String> = HashSet::new();
    let mut slots = Vec::with_capacity(lessons.len());

    for lesson in lessons {
        if lesson.cancelled {
            continue;
        }

        let Some((date, time, dow)) = parse_start(&lesson.starts_at) else {
            warn!(lesson_id = lesson.id, starts_at = %lesson.starts_at, "Skipping lesson with unparseable start");
            continue;
        };

        let teacher_name = non_blank(lesson.teacher_names.first().map(String::as_str))
            .unwrap_or(UNKNOWN_TEACHER)
            .to_uppercase();
        let teacher_id = mint_id(&teacher_name);
        if teacher_ids.insert(teacher_id.clone()) {
            teachers.push(Teacher::new(teacher_id.clone(), teacher_name));
        }

        let is_experimental = lesson
            .category
            .as_deref()
            .is_some_and(|c| c.to_lowercase().contains("experimental"));

        slots.push(ScheduleSlot {
            id: format!("{}{}", EXTERNAL_SLOT_PREFIX, lesson.id),
            teacher_id,
            day_of_week: dow,
            time,
            student_name: non_blank(lesson.student_name.as_deref())
                .unwrap_or(NO_STUDENT)
                .to_string(),
            instrument: non_blank(lesson.course_name.as_deref())
                .unwrap_or(DEFAULT_INSTRUMENT)
                .to_string(),
            is_experimental,
            date: Some(date),
            created_at,
        });
    }

    debug!(
        lessons = lessons.len(),
        slots = slots.len(),
        teachers = teachers.len(),
        "Decoded external lessons"
    );

    ExternalBatch { teachers, slots }
}

/// Fold an external batch into the current teachers and slots
///
/// Each incoming teacher is matched against `current_teachers` by id or
/// similarity; a match is renamed when the incoming name is longer, a miss
/// is added under its derived id. A longest-first collapse then folds any
/// teachers that became mutually similar, keeping existing ids.
pub fn import_batch(
    batch: ExternalBatch,
    current_teachers: &[Teacher],
    current_slots: &[ScheduleSlot],
) -> ImportOutcome {
    let mut teachers: Vec<Teacher> = current_teachers.to_vec();
    let mut incoming_to_existing: HashMap<String, String> = HashMap::new();

    for incoming in batch.teachers {
        match teachers
            .iter_mut()
            .find(|t| t.id == incoming.id || similar(&t.name, &incoming.name))
        {
            Some(existing) => {
                if incoming.name.chars().count() > existing.name.chars().count() {
                    debug!(from = %existing.name, to = %incoming.name, "Expanding teacher name");
                    existing.name = incoming.name.clone();
                }
                incoming_to_existing.insert(incoming.id, existing.id.clone());
            }
            None => {
                incoming_to_existing.insert(incoming.id.clone(), incoming.id.clone());
                teachers.push(incoming);
            }
        }
    }

    let (teachers, redirect) = collapse_similar(teachers);

    let external: Vec<ScheduleSlot> = batch
        .slots
        .into_iter()
        .map(|slot| {
            let matched = incoming_to_existing
                .get(&slot.teacher_id)
                .cloned()
                .unwrap_or(slot.teacher_id.clone());
            let teacher_id = redirect.get(&matched).cloned().unwrap_or(matched);
            ScheduleSlot { teacher_id, ..slot }
        })
        .collect();

    let previous_external: Vec<ScheduleSlot> =
        current_slots.iter().filter(|s| s.is_external()).cloned().collect();
    let summary = diff(&previous_external, &external);

    let incoming_ids: HashSet<&str> = external.iter().map(|s| s.id.as_str()).collect();
    let removed_slot_ids: Vec<String> = previous_external
        .iter()
        .filter(|s| !incoming_ids.contains(s.id.as_str()))
        .map(|s| s.id.clone())
        .collect();

    let slots = replace_external(current_slots, external, &redirect);

    ImportOutcome {
        teachers,
        slots,
        diff: summary,
        redirect,
        removed_slot_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(id: i64, teacher: &str, student: &str, starts_at: &str) -> RawLesson {
        RawLesson {
            id,
            cancelled: false,
            teacher_names: vec![teacher.to_string()],
            student_name: Some(student.to_string()),
            course_name: Some("Bateria ".to_string()),
            category: Some("Aula Regular".to_string()),
            starts_at: starts_at.to_string(),
            ends_at: String::new(),
        }
    }

    fn manual(id: &str, teacher: &str) -> ScheduleSlot {
        ScheduleSlot {
            id: id.to_string(),
            teacher_id: teacher.to_string(),
            day_of_week: 1,
            time: "08:00".to_string(),
            student_name: "Manual".to_string(),
            instrument: "Piano".to_string(),
            is_experimental: false,
            date: None,
            created_at: 0,
        }
    }

    #[test]
    fn test_lesson_mapping() {
        let mut trial = lesson(48213, " Aquiles Santos ", "  Maria ", "2024-03-05 14:30:00");
        trial.category = Some("Aula EXPERIMENTAL".to_string());

        let batch = lessons_to_batch(&[trial], 42);

        assert_eq!(batch.teachers, vec![Teacher::new("t-AQUILESSANTOS", "AQUILES SANTOS")]);
        let slot = &batch.slots[0];
        assert_eq!(slot.id, "em-48213");
        assert_eq!(slot.teacher_id, "t-AQUILESSANTOS");
        assert_eq!(slot.day_of_week, 2);
        assert_eq!(slot.time, "14:30");
        assert_eq!(slot.student_name, "Maria");
        assert_eq!(slot.instrument, "Bateria");
        assert!(slot.is_experimental);
        assert_eq!(slot.date.as_deref(), Some("2024-03-05"));
        assert_eq!(slot.created_at, 42);
    }

    #[test]
    fn test_cancelled_and_malformed_lessons_dropped() {
        let mut cancelled = lesson(1, "Ana", "X", "2024-03-05 10:00:00");
        cancelled.cancelled = true;
        let malformed = lesson(2, "Ana", "Y", "05/03/2024");

        let batch = lessons_to_batch(&[cancelled, malformed], 0);
        assert!(batch.slots.is_empty());
        assert!(batch.teachers.is_empty());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let raw = RawLesson {
            id: 9,
            cancelled: false,
            teacher_names: vec![],
            student_name: None,
            course_name: Some("  ".to_string()),
            category: None,
            starts_at: "2024-03-09 09:00:00".to_string(),
            ends_at: String::new(),
        };
        let batch = lessons_to_batch(&[raw], 0);

        assert_eq!(batch.teachers[0].name, UNKNOWN_TEACHER);
        assert_eq!(batch.slots[0].student_name, NO_STUDENT);
        assert_eq!(batch.slots[0].instrument, DEFAULT_INSTRUMENT);
        assert!(!batch.slots[0].is_experimental);
    }

    #[test]
    fn test_import_matches_existing_teacher_by_similarity() {
        let current_teachers = vec![Teacher::new("uuid-aq", "AQUILES SANTOS")];
        let current_slots = vec![manual("m1", "uuid-aq")];
        let batch = lessons_to_batch(
            &[lesson(10, "Aquiles Santos Antony Silva", "Bia", "2024-03-05 10:00:00")],
            0,
        );

        let outcome = import_batch(batch, &current_teachers, &current_slots);

        assert_eq!(
            outcome.teachers,
            vec![Teacher::new("uuid-aq", "AQUILES SANTOS ANTONY SILVA")]
        );
        assert_eq!(outcome.slots.len(), 2);
        assert!(outcome.slots.iter().all(|s| s.teacher_id == "uuid-aq"));
        assert!(outcome.redirect.is_empty());
    }

    #[test]
    fn test_import_folds_similar_names_within_one_batch() {
        let batch = lessons_to_batch(
            &[
                lesson(1, "Aquiles Santos", "A", "2024-03-05 10:00:00"),
                lesson(2, "Aquiles Santos Antony Silva", "B", "2024-03-05 11:00:00"),
            ],
            0,
        );

        let outcome = import_batch(batch, &[], &[]);

        // first spelling claims the id, the longer one expands its name
        assert_eq!(
            outcome.teachers,
            vec![Teacher::new("t-AQUILESSANTOS", "AQUILES SANTOS ANTONY SILVA")]
        );
        assert!(outcome.slots.iter().all(|s| s.teacher_id == "t-AQUILESSANTOS"));
    }

    #[test]
    fn test_import_collapses_existing_teachers_made_similar() {
        let current_teachers = vec![
            Teacher::new("uuid-1", "AQUILES"),
            Teacher::new("uuid-2", "SANTOS"),
        ];
        let current_slots = vec![manual("m1", "uuid-2")];
        let batch = lessons_to_batch(&[lesson(7, "Aquiles Santos", "C", "2024-03-05 10:00:00")], 0);

        let outcome = import_batch(batch, &current_teachers, &current_slots);

        assert_eq!(
            outcome.teachers,
            vec![Teacher::new("uuid-1", "AQUILES SANTOS")]
        );
        assert_eq!(outcome.redirect["uuid-2"], "uuid-1");
        assert!(outcome.slots.iter().all(|s| s.teacher_id == "uuid-1"));
    }

    #[test]
    fn test_import_replaces_external_partition_and_reports() {
        let current_teachers = vec![Teacher::new("t-ANA", "ANA")];
        let mut moved = manual("em-500", "t-ANA");
        moved.time = "10:00".to_string();
        moved.day_of_week = 2;
        moved.student_name = "Maria".to_string();
        let gone = ScheduleSlot {
            id: "em-501".to_string(),
            ..moved.clone()
        };
        let current_slots = vec![manual("m1", "t-ANA"), moved, gone];

        let batch = lessons_to_batch(
            &[
                lesson(500, "Ana", "Maria", "2024-03-05 11:00:00"),
                lesson(502, "Ana", "Novo", "2024-03-06 09:00:00"),
            ],
            0,
        );
        let outcome = import_batch(batch, &current_teachers, &current_slots);

        let ids: Vec<&str> = outcome.slots.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "em-500", "em-502"]);
        assert_eq!(outcome.diff.added.len(), 1);
        assert_eq!(outcome.diff.updated, vec!["Maria".to_string()]);
        assert_eq!(outcome.diff.deleted_count, 1);
        assert_eq!(outcome.removed_slot_ids, vec!["em-501".to_string()]);
    }

    #[test]
    fn test_reimport_of_name_without_strict_key_reuses_teacher() {
        let first = import_batch(
            lessons_to_batch(&[lesson(20, "李明", "Wen", "2024-03-05 10:00:00")], 0),
            &[],
            &[],
        );
        assert_eq!(first.teachers, vec![Teacher::new("t-李明", "李明")]);

        let second = import_batch(
            lessons_to_batch(
                &[
                    lesson(20, "李明", "Wen", "2024-03-05 10:00:00"),
                    lesson(21, "王芳", "Li", "2024-03-06 11:00:00"),
                ],
                0,
            ),
            &first.teachers,
            &first.slots,
        );

        let ids: Vec<&str> = second.teachers.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"t-李明"));
        assert!(ids.contains(&"t-王芳"));
        assert!(second.redirect.is_empty());
    }

    #[test]
    fn test_imported_name_without_strict_key_survives_merge() {
        let imported = import_batch(
            lessons_to_batch(&[lesson(30, "---", "Rui", "2024-03-05 10:00:00")], 0),
            &[],
            &[],
        );
        let remote = ca_common::Snapshot {
            teachers: imported.teachers.clone(),
            slots: imported.slots.clone(),
            ..Default::default()
        };

        let merged = crate::merge::merge_snapshots(&remote, &ca_common::Snapshot::default());

        assert_eq!(merged.snapshot.teachers, imported.teachers);
        assert!(merged.superseded_teacher_ids.is_empty());
        assert!(!merged.remote_diverges());
    }
}
