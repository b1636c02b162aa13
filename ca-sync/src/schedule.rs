//! Day schedule queries

use ca_common::time::{day_of_week, parse_date};
use ca_common::{LocalSnapshot, ScheduleSlot};
use serde::Serialize;

/// Lessons of one calendar day plus their status lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub date: String,
    pub day_of_week: u8,
    /// Sorted by time
    pub slots: Vec<ScheduleSlot>,
    pub confirmed: Vec<String>,
    pub contacted: Vec<String>,
}

fn occurring<'a>(
    local: &'a LocalSnapshot,
    date: &'a str,
    dow: u8,
    teacher_id: Option<&'a str>,
) -> impl Iterator<Item = &'a ScheduleSlot> + 'a {
    let hidden: &'a [String] = local
        .overrides
        .get(date)
        .map(|o| o.hidden.as_slice())
        .unwrap_or(&[]);

    local.snapshot.slots.iter().filter(move |slot| {
        slot.occurs_on(date, dow)
            && teacher_id.map_or(true, |t| slot.teacher_id == t)
            && !hidden.contains(&slot.id)
    })
}

/// Slots on `date`, optionally for one teacher, minus those hidden that day
///
/// Returns `None` for a malformed date.
pub fn day_schedule(local: &LocalSnapshot, date: &str, teacher_id: Option<&str>) -> Option<DaySchedule> {
    let dow = day_of_week(parse_date(date)?);

    let mut slots: Vec<ScheduleSlot> = occurring(local, date, dow, teacher_id).cloned().collect();
    slots.sort_by(|a, b| a.time.cmp(&b.time));

    Some(DaySchedule {
        date: date.to_string(),
        day_of_week: dow,
        slots,
        confirmed: local.snapshot.confirmations.get(date).cloned().unwrap_or_default(),
        contacted: local.contacted.get(date).cloned().unwrap_or_default(),
    })
}

/// Number of lessons [`day_schedule`] would list
pub fn lesson_count(local: &LocalSnapshot, date: &str, teacher_id: Option<&str>) -> usize {
    match parse_date(date) {
        Some(d) => occurring(local, date, day_of_week(d), teacher_id).count(),
        None => 0,
    }
}
