//! State mutations
//!
//! Every successful mutation persists locally at once and schedules the
//! debounced remote push. Removals queue the matching remote rows for
//! deletion on that push.

use super::context::SyncContext;
use super::error::{SyncError, SyncResult};
use super::orchestrator::SyncOrchestrator;
use crate::identity::mint_id;
use crate::merge::sort_by_display_name;
use ca_common::events::ChangeSource;
use ca_common::time::{is_valid_time, now_millis, parse_date};
use ca_common::{Expense, FinancialSetting, ScheduleSlot, Teacher};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Input for [`SyncOrchestrator::add_slot`]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSlot {
    pub teacher_id: String,
    pub day_of_week: u8,
    pub time: String,
    pub student_name: String,
    #[serde(default)]
    pub instrument: String,
    #[serde(default)]
    pub is_experimental: bool,
    #[serde(default)]
    pub date: Option<String>,
}

fn require_date(date: &str) -> SyncResult<()> {
    parse_date(date)
        .map(|_| ())
        .ok_or_else(|| SyncError::InvalidInput(format!("Invalid date (expected YYYY-MM-DD): {date}")))
}

fn require_month(month: &str) -> SyncResult<()> {
    NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| SyncError::InvalidInput(format!("Invalid month (expected YYYY-MM): {month}")))
}

/// Toggle `id` in `ids`; returns whether it is now present
fn toggle(ids: &mut Vec<String>, id: &str) -> bool {
    match ids.iter().position(|x| x == id) {
        Some(pos) => {
            ids.remove(pos);
            false
        }
        None => {
            ids.push(id.to_string());
            true
        }
    }
}

impl SyncOrchestrator {
    /// Apply `edit` under the state lock, then write back
    async fn edit<T, F>(self: &Arc<Self>, edit: F) -> SyncResult<T>
    where
        F: FnOnce(&mut SyncContext) -> SyncResult<T>,
    {
        let value = {
            let mut ctx = self.context.write().await;
            if !ctx.phase.is_ready() {
                return Err(SyncError::NotLoaded(ctx.phase));
            }
            edit(&mut *ctx)?
        };
        self.schedule_write_back(ChangeSource::LocalEdit).await;
        Ok(value)
    }

    pub async fn add_teacher(self: &Arc<Self>, name: &str) -> SyncResult<Teacher> {
        let name = name.to_uppercase().trim().to_string();
        if name.is_empty() {
            return Err(SyncError::InvalidInput("Teacher name is required".to_string()));
        }
        let teacher = Teacher::new(mint_id(&name), name);

        let added = self
            .edit(move |ctx| {
                let teachers = &mut ctx.local.snapshot.teachers;
                if teachers.iter().any(|t| t.id == teacher.id) {
                    return Err(SyncError::Conflict(format!("Teacher {} already exists", teacher.id)));
                }
                teachers.push(teacher.clone());
                sort_by_display_name(teachers);
                ctx.pending_teacher_deletes.remove(&teacher.id);
                Ok(teacher)
            })
            .await?;

        info!(teacher_id = %added.id, "Teacher added");
        Ok(added)
    }

    /// Remove a teacher and every slot that references it
    ///
    /// Returns the number of slots removed.
    pub async fn delete_teacher(self: &Arc<Self>, teacher_id: &str) -> SyncResult<usize> {
        let teacher_id = teacher_id.to_string();
        self.edit(move |ctx| {
            let snapshot = &mut ctx.local.snapshot;
            let before = snapshot.teachers.len();
            snapshot.teachers.retain(|t| t.id != teacher_id);
            if snapshot.teachers.len() == before {
                return Err(SyncError::NotFound(format!("Teacher {teacher_id}")));
            }

            let removed: Vec<String> = snapshot
                .slots
                .iter()
                .filter(|s| s.teacher_id == teacher_id)
                .map(|s| s.id.clone())
                .collect();
            snapshot.slots.retain(|s| s.teacher_id != teacher_id);

            info!(teacher_id = %teacher_id, slots = removed.len(), "Teacher deleted");
            let count = removed.len();
            ctx.pending_teacher_deletes.insert(teacher_id);
            ctx.pending_slot_deletes.extend(removed);
            Ok(count)
        })
        .await
    }

    pub async fn add_slot(self: &Arc<Self>, new_slot: NewSlot) -> SyncResult<ScheduleSlot> {
        if new_slot.day_of_week > 6 {
            return Err(SyncError::InvalidInput(format!(
                "dayOfWeek must be 0-6, got {}",
                new_slot.day_of_week
            )));
        }
        if !is_valid_time(&new_slot.time) {
            return Err(SyncError::InvalidInput(format!(
                "Invalid time (expected HH:MM): {}",
                new_slot.time
            )));
        }
        if let Some(date) = &new_slot.date {
            require_date(date)?;
        }
        let student_name = new_slot.student_name.trim().to_string();
        if student_name.is_empty() {
            return Err(SyncError::InvalidInput("Student name is required".to_string()));
        }

        let slot = ScheduleSlot {
            id: Uuid::new_v4().to_string(),
            teacher_id: new_slot.teacher_id,
            day_of_week: new_slot.day_of_week,
            time: new_slot.time,
            student_name,
            instrument: new_slot.instrument.trim().to_string(),
            is_experimental: new_slot.is_experimental,
            date: new_slot.date,
            created_at: now_millis(),
        };

        self.edit(move |ctx| {
            let snapshot = &mut ctx.local.snapshot;
            if !snapshot.teachers.iter().any(|t| t.id == slot.teacher_id) {
                return Err(SyncError::NotFound(format!("Teacher {}", slot.teacher_id)));
            }
            snapshot.slots.push(slot.clone());
            Ok(slot)
        })
        .await
    }

    pub async fn delete_slot(self: &Arc<Self>, slot_id: &str) -> SyncResult<()> {
        let slot_id = slot_id.to_string();
        self.edit(move |ctx| {
            let slots = &mut ctx.local.snapshot.slots;
            let before = slots.len();
            slots.retain(|s| s.id != slot_id);
            if slots.len() == before {
                return Err(SyncError::NotFound(format!("Slot {slot_id}")));
            }
            ctx.pending_slot_deletes.insert(slot_id);
            Ok(())
        })
        .await
    }

    /// Remove every manually entered slot; returns how many were removed
    pub async fn clear_manual_slots(self: &Arc<Self>) -> SyncResult<usize> {
        self.edit(|ctx| {
            let (external, manual): (Vec<ScheduleSlot>, Vec<ScheduleSlot>) = ctx
                .local
                .snapshot
                .slots
                .drain(..)
                .partition(ScheduleSlot::is_external);
            ctx.local.snapshot.slots = external;
            let count = manual.len();
            ctx.pending_slot_deletes.extend(manual.into_iter().map(|s| s.id));
            info!(removed = count, "Manual slots cleared");
            Ok(count)
        })
        .await
    }

    /// Returns whether the slot is now confirmed for `date`
    pub async fn toggle_confirmation(self: &Arc<Self>, date: &str, slot_id: &str) -> SyncResult<bool> {
        require_date(date)?;
        let (date, slot_id) = (date.to_string(), slot_id.to_string());
        self.edit(move |ctx| {
            let ids = ctx.local.snapshot.confirmations.entry(date).or_default();
            Ok(toggle(ids, &slot_id))
        })
        .await
    }

    /// Unconfirm every slot of `date`
    ///
    /// The date keeps an empty list so the push overwrites the remote row.
    pub async fn clear_day(self: &Arc<Self>, date: &str) -> SyncResult<usize> {
        require_date(date)?;
        let date = date.to_string();
        self.edit(move |ctx| {
            let ids = ctx.local.snapshot.confirmations.entry(date).or_default();
            let cleared = ids.len();
            ids.clear();
            Ok(cleared)
        })
        .await
    }

    /// Returns false when the student was already marked contacted
    pub async fn mark_contacted(self: &Arc<Self>, date: &str, slot_id: &str) -> SyncResult<bool> {
        require_date(date)?;
        let (date, slot_id) = (date.to_string(), slot_id.to_string());
        self.edit(move |ctx| {
            let ids = ctx.local.contacted.entry(date).or_default();
            if ids.contains(&slot_id) {
                return Ok(false);
            }
            ids.push(slot_id);
            Ok(true)
        })
        .await
    }

    /// Returns whether the slot is now hidden on `date`
    pub async fn toggle_hidden(self: &Arc<Self>, date: &str, slot_id: &str) -> SyncResult<bool> {
        require_date(date)?;
        let (date, slot_id) = (date.to_string(), slot_id.to_string());
        self.edit(move |ctx| {
            let day = ctx.local.overrides.entry(date).or_default();
            Ok(toggle(&mut day.hidden, &slot_id))
        })
        .await
    }

    /// Replace the expense list wholesale
    pub async fn set_expenses(self: &Arc<Self>, expenses: Vec<Expense>) -> SyncResult<usize> {
        let mut seen = HashSet::new();
        if let Some(dup) = expenses.iter().find(|e| !seen.insert(e.id.as_str())) {
            return Err(SyncError::InvalidInput(format!("Duplicate expense id {}", dup.id)));
        }
        if let Some(bad) = expenses.iter().find(|e| !e.amount.is_finite()) {
            return Err(SyncError::InvalidInput(format!("Expense {} has no valid amount", bad.id)));
        }

        self.edit(move |ctx| {
            let kept: HashSet<&str> = expenses.iter().map(|e| e.id.as_str()).collect();
            let dropped: Vec<String> = ctx
                .local
                .snapshot
                .expenses
                .iter()
                .filter(|e| !kept.contains(e.id.as_str()))
                .map(|e| e.id.clone())
                .collect();
            ctx.pending_expense_deletes.extend(dropped);
            for e in &expenses {
                ctx.pending_expense_deletes.remove(&e.id);
            }
            let count = expenses.len();
            ctx.local.snapshot.expenses = expenses;
            Ok(count)
        })
        .await
    }

    /// Stored receivable for `month` ("YYYY-MM"); read straight from the remote store
    pub async fn financial_setting(&self, month: &str) -> SyncResult<Option<FinancialSetting>> {
        self.ensure_ready().await?;
        require_month(month)?;
        self.remote
            .financial_setting(month)
            .await
            .map_err(SyncError::Remote)
    }

    pub async fn save_financial_setting(&self, month: &str, manual_receivable: f64) -> SyncResult<FinancialSetting> {
        self.ensure_ready().await?;
        require_month(month)?;
        if !manual_receivable.is_finite() {
            return Err(SyncError::InvalidInput("Receivable must be a number".to_string()));
        }
        let setting = FinancialSetting {
            month: month.to_string(),
            manual_receivable,
        };
        self.remote
            .save_financial_setting(&setting)
            .await
            .map_err(SyncError::Remote)?;
        info!(month = %month, "Financial setting saved");
        Ok(setting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle() {
        let mut ids = vec!["a".to_string()];
        assert!(toggle(&mut ids, "b"));
        assert!(!toggle(&mut ids, "a"));
        assert_eq!(ids, vec!["b".to_string()]);
    }

    #[test]
    fn test_month_and_date_validation() {
        assert!(require_month("2024-03").is_ok());
        assert!(require_month("2024-13").is_err());
        assert!(require_month("março").is_err());
        assert!(require_date("2024-02-29").is_ok());
        assert!(require_date("2023-02-29").is_err());
    }
}
