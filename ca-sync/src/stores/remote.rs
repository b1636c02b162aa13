//! sqlx-backed remote store
//!
//! Rows are snake_case; this adapter is the only place that knows the
//! column names. Confirmation slot lists are stored as a JSON array column.

use super::RemoteStore;
use async_trait::async_trait;
use ca_common::models::{ExpenseCategory, ExpenseType};
use ca_common::{Confirmations, Error, Expense, FinancialSetting, Result, ScheduleSlot, Snapshot, Teacher};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

/// Remote store over a SQLite pool
#[derive(Clone)]
pub struct SqlRemoteStore {
    pool: SqlitePool,
}

type SlotRow = (String, String, i64, String, String, String, bool, Option<String>, i64);

type ExpenseRow = (String, String, f64, String, String, Option<i64>, Option<i64>, String);

/// Serde name of a unit enum variant, e.g. `ExpenseType::Fixed` → "fixed"
fn enum_to_text<T: Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(Error::Internal(format!("Expected string variant, got {other}"))),
    }
}

fn enum_from_text<T: DeserializeOwned>(text: String) -> Result<T> {
    Ok(serde_json::from_value(serde_json::Value::String(text))?)
}

fn slot_from_row(row: SlotRow) -> Result<ScheduleSlot> {
    let (id, teacher_id, day_of_week, time, student_name, instrument, is_experimental, date, created_at) = row;
    let day_of_week = u8::try_from(day_of_week)
        .map_err(|_| Error::Internal(format!("Slot {id} has day_of_week {day_of_week}")))?;
    Ok(ScheduleSlot {
        id,
        teacher_id,
        day_of_week,
        time,
        student_name,
        instrument,
        is_experimental,
        date,
        created_at,
    })
}

fn expense_from_row(row: ExpenseRow) -> Result<Expense> {
    let (id, description, amount, category, kind, installments, current_installment, start_date) = row;
    Ok(Expense {
        id,
        description,
        amount,
        category: enum_from_text::<ExpenseCategory>(category)?,
        kind: enum_from_text::<ExpenseType>(kind)?,
        installments: installments.and_then(|n| u32::try_from(n).ok()),
        current_installment: current_installment.and_then(|n| u32::try_from(n).ok()),
        start_date,
    })
}

impl SqlRemoteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RemoteStore for SqlRemoteStore {
    async fn get_teachers(&self) -> Result<Vec<Teacher>> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT id, name FROM teachers ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id, name)| Teacher { id, name }).collect())
    }

    async fn get_slots(&self) -> Result<Vec<ScheduleSlot>> {
        let rows: Vec<SlotRow> = sqlx::query_as(
            r#"
            SELECT id, teacher_id, day_of_week, time, student_name, instrument,
                   is_experimental, date, created_at
            FROM schedule_slots
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(slot_from_row).collect()
    }

    async fn get_confirmations(&self) -> Result<Confirmations> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT date, slot_ids FROM confirmations")
            .fetch_all(&self.pool)
            .await?;
        let mut confirmations = Confirmations::new();
        for (date, slot_ids) in rows {
            confirmations.insert(date, serde_json::from_str(&slot_ids)?);
        }
        Ok(confirmations)
    }

    async fn get_expenses(&self) -> Result<Vec<Expense>> {
        let rows: Vec<ExpenseRow> = sqlx::query_as(
            r#"
            SELECT id, description, amount, category, type, installments,
                   current_installment, start_date
            FROM expenses
            ORDER BY start_date, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(expense_from_row).collect()
    }

    async fn upsert_all(&self, snapshot: &Snapshot) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for teacher in &snapshot.teachers {
            sqlx::query(
                "INSERT INTO teachers (id, name) VALUES (?, ?)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            )
            .bind(&teacher.id)
            .bind(&teacher.name)
            .execute(&mut *tx)
            .await?;
        }

        for slot in &snapshot.slots {
            sqlx::query(
                r#"
                INSERT INTO schedule_slots (
                    id, teacher_id, day_of_week, time, student_name, instrument,
                    is_experimental, date, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    teacher_id = excluded.teacher_id,
                    day_of_week = excluded.day_of_week,
                    time = excluded.time,
                    student_name = excluded.student_name,
                    instrument = excluded.instrument,
                    is_experimental = excluded.is_experimental,
                    date = excluded.date,
                    created_at = excluded.created_at
                "#,
            )
            .bind(&slot.id)
            .bind(&slot.teacher_id)
            .bind(i64::from(slot.day_of_week))
            .bind(&slot.time)
            .bind(&slot.student_name)
            .bind(&slot.instrument)
            .bind(slot.is_experimental)
            .bind(&slot.date)
            .bind(slot.created_at)
            .execute(&mut *tx)
            .await?;
        }

        for (date, slot_ids) in &snapshot.confirmations {
            sqlx::query(
                "INSERT INTO confirmations (date, slot_ids) VALUES (?, ?)
                 ON CONFLICT(date) DO UPDATE SET slot_ids = excluded.slot_ids",
            )
            .bind(date)
            .bind(serde_json::to_string(slot_ids)?)
            .execute(&mut *tx)
            .await?;
        }

        for expense in &snapshot.expenses {
            sqlx::query(
                r#"
                INSERT INTO expenses (
                    id, description, amount, category, type, installments,
                    current_installment, start_date
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    description = excluded.description,
                    amount = excluded.amount,
                    category = excluded.category,
                    type = excluded.type,
                    installments = excluded.installments,
                    current_installment = excluded.current_installment,
                    start_date = excluded.start_date
                "#,
            )
            .bind(&expense.id)
            .bind(&expense.description)
            .bind(expense.amount)
            .bind(enum_to_text(&expense.category)?)
            .bind(enum_to_text(&expense.kind)?)
            .bind(expense.installments.map(i64::from))
            .bind(expense.current_installment.map(i64::from))
            .bind(&expense.start_date)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(
            teachers = snapshot.teachers.len(),
            slots = snapshot.slots.len(),
            confirmation_days = snapshot.confirmations.len(),
            expenses = snapshot.expenses.len(),
            "Upserted snapshot to remote store"
        );
        Ok(())
    }

    async fn delete_teachers(&self, ids: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for id in ids {
            sqlx::query("DELETE FROM teachers WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        debug!(count = ids.len(), "Deleted remote teachers");
        Ok(())
    }

    async fn delete_slots(&self, ids: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for id in ids {
            sqlx::query("DELETE FROM schedule_slots WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        debug!(count = ids.len(), "Deleted remote slots");
        Ok(())
    }

    async fn delete_expenses(&self, ids: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for id in ids {
            sqlx::query("DELETE FROM expenses WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        debug!(count = ids.len(), "Deleted remote expenses");
        Ok(())
    }

    async fn financial_setting(&self, month: &str) -> Result<Option<FinancialSetting>> {
        let row: Option<(String, f64)> =
            sqlx::query_as("SELECT month, manual_receivable FROM financial_settings WHERE month = ?")
                .bind(month)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(month, manual_receivable)| FinancialSetting {
            month,
            manual_receivable,
        }))
    }

    async fn save_financial_setting(&self, setting: &FinancialSetting) -> Result<()> {
        sqlx::query(
            "INSERT INTO financial_settings (month, manual_receivable) VALUES (?, ?)
             ON CONFLICT(month) DO UPDATE SET manual_receivable = excluded.manual_receivable",
        )
        .bind(&setting.month)
        .bind(setting.manual_receivable)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
