//! Remote store initialization
//!
//! Creates the five logical tables of the remote store on first run:
//! `teachers`, `schedule_slots`, `confirmations`, `expenses` and
//! `financial_settings`. Column names are snake_case; translation to the
//! camelCase in-memory shape is the remote store adapter's job.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

/// Connect to the remote store and create tables if needed
pub async fn init_remote_store(database_url: &str) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    info!("Connected to remote store: {}", database_url);

    // WAL lets the poller read while a write-back is in flight
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all remote tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_teachers_table(pool).await?;
    create_schedule_slots_table(pool).await?;
    create_confirmations_table(pool).await?;
    create_expenses_table(pool).await?;
    create_financial_settings_table(pool).await?;
    Ok(())
}

async fn create_teachers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS teachers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_schedule_slots_table(pool: &SqlitePool) -> Result<()> {
    // No foreign key on teacher_id: slots may reference a pre-merge teacher id
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schedule_slots (
            id TEXT PRIMARY KEY,
            teacher_id TEXT NOT NULL,
            day_of_week INTEGER NOT NULL CHECK (day_of_week BETWEEN 0 AND 6),
            time TEXT NOT NULL,
            student_name TEXT NOT NULL,
            instrument TEXT NOT NULL DEFAULT '',
            is_experimental INTEGER NOT NULL DEFAULT 0,
            date TEXT,
            created_at INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_schedule_slots_teacher ON schedule_slots(teacher_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_confirmations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS confirmations (
            date TEXT PRIMARY KEY,
            slot_ids TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_expenses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS expenses (
            id TEXT PRIMARY KEY,
            description TEXT NOT NULL,
            amount REAL NOT NULL,
            category TEXT NOT NULL,
            type TEXT NOT NULL,
            installments INTEGER,
            current_installment INTEGER,
            start_date TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_financial_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS financial_settings (
            month TEXT PRIMARY KEY,
            manual_receivable REAL NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
