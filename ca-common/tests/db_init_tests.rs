//! Tests for remote store schema initialization

use ca_common::db::init::{create_schema, init_remote_store};
use sqlx::sqlite::SqlitePoolOptions;

#[tokio::test]
async fn test_remote_store_created_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("remote.db");
    let url = format!("sqlite://{}?mode=rwc", db_path.display());

    let result = init_remote_store(&url).await;
    assert!(result.is_ok(), "Remote store initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_schema_creation_is_idempotent() {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    create_schema(&pool).await.unwrap();
    create_schema(&pool).await.unwrap();

    let tables: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    let names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();

    assert_eq!(
        names,
        vec!["confirmations", "expenses", "financial_settings", "schedule_slots", "teachers"]
    );
}

#[tokio::test]
async fn test_day_of_week_constraint_rejects_out_of_range() {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO schedule_slots (id, teacher_id, day_of_week, time, student_name) VALUES ('s', 't', 7, '10:00', 'Ana')",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err());
}
