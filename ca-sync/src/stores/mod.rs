//! Collaborator interfaces and their concrete adapters
//!
//! The orchestrator only talks to the three traits below; `local_cache`,
//! `remote` and `emusys` provide the production implementations.

use async_trait::async_trait;
use ca_common::{Confirmations, Expense, FinancialSetting, LocalSnapshot, ScheduleSlot, Snapshot, Teacher};
use chrono::NaiveDateTime;
use thiserror::Error;

pub mod emusys;
pub mod local_cache;
pub mod remote;

pub use emusys::EmusysClient;
pub use local_cache::JsonFileCache;
pub use remote::SqlRemoteStore;

/// Device-local persistence
#[async_trait]
pub trait LocalCache: Send + Sync {
    /// Missing entries load as empty; malformed entries are an error
    async fn load(&self) -> ca_common::Result<LocalSnapshot>;

    async fn save(&self, snapshot: &LocalSnapshot) -> ca_common::Result<()>;

    /// Remove every cached entry
    async fn clear(&self) -> ca_common::Result<()>;
}

/// Shared source of truth across devices
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get_teachers(&self) -> ca_common::Result<Vec<Teacher>>;

    async fn get_slots(&self) -> ca_common::Result<Vec<ScheduleSlot>>;

    async fn get_confirmations(&self) -> ca_common::Result<Confirmations>;

    async fn get_expenses(&self) -> ca_common::Result<Vec<Expense>>;

    /// All four collections, fetched concurrently
    async fn fetch_snapshot(&self) -> ca_common::Result<Snapshot> {
        let (teachers, slots, confirmations, expenses) = tokio::try_join!(
            self.get_teachers(),
            self.get_slots(),
            self.get_confirmations(),
            self.get_expenses()
        )?;
        Ok(Snapshot {
            teachers,
            slots,
            confirmations,
            expenses,
        })
    }

    /// Upsert keyed by id (confirmations keyed by date); never deletes
    async fn upsert_all(&self, snapshot: &Snapshot) -> ca_common::Result<()>;

    async fn delete_teachers(&self, ids: &[String]) -> ca_common::Result<()>;

    async fn delete_slots(&self, ids: &[String]) -> ca_common::Result<()>;

    async fn delete_expenses(&self, ids: &[String]) -> ca_common::Result<()>;

    async fn financial_setting(&self, month: &str) -> ca_common::Result<Option<FinancialSetting>>;

    async fn save_financial_setting(&self, setting: &FinancialSetting) -> ca_common::Result<()>;
}

/// One lesson as reported by the practice-management API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLesson {
    pub id: i64,
    pub cancelled: bool,
    /// In API order; the first one is the lesson's teacher
    pub teacher_names: Vec<String>,
    pub student_name: Option<String>,
    pub course_name: Option<String>,
    pub category: Option<String>,
    /// "YYYY-MM-DD HH:MM:SS"
    pub starts_at: String,
    pub ends_at: String,
}

/// Lesson API failures
#[derive(Debug, Error)]
pub enum LessonApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Status(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// External lesson feed
#[async_trait]
pub trait LessonSource: Send + Sync {
    /// Every lesson starting within `[start, end]`, across all pages
    async fn fetch_lessons_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<RawLesson>, LessonApiError>;
}
