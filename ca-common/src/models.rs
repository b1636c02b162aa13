//! Domain models shared by the cache, the remote store and the sync engine
//!
//! In-memory and cached JSON use camelCase field names; the remote store
//! adapter translates to snake_case columns.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Id prefix reserved for slots imported from the external lesson API
pub const EXTERNAL_SLOT_PREFIX: &str = "em-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: String,
    /// Display name, stored upper-cased and trimmed
    #[serde(default)]
    pub name: String,
}

impl Teacher {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A weekly-recurring or date-specific lesson
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    pub id: String,
    /// May still reference a pre-merge teacher id until reconciled
    pub teacher_id: String,
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: u8,
    /// "HH:MM", 24-hour
    pub time: String,
    pub student_name: String,
    #[serde(default)]
    pub instrument: String,
    #[serde(default)]
    pub is_experimental: bool,
    /// "YYYY-MM-DD" for one-off lessons; `day_of_week` is ignored for occurrence when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Epoch milliseconds
    #[serde(default)]
    pub created_at: i64,
}

impl ScheduleSlot {
    /// True for slots owned by the external lesson API (`em-` prefix)
    pub fn is_external(&self) -> bool {
        self.id.starts_with(EXTERNAL_SLOT_PREFIX)
    }

    /// Whether this slot takes place on `date` (weekday `dow`)
    pub fn occurs_on(&self, date: &str, dow: u8) -> bool {
        match &self.date {
            Some(d) => d == date,
            None => self.day_of_week == dow,
        }
    }
}

/// date ("YYYY-MM-DD") → ids of slots confirmed as delivered that day
pub type Confirmations = BTreeMap<String, Vec<String>>;

/// date → ids of slots whose student was already contacted that day
pub type ContactedStatuses = BTreeMap<String, Vec<String>>;

/// Per-date display overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayOverride {
    #[serde(default)]
    pub hidden: Vec<String>,
}

/// date → override
pub type DateOverrides = BTreeMap<String, DayOverride>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseCategory {
    Estrutura,
    Pessoal,
    #[serde(rename = "Investimentos/Dividas")]
    InvestimentosDividas,
    Impostos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseType {
    Fixed,
    Installment,
    Single,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub category: ExpenseCategory,
    #[serde(rename = "type")]
    pub kind: ExpenseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installments: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_installment: Option<u32>,
    /// "YYYY-MM"
    pub start_date: String,
}

/// Manually entered receivable for one month ("YYYY-MM")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSetting {
    pub month: String,
    pub manual_receivable: f64,
}

/// The unit moved between the local cache, the remote store and memory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub teachers: Vec<Teacher>,
    #[serde(default)]
    pub slots: Vec<ScheduleSlot>,
    #[serde(default)]
    pub confirmations: Confirmations,
    #[serde(default)]
    pub expenses: Vec<Expense>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.teachers.is_empty()
            && self.slots.is_empty()
            && self.confirmations.is_empty()
            && self.expenses.is_empty()
    }

    pub fn external_slots(&self) -> Vec<ScheduleSlot> {
        self.slots.iter().filter(|s| s.is_external()).cloned().collect()
    }
}

/// Everything the local cache holds: the synced snapshot plus device-local state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalSnapshot {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    #[serde(default)]
    pub overrides: DateOverrides,
    #[serde(default)]
    pub contacted: ContactedStatuses,
}
