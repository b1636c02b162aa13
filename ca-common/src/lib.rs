//! # ConfirmAula Common Library
//!
//! Shared code for the ConfirmAula studio services including:
//! - Domain models (teachers, schedule slots, confirmations, expenses)
//! - Event types (SyncEvent enum) and the broadcast EventBus
//! - Configuration loading and root folder resolution
//! - Remote store schema initialization
//! - Date/time helpers

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
pub use models::{
    Confirmations, ContactedStatuses, DateOverrides, DayOverride, Expense, FinancialSetting,
    LocalSnapshot, ScheduleSlot, Snapshot, Teacher, EXTERNAL_SLOT_PREFIX,
};
