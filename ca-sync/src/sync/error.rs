//! Sync engine errors

use crate::stores::LessonApiError;
use ca_common::events::SyncPhase;
use thiserror::Error;

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Neither the local cache nor the remote store could be read
    #[error("Initialization failed (local cache: {local}; remote store: {remote})")]
    Fatal { local: String, remote: String },

    #[error("Remote store error: {0}")]
    Remote(#[source] ca_common::Error),

    #[error("Lesson API error: {0}")]
    ExternalApi(#[from] LessonApiError),

    #[error("Local cache error: {0}")]
    LocalCache(#[source] ca_common::Error),

    /// The lesson API returned nothing usable for the range
    #[error("No lessons found for {0}")]
    NoLessons(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Data not loaded (phase {0:?})")]
    NotLoaded(SyncPhase),

    #[error(transparent)]
    Common(#[from] ca_common::Error),
}
