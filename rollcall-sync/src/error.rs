//! Error types for the sync engine

use rollcall_remote::RemoteError;
use rollcall_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("local store error: {0}")]
    Store(#[from] StoreError),

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("student not found: {0}")]
    StudentNotFound(String),

    #[error("teacher not found: {0}")]
    TeacherNotFound(String),

    #[error("academic calendar not configured for this date")]
    CalendarNotConfigured,

    #[error("grade {0:?} does not map to a division")]
    UnknownGrade(String),

    #[error("subject name is required for subject attendance")]
    MissingSubject,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
