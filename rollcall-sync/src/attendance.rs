//! Attendance repository.
//!
//! Attendance rows never travel through a per-write mirror: they are pushed
//! by the sync pass with generated remote keys (append semantics), so the
//! repository is local-only plus the immediate-sync trigger.

use std::sync::Arc;

use tokio::sync::watch;

use rollcall_store::{live, AttendanceRecord, LocalStore};

use crate::error::SyncResult;
use crate::notify::SyncTrigger;

pub struct AttendanceRepository {
    store: Arc<LocalStore>,
    trigger: Arc<dyn SyncTrigger>,
}

impl AttendanceRepository {
    pub fn new(store: Arc<LocalStore>, trigger: Arc<dyn SyncTrigger>) -> Self {
        Self { store, trigger }
    }

    /// Append one record locally; returns the local rowid.
    pub async fn record(&self, record: &AttendanceRecord) -> SyncResult<i64> {
        Ok(self.store.record_attendance(record).await?)
    }

    /// Ask the external scheduler for an immediate sync pass.
    pub fn request_sync(&self) {
        self.trigger.request();
    }

    pub async fn exists(&self, student_id: &str, timestamp: i64) -> SyncResult<bool> {
        Ok(self.store.attendance_exists(student_id, timestamp).await?)
    }

    pub async fn unsynced(&self) -> SyncResult<Vec<AttendanceRecord>> {
        Ok(self.store.unsynced_attendance().await?)
    }

    pub async fn unsynced_count(&self) -> SyncResult<i64> {
        Ok(self.store.count_unsynced_attendance().await?)
    }

    pub async fn mark_synced(&self, ids: &[i64]) -> SyncResult<()> {
        Ok(self.store.mark_attendance_synced(ids).await?)
    }

    pub async fn student_history(&self, student_id: &str) -> SyncResult<Vec<AttendanceRecord>> {
        Ok(self.store.student_attendance_history(student_id).await?)
    }

    /// History for one subject (None = homeroom) inside an inclusive range.
    pub async fn history_by_subject_in_range(
        &self,
        subject: Option<&str>,
        start: i64,
        end: i64,
    ) -> SyncResult<Vec<AttendanceRecord>> {
        Ok(self
            .store
            .attendance_by_subject_in_range(subject, start, end)
            .await?)
    }

    pub async fn history_in_range(&self, start: i64, end: i64) -> SyncResult<Vec<AttendanceRecord>> {
        Ok(self.store.attendance_in_range(start, end).await?)
    }

    pub async fn all_history(&self) -> SyncResult<Vec<AttendanceRecord>> {
        Ok(self.store.all_attendance().await?)
    }

    pub async fn count_status_since(&self, status: &str, since: i64) -> SyncResult<i64> {
        Ok(self.store.count_attendance_status_since(status, since).await?)
    }

    /// Bulk local clear; remote history is never deleted.
    pub async fn delete_all(&self) -> SyncResult<()> {
        Ok(self.store.delete_all_attendance().await?)
    }

    /// Live count of rows awaiting push (dashboard badge).
    pub fn watch_unsynced_count(&self) -> watch::Receiver<i64> {
        live::watch_unsynced_count(Arc::clone(&self.store))
    }
}
