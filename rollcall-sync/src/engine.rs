//! The sync engine: one reconciliation pass across all four entity types.
//!
//! Per-type strategy:
//! - teachers / students: push all local rows in one batched write keyed by
//!   id, then pull all remote rows and write each through into local storage
//!   (last-writer-wins both ways)
//! - attendance: push only unsynced rows under generated remote keys, then
//!   pull everything and insert only rows whose (studentId, timestamp) pair
//!   is new locally
//! - period config: push the local singleton if present, then pull the
//!   remote one and overwrite local
//!
//! Every step is independently idempotent; a failure aborts the rest of the
//! pass and surfaces as a retry, leaving completed steps applied.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map, Value};

use rollcall_remote::RemoteStore;
use rollcall_store::{
    AttendanceRecord, LocalStore, RecordKind, SchoolPeriodConfig, Student, Teacher, STATUS_PRESENT,
};

use crate::error::SyncResult;
use crate::notify::Notifier;
use crate::paths;

/// Sync engine configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Device label stamped onto pushed attendance rows.
    pub device_name: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            device_name: "rollcall-device".to_string(),
        }
    }
}

/// What one pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncStats {
    pub teachers_pushed: usize,
    pub teachers_pulled: usize,
    pub students_pushed: usize,
    pub students_pulled: usize,
    pub attendance_pushed: usize,
    pub attendance_pulled: usize,
    pub config_pushed: bool,
    pub config_pulled: bool,
}

/// Result of one pass, as reported to the external scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncStats),
    /// The pass aborted part-way; completed steps stay applied and the whole
    /// pass is safe to re-run.
    Retry,
}

pub struct SyncEngine {
    store: Arc<LocalStore>,
    remote: Arc<dyn RemoteStore>,
    notifier: Arc<dyn Notifier>,
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(
        store: Arc<LocalStore>,
        remote: Arc<dyn RemoteStore>,
        notifier: Arc<dyn Notifier>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            remote,
            notifier,
            config,
        }
    }

    /// Run one complete pass. Never returns an error: failures surface as
    /// [`SyncOutcome::Retry`] for the scheduler to back off and re-invoke.
    pub async fn run_once(&self) -> SyncOutcome {
        self.notifier.notify("Sync Started", "Synchronizing data...", false);

        match self.execute().await {
            Ok(stats) => {
                tracing::debug!(?stats, "sync pass completed");
                self.notifier
                    .notify("Sync Completed", "All data is up to date.", false);
                SyncOutcome::Completed(stats)
            }
            Err(err) => {
                tracing::error!(error = %err, "sync pass failed");
                self.notifier.notify(
                    "Sync Failed",
                    "Could not sync data. Check connection.",
                    true,
                );
                SyncOutcome::Retry
            }
        }
    }

    async fn execute(&self) -> SyncResult<SyncStats> {
        let mut stats = SyncStats::default();

        self.sync_teachers(&mut stats).await?;
        self.sync_students(&mut stats).await?;
        self.sync_attendance(&mut stats).await?;
        self.sync_period_config(&mut stats).await?;

        self.store.set_last_sync(Utc::now()).await?;
        Ok(stats)
    }

    /// Teachers: force-push every local row, then pull everything back.
    async fn sync_teachers(&self, stats: &mut SyncStats) -> SyncResult<()> {
        let local = self.store.all_teachers().await?;
        if !local.is_empty() {
            let mut batch = Map::new();
            for teacher in &local {
                batch.insert(format!("/{}", teacher.id), serde_json::to_value(teacher)?);
            }
            self.remote.write_batch(paths::TEACHERS, &batch).await?;
            stats.teachers_pushed = local.len();
        }

        if let Some(Value::Object(children)) = self.remote.read(paths::TEACHERS).await? {
            for (key, child) in children {
                match serde_json::from_value::<Teacher>(child) {
                    Ok(remote) => {
                        self.store.insert_teacher(&remote).await?;
                        stats.teachers_pulled += 1;
                    }
                    Err(err) => {
                        tracing::debug!(key = %key, error = %err, "skipping malformed remote teacher");
                    }
                }
            }
        }

        Ok(())
    }

    /// Students: force-push every local row, then pull everything back in
    /// one bulk upsert.
    async fn sync_students(&self, stats: &mut SyncStats) -> SyncResult<()> {
        let local = self.store.all_students().await?;
        if !local.is_empty() {
            let mut batch = Map::new();
            for student in &local {
                batch.insert(format!("/{}", student.id), serde_json::to_value(student)?);
            }
            self.remote.write_batch(paths::STUDENTS, &batch).await?;
            stats.students_pushed = local.len();
        }

        if let Some(Value::Object(children)) = self.remote.read(paths::STUDENTS).await? {
            let mut pulled = Vec::new();
            for (key, child) in children {
                match serde_json::from_value::<Student>(child) {
                    Ok(remote) => pulled.push(remote),
                    Err(err) => {
                        tracing::debug!(key = %key, error = %err, "skipping malformed remote student");
                    }
                }
            }
            if !pulled.is_empty() {
                stats.students_pulled = pulled.len();
                self.store.insert_students(&pulled).await?;
            }
        }

        Ok(())
    }

    /// Attendance: delta push under generated keys, pull-all with
    /// (studentId, timestamp) dedup.
    async fn sync_attendance(&self, stats: &mut SyncStats) -> SyncResult<()> {
        let unsynced = self.store.unsynced_attendance().await?;
        for record in &unsynced {
            // Generated keys keep concurrent devices from overwriting each
            // other's rows.
            let payload = json!({
                "studentId": record.student_id,
                "timestamp": record.timestamp,
                "status": record.status,
                "type": record.kind.as_str(),
                "subject": record.subject.clone().unwrap_or_default(),
                "academicPeriod": record.academic_period,
                "updatedAt": Utc::now().timestamp_millis(),
                "deviceId": self.config.device_name,
            });
            self.remote.append(paths::ATTENDANCE, &payload).await?;
            self.store.mark_attendance_synced(&[record.id]).await?;
            stats.attendance_pushed += 1;
        }

        if let Some(Value::Object(children)) = self.remote.read(paths::ATTENDANCE).await? {
            for (key, child) in children {
                let Some(doc) = child.as_object() else {
                    continue;
                };

                let student_id = match doc.get("studentId").and_then(Value::as_str) {
                    Some(id) => id,
                    None => {
                        tracing::debug!(key = %key, "skipping attendance row without studentId");
                        continue;
                    }
                };
                let timestamp = match doc.get("timestamp").and_then(Value::as_i64) {
                    Some(ts) => ts,
                    None => {
                        tracing::debug!(key = %key, "skipping attendance row without timestamp");
                        continue;
                    }
                };

                if self.store.attendance_exists(student_id, timestamp).await? {
                    continue;
                }

                let status = doc
                    .get("status")
                    .and_then(Value::as_str)
                    .unwrap_or(STATUS_PRESENT);
                let kind = doc
                    .get("type")
                    .and_then(Value::as_str)
                    .map(RecordKind::from_str)
                    .and_then(Result::ok)
                    .unwrap_or(RecordKind::Homeroom);
                let subject = doc
                    .get("subject")
                    .and_then(Value::as_str)
                    .filter(|s| !s.trim().is_empty())
                    .map(str::to_string);
                let academic_period = doc
                    .get("academicPeriod")
                    .and_then(Value::as_str)
                    .unwrap_or_default();

                let mut record = AttendanceRecord::new(
                    student_id,
                    timestamp,
                    status,
                    kind,
                    subject,
                    academic_period,
                );
                // Originated remotely, nothing left to push.
                record.synced = true;
                self.store.record_attendance(&record).await?;
                stats.attendance_pulled += 1;
            }
            tracing::debug!(
                pulled = stats.attendance_pulled,
                "pulled attendance records from remote"
            );
        }

        Ok(())
    }

    /// Period config: singleton round-trip through the fixed remote path.
    async fn sync_period_config(&self, stats: &mut SyncStats) -> SyncResult<()> {
        if let Some(local) = self.store.school_period().await? {
            self.remote
                .write_full(paths::PERIOD_CONFIG, &serde_json::to_value(&local)?)
                .await?;
            stats.config_pushed = true;
        }

        if let Some(value) = self.remote.read(paths::PERIOD_CONFIG).await? {
            match serde_json::from_value::<SchoolPeriodConfig>(value) {
                Ok(remote) => {
                    self.store.set_school_period(&remote).await?;
                    stats.config_pulled = true;
                }
                Err(err) => {
                    tracing::debug!(error = %err, "skipping malformed remote period config");
                }
            }
        }

        Ok(())
    }
}
