//! Attendance table operations.
//!
//! Rows are append-only: the engine never updates a record other than
//! flipping `synced`, and the only delete is the explicit bulk clear.

use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row};

use crate::error::StoreResult;
use crate::live::Table;
use crate::models::{AttendanceRecord, RecordKind};
use crate::LocalStore;

fn attendance_from_row(row: &SqliteRow) -> StoreResult<AttendanceRecord> {
    let kind: String = row.try_get("kind")?;

    Ok(AttendanceRecord {
        id: row.try_get("id")?,
        student_id: row.try_get("student_id")?,
        timestamp: row.try_get("timestamp")?,
        status: row.try_get("status")?,
        kind: RecordKind::from_str(&kind)?,
        subject: row.try_get("subject")?,
        academic_period: row.try_get("academic_period")?,
        synced: row.try_get("synced")?,
    })
}

impl LocalStore {
    /// Append one record; returns the local rowid.
    pub async fn record_attendance(&self, record: &AttendanceRecord) -> StoreResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance (
                student_id, timestamp, status, kind, subject, academic_period, synced
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.student_id)
        .bind(record.timestamp)
        .bind(&record.status)
        .bind(record.kind.as_str())
        .bind(&record.subject)
        .bind(&record.academic_period)
        .bind(record.synced)
        .execute(self.pool())
        .await?;

        tracing::debug!(
            student_id = %record.student_id,
            timestamp = record.timestamp,
            status = %record.status,
            "recorded attendance"
        );

        self.notify(Table::Attendance);
        Ok(result.last_insert_rowid())
    }

    /// Duplicate check on the cross-device identity pair.
    pub async fn attendance_exists(&self, student_id: &str, timestamp: i64) -> StoreResult<bool> {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM attendance WHERE student_id = ? AND timestamp = ?)",
        )
        .bind(student_id)
        .bind(timestamp)
        .fetch_one(self.pool())
        .await?;
        Ok(found != 0)
    }

    /// Records awaiting push, oldest first.
    pub async fn unsynced_attendance(&self) -> StoreResult<Vec<AttendanceRecord>> {
        let rows = sqlx::query("SELECT * FROM attendance WHERE synced = 0 ORDER BY timestamp ASC")
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(attendance_from_row).collect()
    }

    pub async fn count_unsynced_attendance(&self) -> StoreResult<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM attendance WHERE synced = 0")
                .fetch_one(self.pool())
                .await?;
        Ok(count)
    }

    pub async fn mark_attendance_synced(&self, ids: &[i64]) -> StoreResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut builder =
            QueryBuilder::<sqlx::Sqlite>::new("UPDATE attendance SET synced = 1 WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        builder.build().execute(self.pool()).await?;

        self.notify(Table::Attendance);
        Ok(())
    }

    pub async fn student_attendance_history(
        &self,
        student_id: &str,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let rows =
            sqlx::query("SELECT * FROM attendance WHERE student_id = ? ORDER BY timestamp ASC")
                .bind(student_id)
                .fetch_all(self.pool())
                .await?;
        rows.iter().map(attendance_from_row).collect()
    }

    /// History for one subject (None = homeroom records) inside a time range,
    /// inclusive both ends.
    pub async fn attendance_by_subject_in_range(
        &self,
        subject: Option<&str>,
        start: i64,
        end: i64,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let rows = match subject {
            Some(subject) => {
                sqlx::query(
                    r#"
                    SELECT * FROM attendance
                    WHERE subject = ? AND timestamp >= ? AND timestamp <= ?
                    ORDER BY timestamp ASC
                    "#,
                )
                .bind(subject)
                .bind(start)
                .bind(end)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT * FROM attendance
                    WHERE subject IS NULL AND timestamp >= ? AND timestamp <= ?
                    ORDER BY timestamp ASC
                    "#,
                )
                .bind(start)
                .bind(end)
                .fetch_all(self.pool())
                .await?
            }
        };
        rows.iter().map(attendance_from_row).collect()
    }

    pub async fn attendance_in_range(
        &self,
        start: i64,
        end: i64,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM attendance WHERE timestamp >= ? AND timestamp <= ? ORDER BY timestamp ASC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(attendance_from_row).collect()
    }

    pub async fn all_attendance(&self) -> StoreResult<Vec<AttendanceRecord>> {
        let rows = sqlx::query("SELECT * FROM attendance ORDER BY timestamp ASC")
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(attendance_from_row).collect()
    }

    /// Case-insensitive count of one status at or after `since` (dashboard
    /// tallies).
    pub async fn count_attendance_status_since(
        &self,
        status: &str,
        since: i64,
    ) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM attendance WHERE LOWER(status) = LOWER(?) AND timestamp >= ?",
        )
        .bind(status)
        .bind(since)
        .fetch_one(self.pool())
        .await?;
        Ok(count)
    }

    /// Bulk local clear; the remote history is left untouched.
    pub async fn delete_all_attendance(&self) -> StoreResult<()> {
        sqlx::query("DELETE FROM attendance").execute(self.pool()).await?;
        self.notify(Table::Attendance);
        Ok(())
    }
}
