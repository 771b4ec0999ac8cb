//! Local SQLite store for the Rollcall attendance engine.
//!
//! Provides:
//! - Durable on-device storage for students, teachers, attendance records,
//!   the school-period singleton and school events
//! - Field-equality lookups and flag-only partial updates
//! - A `sync_metadata` table for reconciliation state (last sync timestamp)
//! - A change bus feeding live-updating list snapshots
//!
//! The local store is the source of truth for reads; the remote mirror is
//! reconciled separately by the sync engine.

pub mod error;
pub mod live;
pub mod models;

mod attendance;
mod calendar;
mod students;
mod teachers;

pub use error::{StoreError, StoreResult};
pub use live::Table;
pub use models::*;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tokio::sync::broadcast;

const LAST_SYNC_KEY: &str = "last_sync_at";

/// Configuration for the local database.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the database file.
    pub db_path: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Whether to enable WAL mode.
    pub enable_wal: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: "rollcall_local.db".to_string(),
            max_connections: 5,
            enable_wal: true,
        }
    }
}

/// Local database handle.
pub struct LocalStore {
    pool: SqlitePool,
    changes: broadcast::Sender<Table>,
}

impl LocalStore {
    /// Open (and bootstrap) the local database.
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        let db_url = format!("sqlite:{}", config.db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&db_url)
            .await?;

        // WAL lets the sync pass read while a recording flow writes.
        if config.enable_wal {
            sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        }

        sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

        let (changes, _) = broadcast::channel(64);
        let store = Self { pool, changes };
        store.initialize_schema().await?;

        Ok(store)
    }

    /// Initialize database schema.
    async fn initialize_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS students (
                id TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                grade TEXT NOT NULL,
                section TEXT NOT NULL,
                username TEXT,
                password TEXT,
                has_changed_credentials INTEGER NOT NULL DEFAULT 0,
                is_archived INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_students_class ON students(grade, section)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_students_username ON students(username)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS teachers (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT,
                role TEXT NOT NULL,
                department TEXT,
                advisory_grade TEXT,
                advisory_section TEXT,
                advisory_track TEXT,
                advisory_start_time TEXT,
                has_changed_credentials INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS attendance (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                status TEXT NOT NULL,
                kind TEXT NOT NULL DEFAULT 'homeroom',
                subject TEXT,
                academic_period TEXT NOT NULL DEFAULT '',
                synced INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_attendance_identity ON attendance(student_id, timestamp)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_attendance_synced ON attendance(synced)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS school_period (
                id INTEGER PRIMARY KEY,
                school_year TEXT NOT NULL,
                q1_start INTEGER NOT NULL DEFAULT 0,
                q1_end INTEGER NOT NULL DEFAULT 0,
                q2_start INTEGER NOT NULL DEFAULT 0,
                q2_end INTEGER NOT NULL DEFAULT 0,
                q3_start INTEGER NOT NULL DEFAULT 0,
                q3_end INTEGER NOT NULL DEFAULT 0,
                q4_start INTEGER NOT NULL DEFAULT 0,
                q4_end INTEGER NOT NULL DEFAULT 0,
                shs_q1_start INTEGER NOT NULL DEFAULT 0,
                shs_q1_end INTEGER NOT NULL DEFAULT 0,
                shs_q2_start INTEGER NOT NULL DEFAULT 0,
                shs_q2_end INTEGER NOT NULL DEFAULT 0,
                shs_q3_start INTEGER NOT NULL DEFAULT 0,
                shs_q3_end INTEGER NOT NULL DEFAULT 0,
                shs_q4_start INTEGER NOT NULL DEFAULT 0,
                shs_q4_end INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS school_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date INTEGER NOT NULL,
                title TEXT NOT NULL,
                event_type TEXT NOT NULL,
                description TEXT,
                is_no_class INTEGER NOT NULL DEFAULT 0,
                synced INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_date ON school_events(date)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sync_metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get database pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Subscribe to table-change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Table> {
        self.changes.subscribe()
    }

    pub(crate) fn notify(&self, table: Table) {
        // No subscribers is not an error.
        let _ = self.changes.send(table);
    }

    pub async fn set_metadata(&self, key: &str, value: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_metadata (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn metadata(&self, key: &str) -> StoreResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM sync_metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    /// Timestamp of the last fully successful sync pass, if any.
    pub async fn last_sync(&self) -> StoreResult<Option<DateTime<Utc>>> {
        match self.metadata(LAST_SYNC_KEY).await? {
            Some(raw) => {
                let parsed = DateTime::parse_from_rfc3339(&raw)
                    .map_err(|e| StoreError::InvalidRow(format!("invalid timestamp: {}", e)))?;
                Ok(Some(parsed.with_timezone(&Utc)))
            }
            None => Ok(None),
        }
    }

    pub async fn set_last_sync(&self, at: DateTime<Utc>) -> StoreResult<()> {
        self.set_metadata(LAST_SYNC_KEY, &at.to_rfc3339()).await
    }

    /// Close database connection.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
