//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::Local;
use tempfile::NamedTempFile;

use rollcall_remote::MemoryRemote;
use rollcall_store::{
    LocalStore, SchoolPeriodConfig, Student, StoreConfig, Teacher, TeacherRole,
};
use rollcall_sync::{LogNotifier, SyncConfig, SyncEngine};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub async fn open_store() -> (Arc<LocalStore>, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let config = StoreConfig {
        db_path,
        max_connections: 5,
        enable_wal: true,
    };

    (Arc::new(LocalStore::open(config).await.unwrap()), temp_file)
}

pub fn engine(store: Arc<LocalStore>, remote: Arc<MemoryRemote>) -> SyncEngine {
    SyncEngine::new(
        store,
        remote,
        Arc::new(LogNotifier),
        SyncConfig {
            device_name: "test-device".to_string(),
        },
    )
}

pub fn student(id: &str, grade: &str, section: &str) -> Student {
    Student {
        id: id.to_string(),
        first_name: format!("First{}", id),
        last_name: format!("Last{}", id),
        grade: grade.to_string(),
        section: section.to_string(),
        username: None,
        password: None,
        has_changed_credentials: false,
        is_archived: false,
    }
}

pub fn teacher(id: &str, username: &str) -> Teacher {
    Teacher {
        id: id.to_string(),
        username: username.to_string(),
        password: "123456".to_string(),
        first_name: format!("First{}", id),
        last_name: format!("Last{}", id),
        email: None,
        role: TeacherRole::Subject,
        department: None,
        advisory_grade: None,
        advisory_section: None,
        advisory_track: None,
        advisory_start_time: None,
        has_changed_credentials: false,
    }
}

/// Calendar fixture with small literal ranges (JHS Q1 = [1000, 2000], SHS
/// ranges offset by 100_000).
pub fn literal_period_config() -> SchoolPeriodConfig {
    SchoolPeriodConfig {
        school_year: "2025-2026".to_string(),
        q1_start: 1_000,
        q1_end: 2_000,
        q2_start: 3_000,
        q2_end: 4_000,
        q3_start: 5_000,
        q3_end: 6_000,
        q4_start: 7_000,
        q4_end: 8_000,
        shs_q1_start: 101_000,
        shs_q1_end: 102_000,
        shs_q2_start: 103_000,
        shs_q2_end: 104_000,
        shs_q3_start: 105_000,
        shs_q3_end: 106_000,
        shs_q4_start: 107_000,
        shs_q4_end: 108_000,
    }
}

/// Calendar fixture whose JHS and SHS Q1 both contain the current wall
/// clock, for flows that stamp records with "now".
pub fn period_config_covering_now() -> SchoolPeriodConfig {
    let now = Local::now().timestamp_millis();
    let day = 86_400_000;
    SchoolPeriodConfig {
        school_year: "2025-2026".to_string(),
        q1_start: now - day,
        q1_end: now + day,
        q2_start: now + 2 * day,
        q2_end: now + 3 * day,
        q3_start: now + 4 * day,
        q3_end: now + 5 * day,
        q4_start: now + 6 * day,
        q4_end: now + 7 * day,
        shs_q1_start: now - day,
        shs_q1_end: now + day,
        shs_q2_start: now + 2 * day,
        shs_q2_end: now + 3 * day,
        shs_q3_start: now + 4 * day,
        shs_q3_end: now + 5 * day,
        shs_q4_start: now + 6 * day,
        shs_q4_end: now + 7 * day,
    }
}
