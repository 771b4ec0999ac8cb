//! Entity models shared by the local store and the sync layer.
//!
//! Remote documents use camelCase field names; local columns use snake_case.
//! The serde derives cover the remote representation, the `FromRow` derives
//! (or the manual row mappers in the table modules) cover the local one.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{StoreError, StoreResult};

/// Password applied lazily when a student or teacher never changed theirs.
pub const DEFAULT_PASSWORD: &str = "123456";

/// Fixed row id of the school-period singleton.
pub const PERIOD_CONFIG_ID: i64 = 1;

pub const STATUS_PRESENT: &str = "present";
pub const STATUS_LATE: &str = "late";
pub const STATUS_ABSENT: &str = "absent";
pub const STATUS_NOT_APPLICABLE: &str = "Not Applicable";

pub const EVENT_SUSPENSION: &str = "suspension";
pub const EVENT_HOLIDAY: &str = "holiday";
pub const EVENT_ACTIVITY: &str = "activity";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// Numeric-coercible grade level ("7".."12").
    pub grade: String,
    pub section: String,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub has_changed_credentials: bool,
    #[serde(default)]
    pub is_archived: bool,
}

impl Student {
    /// Login name, falling back to the student id when never set.
    pub fn effective_username(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.id)
    }

    pub fn effective_password(&self) -> &str {
        self.password.as_deref().unwrap_or(DEFAULT_PASSWORD)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeacherRole {
    Admin,
    Adviser,
    Subject,
}

impl Default for TeacherRole {
    fn default() -> Self {
        TeacherRole::Subject
    }
}

impl TeacherRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeacherRole::Admin => "admin",
            TeacherRole::Adviser => "adviser",
            TeacherRole::Subject => "subject",
        }
    }

    pub fn from_str(s: &str) -> StoreResult<Self> {
        match s {
            "admin" => Ok(TeacherRole::Admin),
            "adviser" => Ok(TeacherRole::Adviser),
            "subject" => Ok(TeacherRole::Subject),
            _ => Err(StoreError::InvalidRow(format!("unknown teacher role: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Department {
    Jhs,
    Shs,
}

impl Department {
    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Jhs => "JHS",
            Department::Shs => "SHS",
        }
    }

    pub fn from_str(s: &str) -> StoreResult<Self> {
        match s {
            "JHS" => Ok(Department::Jhs),
            "SHS" => Ok(Department::Shs),
            _ => Err(StoreError::InvalidRow(format!("unknown department: {}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: String,
    /// Globally unique login name.
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    #[serde(default)]
    pub role: TeacherRole,
    pub department: Option<Department>,
    // Advisory fields are present only while role is Adviser.
    pub advisory_grade: Option<String>,
    pub advisory_section: Option<String>,
    pub advisory_track: Option<String>,
    pub advisory_start_time: Option<String>,
    #[serde(default)]
    pub has_changed_credentials: bool,
}

impl Teacher {
    pub fn is_adviser_of(&self, grade: &str, section: &str) -> bool {
        self.advisory_grade.as_deref() == Some(grade)
            && self.advisory_section.as_deref() == Some(section)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Homeroom,
    Subject,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Homeroom => "homeroom",
            RecordKind::Subject => "subject",
        }
    }

    pub fn from_str(s: &str) -> StoreResult<Self> {
        match s {
            "homeroom" => Ok(RecordKind::Homeroom),
            "subject" => Ok(RecordKind::Subject),
            _ => Err(StoreError::InvalidRow(format!("unknown record kind: {}", s))),
        }
    }
}

/// One attendance observation. Immutable after creation; corrections are new
/// records. (student_id, timestamp) is the cross-device identity used for
/// duplicate detection.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    /// Local rowid; ignored on insert.
    pub id: i64,
    pub student_id: String,
    /// Creation time, epoch millis.
    pub timestamp: i64,
    pub status: String,
    pub kind: RecordKind,
    /// Required iff kind is Subject.
    pub subject: Option<String>,
    /// Quarter label resolved at creation time; empty when never resolved.
    pub academic_period: String,
    pub synced: bool,
}

impl AttendanceRecord {
    pub fn new(
        student_id: impl Into<String>,
        timestamp: i64,
        status: impl Into<String>,
        kind: RecordKind,
        subject: Option<String>,
        academic_period: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            student_id: student_id.into(),
            timestamp,
            status: status.into(),
            kind,
            subject,
            academic_period: academic_period.into(),
            synced: false,
        }
    }
}

/// Singleton school-year calendar. JHS and SHS quarter ranges are distinctly
/// named because the two divisions' terms do not align in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase", default)]
pub struct SchoolPeriodConfig {
    pub school_year: String,
    pub q1_start: i64,
    pub q1_end: i64,
    pub q2_start: i64,
    pub q2_end: i64,
    pub q3_start: i64,
    pub q3_end: i64,
    pub q4_start: i64,
    pub q4_end: i64,
    pub shs_q1_start: i64,
    pub shs_q1_end: i64,
    pub shs_q2_start: i64,
    pub shs_q2_end: i64,
    pub shs_q3_start: i64,
    pub shs_q3_end: i64,
    pub shs_q4_start: i64,
    pub shs_q4_end: i64,
}

/// Calendar exception; no-class events drive automatic "Not Applicable"
/// attendance marking.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SchoolEvent {
    /// Local rowid; 0 means not yet stored.
    pub id: i64,
    /// Day-truncated epoch millis.
    pub date: i64,
    pub title: String,
    pub event_type: String,
    pub description: Option<String>,
    pub is_no_class: bool,
    pub synced: bool,
}
