//! Attendance recording flows: QR scan, manual entry, the absentee sweep
//! and the no-class Not-Applicable sweep.
//!
//! Scans and manual entries validate the academic period strictly; the bulk
//! sweeps are allowed to fall back (absentees) or leave the label empty
//! (no-class marking) because they run on a schedule, not under a teacher's
//! eyes.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Local;

use rollcall_store::{
    AttendanceRecord, RecordKind, Student, STATUS_ABSENT, STATUS_NOT_APPLICABLE, STATUS_PRESENT,
};

use crate::calendar::CalendarRepository;
use crate::error::{SyncError, SyncResult};
use crate::period::{resolve_period, Division, Quarter};
use crate::students::StudentRepository;
use crate::attendance::AttendanceRepository;

/// Quarter used when the bulk absentee sweep cannot resolve the calendar.
pub const FALLBACK_QUARTER: Quarter = Quarter::Q1;

pub struct AttendanceService {
    students: Arc<StudentRepository>,
    attendance: Arc<AttendanceRepository>,
    calendar: Arc<CalendarRepository>,
}

/// Device-local midnight, epoch millis.
pub fn start_of_today() -> i64 {
    let now = Local::now();
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|dt| dt.and_local_timezone(Local).earliest())
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| now.timestamp_millis())
}

impl AttendanceService {
    pub fn new(
        students: Arc<StudentRepository>,
        attendance: Arc<AttendanceRepository>,
        calendar: Arc<CalendarRepository>,
    ) -> Self {
        Self {
            students,
            attendance,
            calendar,
        }
    }

    /// Strict resolution: unknown grades and unconfigured calendars reject
    /// the recording rather than mis-bucket it.
    async fn resolve_strict(&self, grade: &str, timestamp: i64) -> SyncResult<Quarter> {
        let division = Division::from_grade(grade)
            .ok_or_else(|| SyncError::UnknownGrade(grade.to_string()))?;
        let config = self
            .calendar
            .period_config()
            .await?
            .ok_or(SyncError::CalendarNotConfigured)?;
        resolve_period(&config, timestamp, division).ok_or(SyncError::CalendarNotConfigured)
    }

    /// Lenient resolution for the bulk sweep: anything unresolved collapses
    /// to the fallback quarter.
    async fn resolve_lenient(&self, grade: &str, timestamp: i64) -> SyncResult<Quarter> {
        let resolved = match Division::from_grade(grade) {
            Some(division) => self
                .calendar
                .period_config()
                .await?
                .and_then(|config| resolve_period(&config, timestamp, division)),
            None => None,
        };
        Ok(resolved.unwrap_or(FALLBACK_QUARTER))
    }

    fn subject_for(kind: RecordKind, subject: Option<&str>) -> SyncResult<Option<String>> {
        match kind {
            RecordKind::Subject => match subject {
                Some(name) if !name.trim().is_empty() => Ok(Some(name.to_string())),
                _ => Err(SyncError::MissingSubject),
            },
            RecordKind::Homeroom => Ok(None),
        }
    }

    /// Record a QR scan as "present" now.
    pub async fn record_scan(
        &self,
        student_id: &str,
        kind: RecordKind,
        subject: Option<&str>,
    ) -> SyncResult<AttendanceRecord> {
        let now = Local::now().timestamp_millis();

        let student = self
            .students
            .get(student_id)
            .await?
            .ok_or_else(|| SyncError::StudentNotFound(student_id.to_string()))?;

        let subject = Self::subject_for(kind, subject)?;
        let quarter = self.resolve_strict(&student.grade, now).await?;

        let mut record = AttendanceRecord::new(
            student.id.clone(),
            now,
            STATUS_PRESENT,
            kind,
            subject,
            quarter.as_str(),
        );
        record.id = self.attendance.record(&record).await?;
        self.attendance.request_sync();

        tracing::debug!(student_id = %student.id, "recorded scan");
        Ok(record)
    }

    /// Manual entry, resolving the student by id or by name and accepting
    /// the caller's status and timestamp.
    pub async fn record_manual(
        &self,
        identifier: &str,
        status: &str,
        kind: RecordKind,
        subject: Option<&str>,
        timestamp: i64,
    ) -> SyncResult<AttendanceRecord> {
        let student = match self.students.get(identifier).await? {
            Some(student) => student,
            None => self
                .find_by_name(identifier)
                .await?
                .ok_or_else(|| SyncError::StudentNotFound(identifier.to_string()))?,
        };

        let subject = Self::subject_for(kind, subject)?;
        let quarter = self.resolve_strict(&student.grade, timestamp).await?;

        let mut record = AttendanceRecord::new(
            student.id.clone(),
            timestamp,
            status,
            kind,
            subject,
            quarter.as_str(),
        );
        record.id = self.attendance.record(&record).await?;
        self.attendance.request_sync();
        Ok(record)
    }

    /// Case-insensitive name match: "First Last", "Last, First", first or
    /// last name alone.
    async fn find_by_name(&self, identifier: &str) -> SyncResult<Option<Student>> {
        let all = self.students.all().await?;
        Ok(all.into_iter().find(|student| {
            let full = format!("{} {}", student.first_name, student.last_name);
            let reversed = format!("{}, {}", student.last_name, student.first_name);
            full.eq_ignore_ascii_case(identifier)
                || reversed.eq_ignore_ascii_case(identifier)
                || student.first_name.eq_ignore_ascii_case(identifier)
                || student.last_name.eq_ignore_ascii_case(identifier)
        }))
    }

    /// Mark every enrolled student without a matching record today as
    /// absent. Returns the number of records written.
    pub async fn mark_absentees(
        &self,
        grade: &str,
        section: &str,
        kind: RecordKind,
        subject: Option<&str>,
    ) -> SyncResult<usize> {
        let enrolled = self.students.by_class(grade, section).await?;
        if enrolled.is_empty() {
            return Ok(0);
        }

        let subject = Self::subject_for(kind, subject)?;
        let now = Local::now().timestamp_millis();
        let since = start_of_today();

        let history = self
            .attendance
            .history_by_subject_in_range(subject.as_deref(), since, now)
            .await?;
        let covered: HashSet<&str> = history.iter().map(|r| r.student_id.as_str()).collect();

        let absentees: Vec<&Student> = enrolled
            .iter()
            .filter(|student| !covered.contains(student.id.as_str()))
            .collect();
        if absentees.is_empty() {
            return Ok(0);
        }

        let quarter = self.resolve_lenient(grade, now).await?;

        let mut marked = 0;
        for student in absentees {
            let record = AttendanceRecord::new(
                student.id.clone(),
                now,
                STATUS_ABSENT,
                kind,
                subject.clone(),
                quarter.as_str(),
            );
            self.attendance.record(&record).await?;
            marked += 1;
        }
        self.attendance.request_sync();

        tracing::debug!(grade = %grade, section = %section, marked, "marked absentees");
        Ok(marked)
    }

    /// No-class sweep: give every enrolled student a "Not Applicable"
    /// homeroom record at `day_start`, skipping students who already have a
    /// record at that exact timestamp.
    pub async fn mark_not_applicable(
        &self,
        grade: &str,
        section: &str,
        day_start: i64,
    ) -> SyncResult<usize> {
        let enrolled = self.students.by_class(grade, section).await?;

        let mut marked = 0;
        for student in enrolled {
            if self.attendance.exists(&student.id, day_start).await? {
                continue;
            }
            let record = AttendanceRecord::new(
                student.id.clone(),
                day_start,
                STATUS_NOT_APPLICABLE,
                RecordKind::Homeroom,
                None,
                "",
            );
            self.attendance.record(&record).await?;
            marked += 1;
        }
        Ok(marked)
    }
}
