//! Recording flows and roster administration: strict vs. lenient period
//! resolution, sweeps, adviser uniqueness, end-to-end scenario.

mod common;

use std::sync::Arc;

use common::{
    engine, init_tracing, open_store, period_config_covering_now, student, teacher,
};
use rollcall_remote::{MemoryRemote, RemoteStore};
use rollcall_store::{
    LocalStore, RecordKind, TeacherRole, STATUS_ABSENT, STATUS_LATE, STATUS_NOT_APPLICABLE,
};
use rollcall_sync::{
    start_of_today, AttendanceRepository, AttendanceService, CalendarRepository, NoopTrigger,
    RosterService, StudentRepository, SyncError, SyncOutcome, TeacherRepository, FALLBACK_QUARTER,
};

struct Fixture {
    store: Arc<LocalStore>,
    remote: Arc<MemoryRemote>,
    students: Arc<StudentRepository>,
    teachers: Arc<TeacherRepository>,
    attendance: Arc<AttendanceRepository>,
    calendar: Arc<CalendarRepository>,
    service: AttendanceService,
    roster: RosterService,
}

async fn fixture() -> (Fixture, tempfile::NamedTempFile) {
    init_tracing();
    let (store, guard) = open_store().await;
    let remote = Arc::new(MemoryRemote::new());

    let students = Arc::new(StudentRepository::new(
        Arc::clone(&store),
        Arc::clone(&remote) as Arc<dyn RemoteStore>,
    ));
    let teachers = Arc::new(TeacherRepository::new(
        Arc::clone(&store),
        Arc::clone(&remote) as Arc<dyn RemoteStore>,
    ));
    let attendance = Arc::new(AttendanceRepository::new(
        Arc::clone(&store),
        Arc::new(NoopTrigger),
    ));
    let calendar = Arc::new(CalendarRepository::new(Arc::clone(&store)));

    let service = AttendanceService::new(
        Arc::clone(&students),
        Arc::clone(&attendance),
        Arc::clone(&calendar),
    );
    let roster = RosterService::new(Arc::clone(&students), Arc::clone(&teachers));

    (
        Fixture {
            store,
            remote,
            students,
            teachers,
            attendance,
            calendar,
            service,
            roster,
        },
        guard,
    )
}

#[tokio::test]
async fn scan_records_present_with_resolved_period() {
    let (fx, _guard) = fixture().await;

    fx.calendar
        .set_period_config(&period_config_covering_now())
        .await
        .unwrap();
    fx.students.insert(&student("S1", "8", "A")).await.unwrap();

    let record = fx
        .service
        .record_scan("S1", RecordKind::Homeroom, None)
        .await
        .unwrap();

    assert_eq!(record.status, "present");
    assert_eq!(record.academic_period, "Q1");
    assert!(!record.synced);
    assert_eq!(fx.attendance.unsynced_count().await.unwrap(), 1);
}

#[tokio::test]
async fn scan_rejects_unconfigured_calendar() {
    let (fx, _guard) = fixture().await;

    fx.students.insert(&student("S1", "8", "A")).await.unwrap();

    let err = fx
        .service
        .record_scan("S1", RecordKind::Homeroom, None)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::CalendarNotConfigured));

    // Nothing was recorded.
    assert_eq!(fx.attendance.unsynced_count().await.unwrap(), 0);
}

#[tokio::test]
async fn scan_rejects_unknown_grade() {
    let (fx, _guard) = fixture().await;

    fx.calendar
        .set_period_config(&period_config_covering_now())
        .await
        .unwrap();
    fx.students.insert(&student("S1", "K", "A")).await.unwrap();

    let err = fx
        .service
        .record_scan("S1", RecordKind::Homeroom, None)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::UnknownGrade(_)));
}

#[tokio::test]
async fn subject_scan_requires_subject_name() {
    let (fx, _guard) = fixture().await;

    fx.calendar
        .set_period_config(&period_config_covering_now())
        .await
        .unwrap();
    fx.students.insert(&student("S1", "8", "A")).await.unwrap();

    let err = fx
        .service
        .record_scan("S1", RecordKind::Subject, None)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::MissingSubject));

    let record = fx
        .service
        .record_scan("S1", RecordKind::Subject, Some("Math"))
        .await
        .unwrap();
    assert_eq!(record.subject.as_deref(), Some("Math"));
}

#[tokio::test]
async fn manual_entry_resolves_by_name() {
    let (fx, _guard) = fixture().await;

    fx.calendar
        .set_period_config(&period_config_covering_now())
        .await
        .unwrap();
    let mut ana = student("S1", "8", "A");
    ana.first_name = "Ana".to_string();
    ana.last_name = "Reyes".to_string();
    fx.students.insert(&ana).await.unwrap();

    let now = chrono::Local::now().timestamp_millis();

    for identifier in ["Ana Reyes", "reyes, ana", "ANA", "Reyes"] {
        let record = fx
            .service
            .record_manual(identifier, STATUS_LATE, RecordKind::Homeroom, None, now + 1)
            .await
            .unwrap();
        assert_eq!(record.student_id, "S1");
        assert_eq!(record.status, STATUS_LATE);
    }

    let err = fx
        .service
        .record_manual("Nobody Here", STATUS_LATE, RecordKind::Homeroom, None, now)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::StudentNotFound(_)));
}

#[tokio::test]
async fn absentee_sweep_marks_uncovered_students() {
    let (fx, _guard) = fixture().await;

    fx.calendar
        .set_period_config(&period_config_covering_now())
        .await
        .unwrap();
    fx.students.insert(&student("S1", "8", "A")).await.unwrap();
    fx.students.insert(&student("S2", "8", "A")).await.unwrap();
    fx.students.insert(&student("S3", "8", "A")).await.unwrap();

    // S1 scanned in this morning.
    fx.service
        .record_scan("S1", RecordKind::Homeroom, None)
        .await
        .unwrap();

    let marked = fx
        .service
        .mark_absentees("8", "A", RecordKind::Homeroom, None)
        .await
        .unwrap();
    assert_eq!(marked, 2);

    let absents = fx
        .attendance
        .count_status_since(STATUS_ABSENT, start_of_today())
        .await
        .unwrap();
    assert_eq!(absents, 2);

    // A second sweep finds everyone covered.
    let again = fx
        .service
        .mark_absentees("8", "A", RecordKind::Homeroom, None)
        .await
        .unwrap();
    assert_eq!(again, 0);
}

#[tokio::test]
async fn absentee_sweep_falls_back_without_calendar() {
    let (fx, _guard) = fixture().await;

    // No period config at all; the bulk sweep still runs.
    fx.students.insert(&student("S1", "8", "A")).await.unwrap();

    let marked = fx
        .service
        .mark_absentees("8", "A", RecordKind::Homeroom, None)
        .await
        .unwrap();
    assert_eq!(marked, 1);

    let history = fx.attendance.student_history("S1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].academic_period, FALLBACK_QUARTER.as_str());
}

#[tokio::test]
async fn no_class_sweep_is_idempotent_per_day() {
    let (fx, _guard) = fixture().await;

    fx.students.insert(&student("S1", "8", "A")).await.unwrap();
    fx.students.insert(&student("S2", "8", "A")).await.unwrap();

    let day = start_of_today();
    let is_no_class = fx
        .calendar
        .set_daily_status(day, "Suspended (Typhoon)")
        .await
        .unwrap();
    assert!(is_no_class);
    assert!(fx.calendar.is_no_class_day(day).await.unwrap());

    let marked = fx.service.mark_not_applicable("8", "A", day).await.unwrap();
    assert_eq!(marked, 2);

    let history = fx.attendance.student_history("S1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, STATUS_NOT_APPLICABLE);

    // Re-running the sweep adds nothing.
    let again = fx.service.mark_not_applicable("8", "A", day).await.unwrap();
    assert_eq!(again, 0);

    // Reverting to a class day removes the event.
    let reverted = fx.calendar.set_daily_status(day, "Class Day").await.unwrap();
    assert!(!reverted);
    assert!(!fx.calendar.is_no_class_day(day).await.unwrap());
}

#[tokio::test]
async fn adviser_assignment_is_unique_per_class() {
    let (fx, _guard) = fixture().await;

    fx.teachers.insert(&teacher("T1", "one")).await.unwrap();
    fx.teachers.insert(&teacher("T2", "two")).await.unwrap();
    fx.teachers.insert(&teacher("T3", "three")).await.unwrap();

    fx.roster.assign_adviser("T1", "8", "A", None).await.unwrap();
    fx.roster.assign_adviser("T2", "8", "B", None).await.unwrap();
    // T3 takes 8-A away from T1.
    fx.roster
        .assign_adviser("T3", "8", "A", Some("STEM"))
        .await
        .unwrap();

    let all = fx.teachers.all().await.unwrap();
    let holders: Vec<_> = all.iter().filter(|t| t.is_adviser_of("8", "A")).collect();
    assert_eq!(holders.len(), 1);
    assert_eq!(holders[0].id, "T3");
    assert_eq!(holders[0].role, TeacherRole::Adviser);

    let demoted = fx.teachers.get("T1").await.unwrap().unwrap();
    assert_eq!(demoted.role, TeacherRole::Subject);
    assert_eq!(demoted.advisory_grade, None);
    assert_eq!(demoted.advisory_section, None);

    // Re-assigning the current holder is a no-op for uniqueness.
    fx.roster
        .assign_adviser("T3", "8", "A", Some("STEM"))
        .await
        .unwrap();
    let all = fx.teachers.all().await.unwrap();
    assert_eq!(all.iter().filter(|t| t.is_adviser_of("8", "A")).count(), 1);

    // T2 kept its own class the whole time.
    let untouched = fx.teachers.get("T2").await.unwrap().unwrap();
    assert!(untouched.is_adviser_of("8", "B"));
}

#[tokio::test]
async fn section_rename_moves_students() {
    let (fx, _guard) = fixture().await;

    fx.teachers.insert(&teacher("T1", "one")).await.unwrap();
    fx.teachers.insert(&teacher("T2", "two")).await.unwrap();
    fx.roster.assign_adviser("T1", "8", "A", None).await.unwrap();

    fx.students.insert(&student("S1", "8", "A")).await.unwrap();
    fx.students.insert(&student("S2", "8", "A")).await.unwrap();
    fx.students.insert(&student("S3", "8", "B")).await.unwrap();

    fx.roster
        .rename_section("T1", "8", "A", "T2", "A-Renamed", None)
        .await
        .unwrap();

    let old_adviser = fx.teachers.get("T1").await.unwrap().unwrap();
    assert_eq!(old_adviser.role, TeacherRole::Subject);

    let new_adviser = fx.teachers.get("T2").await.unwrap().unwrap();
    assert!(new_adviser.is_adviser_of("8", "A-Renamed"));

    let moved = fx.students.by_class("8", "A-Renamed").await.unwrap();
    assert_eq!(moved.len(), 2);
    assert!(fx.students.by_class("8", "A").await.unwrap().is_empty());
    assert_eq!(fx.students.by_class("8", "B").await.unwrap().len(), 1);
}

#[tokio::test]
async fn generated_ids_have_year_prefix_and_avoid_collisions() {
    let (fx, _guard) = fixture().await;

    let id = fx.roster.generate_student_id().await.unwrap();
    let (year, number) = id.split_once('-').unwrap();
    assert_eq!(year.len(), 2);
    assert_eq!(number.len(), 4);
    assert!(number.parse::<u32>().is_ok());

    // Imported rows get distinct generated ids and the first-name username.
    let rows = vec![
        rollcall_sync::NewStudent {
            first_name: "Ana".to_string(),
            last_name: "Reyes".to_string(),
            grade: "8".to_string(),
            section: "A".to_string(),
        },
        rollcall_sync::NewStudent {
            first_name: "Ben".to_string(),
            last_name: "Lim".to_string(),
            grade: "8".to_string(),
            section: "A".to_string(),
        },
    ];
    assert_eq!(fx.roster.import_students(&rows).await.unwrap(), 2);

    let imported = fx.students.by_class("8", "A").await.unwrap();
    assert_eq!(imported.len(), 2);
    let ids: std::collections::HashSet<_> = imported.iter().map(|s| s.id.clone()).collect();
    assert_eq!(ids.len(), 2);
    assert!(imported.iter().any(|s| s.username.as_deref() == Some("Ana")));
}

#[tokio::test]
async fn end_to_end_scenario() {
    let (fx, _guard) = fixture().await;

    // Seed: one adviser with a class, one student, a calendar covering now.
    fx.calendar
        .set_period_config(&period_config_covering_now())
        .await
        .unwrap();
    fx.teachers.insert(&teacher("T1", "one")).await.unwrap();
    fx.roster.assign_adviser("T1", "8", "A", None).await.unwrap();
    fx.students.insert(&student("S1", "8", "A")).await.unwrap();

    // Record homeroom attendance: period resolved, unsynced.
    let record = fx
        .service
        .record_scan("S1", RecordKind::Homeroom, None)
        .await
        .unwrap();
    assert_eq!(record.academic_period, "Q1");
    assert!(!record.synced);

    // First pass: attendance pushed under a generated key, state types
    // pushed and pulled, config round-tripped.
    let sync = engine(Arc::clone(&fx.store), Arc::clone(&fx.remote));
    let stats = match sync.run_once().await {
        SyncOutcome::Completed(stats) => stats,
        SyncOutcome::Retry => panic!("first pass should complete"),
    };
    assert_eq!(stats.attendance_pushed, 1);
    assert!(stats.config_pushed && stats.config_pulled);
    assert_eq!(fx.attendance.unsynced_count().await.unwrap(), 0);

    let snapshot = fx.remote.snapshot().await;
    assert_eq!(snapshot["attendance"].as_object().unwrap().len(), 1);
    assert_eq!(snapshot["teachers"]["T1"]["role"], "adviser");
    assert_eq!(snapshot["students"]["S1"]["grade"], "8");

    // Second immediate pass: zero new remote writes, zero new local rows.
    let local_attendance = fx.attendance.all_history().await.unwrap();
    let stats = match sync.run_once().await {
        SyncOutcome::Completed(stats) => stats,
        SyncOutcome::Retry => panic!("second pass should complete"),
    };
    assert_eq!(stats.attendance_pushed, 0);
    assert_eq!(stats.attendance_pulled, 0);
    assert_eq!(fx.remote.snapshot().await, snapshot);
    assert_eq!(fx.attendance.all_history().await.unwrap(), local_attendance);
}
