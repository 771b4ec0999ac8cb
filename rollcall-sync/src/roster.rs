//! Roster administration: adviser assignment and student onboarding.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Datelike, Local};
use rand::Rng;

use rollcall_store::{Student, Teacher, TeacherRole};

use crate::error::{SyncError, SyncResult};
use crate::students::StudentRepository;
use crate::teachers::TeacherRepository;

/// Pre-parsed student row for bulk import; the CSV handling itself lives
/// outside the core.
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub grade: String,
    pub section: String,
}

pub struct RosterService {
    students: Arc<StudentRepository>,
    teachers: Arc<TeacherRepository>,
}

fn clear_advisory(mut teacher: Teacher) -> Teacher {
    teacher.advisory_grade = None;
    teacher.advisory_section = None;
    teacher.advisory_track = None;
    teacher.advisory_start_time = None;
    teacher.role = TeacherRole::Subject;
    teacher
}

impl RosterService {
    pub fn new(students: Arc<StudentRepository>, teachers: Arc<TeacherRepository>) -> Self {
        Self { students, teachers }
    }

    /// Make `teacher_id` the adviser of (grade, section). Any other teacher
    /// holding that pair is cleared and demoted first, so at most one
    /// adviser ever holds a class.
    pub async fn assign_adviser(
        &self,
        teacher_id: &str,
        grade: &str,
        section: &str,
        track: Option<&str>,
    ) -> SyncResult<()> {
        let teacher = self
            .teachers
            .get(teacher_id)
            .await?
            .ok_or_else(|| SyncError::TeacherNotFound(teacher_id.to_string()))?;

        let all = self.teachers.all().await?;
        if let Some(existing) = all
            .into_iter()
            .find(|t| t.is_adviser_of(grade, section) && t.id != teacher.id)
        {
            self.teachers.update(&clear_advisory(existing)).await?;
        }

        let mut promoted = teacher;
        promoted.advisory_grade = Some(grade.to_string());
        promoted.advisory_section = Some(section.to_string());
        promoted.advisory_track = track.map(str::to_string);
        promoted.role = TeacherRole::Adviser;
        self.teachers.update(&promoted).await?;

        Ok(())
    }

    pub async fn remove_adviser(&self, teacher_id: &str) -> SyncResult<()> {
        let teacher = self
            .teachers
            .get(teacher_id)
            .await?
            .ok_or_else(|| SyncError::TeacherNotFound(teacher_id.to_string()))?;
        self.teachers.update(&clear_advisory(teacher)).await?;
        Ok(())
    }

    /// Hand a section to a new adviser, optionally renaming it; students of
    /// the old section move to the new name.
    pub async fn rename_section(
        &self,
        old_adviser_id: &str,
        grade: &str,
        old_section: &str,
        new_adviser_id: &str,
        new_section: &str,
        track: Option<&str>,
    ) -> SyncResult<()> {
        if old_adviser_id != new_adviser_id {
            if let Some(old_adviser) = self.teachers.get(old_adviser_id).await? {
                self.teachers.update(&clear_advisory(old_adviser)).await?;
            }
        }

        let new_adviser = self
            .teachers
            .get(new_adviser_id)
            .await?
            .ok_or_else(|| SyncError::TeacherNotFound(new_adviser_id.to_string()))?;
        let mut promoted = new_adviser;
        promoted.advisory_grade = Some(grade.to_string());
        promoted.advisory_section = Some(new_section.to_string());
        promoted.advisory_track = track.map(str::to_string);
        promoted.role = TeacherRole::Adviser;
        self.teachers.update(&promoted).await?;

        if old_section != new_section {
            let moving = self.students.by_class_all(grade, old_section).await?;
            for student in moving {
                let mut moved = student;
                moved.section = new_section.to_string();
                self.students.update(&moved).await?;
            }
        }

        Ok(())
    }

    /// Fresh student id in `YY-NNNN` form, collision-checked locally.
    pub async fn generate_student_id(&self) -> SyncResult<String> {
        let year = Local::now().year() % 100;

        for _ in 0..1_000 {
            let number: u32 = rand::thread_rng().gen_range(1000..=9999);
            let id = format!("{:02}-{:04}", year, number);
            if !self.students.exists_local(&id).await? {
                return Ok(id);
            }
        }
        Err(SyncError::Internal("student id space exhausted".to_string()))
    }

    /// Enroll one student; the username defaults to the first name until the
    /// student changes credentials.
    pub async fn add_student(
        &self,
        id: &str,
        first_name: &str,
        last_name: &str,
        grade: &str,
        section: &str,
    ) -> SyncResult<Student> {
        let student = Student {
            id: id.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            grade: grade.to_string(),
            section: section.to_string(),
            username: Some(first_name.to_string()),
            password: None,
            has_changed_credentials: false,
            is_archived: false,
        };
        self.students.insert(&student).await?;
        Ok(student)
    }

    /// Bulk enrollment with generated ids; one local transaction and one
    /// batched mirror write.
    pub async fn import_students(&self, rows: &[NewStudent]) -> SyncResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut used: HashSet<String> = HashSet::new();
        let mut students = Vec::with_capacity(rows.len());

        for row in rows {
            let mut id = self.generate_student_id().await?;
            while used.contains(&id) {
                id = self.generate_student_id().await?;
            }
            used.insert(id.clone());

            students.push(Student {
                id,
                first_name: row.first_name.clone(),
                last_name: row.last_name.clone(),
                grade: row.grade.clone(),
                section: row.section.clone(),
                username: Some(row.first_name.clone()),
                password: None,
                has_changed_credentials: false,
                is_archived: false,
            });
        }

        self.students.insert_all(&students).await?;
        Ok(students.len())
    }
}
