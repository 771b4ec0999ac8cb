//! Teacher table operations.
//!
//! Role and department are stored as text codes; rows are mapped by hand so
//! the codes round-trip through the typed enums.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::error::{StoreError, StoreResult};
use crate::live::Table;
use crate::models::{Department, Teacher, TeacherRole};
use crate::LocalStore;

fn teacher_from_row(row: &SqliteRow) -> StoreResult<Teacher> {
    let role: String = row.try_get("role")?;
    let department: Option<String> = row.try_get("department")?;

    Ok(Teacher {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password: row.try_get("password")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        role: TeacherRole::from_str(&role)?,
        department: department.as_deref().map(Department::from_str).transpose()?,
        advisory_grade: row.try_get("advisory_grade")?,
        advisory_section: row.try_get("advisory_section")?,
        advisory_track: row.try_get("advisory_track")?,
        advisory_start_time: row.try_get("advisory_start_time")?,
        has_changed_credentials: row.try_get("has_changed_credentials")?,
    })
}

impl LocalStore {
    /// Insert or replace a teacher row. The unique username index makes this
    /// evict a conflicting row wholesale, matching last-writer-wins pulls.
    pub async fn insert_teacher(&self, teacher: &Teacher) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO teachers (
                id, username, password, first_name, last_name, email,
                role, department, advisory_grade, advisory_section,
                advisory_track, advisory_start_time, has_changed_credentials
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&teacher.id)
        .bind(&teacher.username)
        .bind(&teacher.password)
        .bind(&teacher.first_name)
        .bind(&teacher.last_name)
        .bind(&teacher.email)
        .bind(teacher.role.as_str())
        .bind(teacher.department.map(|d| d.as_str()))
        .bind(&teacher.advisory_grade)
        .bind(&teacher.advisory_section)
        .bind(&teacher.advisory_track)
        .bind(&teacher.advisory_start_time)
        .bind(teacher.has_changed_credentials)
        .execute(self.pool())
        .await?;

        self.notify(Table::Teachers);
        Ok(())
    }

    pub async fn update_teacher(&self, teacher: &Teacher) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE teachers
            SET username = ?, password = ?, first_name = ?, last_name = ?, email = ?,
                role = ?, department = ?, advisory_grade = ?, advisory_section = ?,
                advisory_track = ?, advisory_start_time = ?, has_changed_credentials = ?
            WHERE id = ?
            "#,
        )
        .bind(&teacher.username)
        .bind(&teacher.password)
        .bind(&teacher.first_name)
        .bind(&teacher.last_name)
        .bind(&teacher.email)
        .bind(teacher.role.as_str())
        .bind(teacher.department.map(|d| d.as_str()))
        .bind(&teacher.advisory_grade)
        .bind(&teacher.advisory_section)
        .bind(&teacher.advisory_track)
        .bind(&teacher.advisory_start_time)
        .bind(teacher.has_changed_credentials)
        .bind(&teacher.id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("teacher {}", teacher.id)));
        }

        self.notify(Table::Teachers);
        Ok(())
    }

    pub async fn teacher_by_id(&self, id: &str) -> StoreResult<Option<Teacher>> {
        let row = sqlx::query("SELECT * FROM teachers WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(teacher_from_row).transpose()
    }

    pub async fn teacher_by_username(&self, username: &str) -> StoreResult<Option<Teacher>> {
        let row = sqlx::query("SELECT * FROM teachers WHERE username = ? LIMIT 1")
            .bind(username)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(teacher_from_row).transpose()
    }

    pub async fn all_teachers(&self) -> StoreResult<Vec<Teacher>> {
        let rows = sqlx::query("SELECT * FROM teachers ORDER BY id")
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(teacher_from_row).collect()
    }

    /// Partial update of the advisory assignment. The role follows the
    /// grade: a present grade makes an adviser, a cleared one a subject
    /// teacher.
    pub async fn update_teacher_advisory(
        &self,
        id: &str,
        grade: Option<&str>,
        section: Option<&str>,
        track: Option<&str>,
        start_time: Option<&str>,
    ) -> StoreResult<()> {
        let role = if grade.is_some() {
            TeacherRole::Adviser
        } else {
            TeacherRole::Subject
        };

        let result = sqlx::query(
            r#"
            UPDATE teachers
            SET advisory_grade = ?, advisory_section = ?, advisory_track = ?,
                advisory_start_time = ?, role = ?
            WHERE id = ?
            "#,
        )
        .bind(grade)
        .bind(section)
        .bind(track)
        .bind(start_time)
        .bind(role.as_str())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("teacher {}", id)));
        }

        self.notify(Table::Teachers);
        Ok(())
    }

    pub async fn update_teacher_credentials(
        &self,
        id: &str,
        username: &str,
        password: &str,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE teachers
            SET username = ?, password = ?, has_changed_credentials = 1
            WHERE id = ?
            "#,
        )
        .bind(username)
        .bind(password)
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("teacher {}", id)));
        }

        self.notify(Table::Teachers);
        Ok(())
    }

    pub async fn delete_teacher(&self, id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM teachers WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        self.notify(Table::Teachers);
        Ok(())
    }

    pub async fn delete_all_teachers(&self) -> StoreResult<()> {
        sqlx::query("DELETE FROM teachers").execute(self.pool()).await?;
        self.notify(Table::Teachers);
        Ok(())
    }
}
