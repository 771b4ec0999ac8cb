//! Student table operations.

use crate::error::{StoreError, StoreResult};
use crate::live::Table;
use crate::models::Student;
use crate::LocalStore;

impl LocalStore {
    /// Insert or replace a student row (full-row upsert).
    pub async fn insert_student(&self, student: &Student) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO students (
                id, first_name, last_name, grade, section,
                username, password, has_changed_credentials, is_archived
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&student.id)
        .bind(&student.first_name)
        .bind(&student.last_name)
        .bind(&student.grade)
        .bind(&student.section)
        .bind(&student.username)
        .bind(&student.password)
        .bind(student.has_changed_credentials)
        .bind(student.is_archived)
        .execute(self.pool())
        .await?;

        self.notify(Table::Students);
        Ok(())
    }

    /// Bulk upsert in one transaction.
    pub async fn insert_students(&self, students: &[Student]) -> StoreResult<()> {
        if students.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool().begin().await?;
        for student in students {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO students (
                    id, first_name, last_name, grade, section,
                    username, password, has_changed_credentials, is_archived
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&student.id)
            .bind(&student.first_name)
            .bind(&student.last_name)
            .bind(&student.grade)
            .bind(&student.section)
            .bind(&student.username)
            .bind(&student.password)
            .bind(student.has_changed_credentials)
            .bind(student.is_archived)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        self.notify(Table::Students);
        Ok(())
    }

    /// Update an existing student row.
    pub async fn update_student(&self, student: &Student) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE students
            SET first_name = ?, last_name = ?, grade = ?, section = ?,
                username = ?, password = ?, has_changed_credentials = ?, is_archived = ?
            WHERE id = ?
            "#,
        )
        .bind(&student.first_name)
        .bind(&student.last_name)
        .bind(&student.grade)
        .bind(&student.section)
        .bind(&student.username)
        .bind(&student.password)
        .bind(student.has_changed_credentials)
        .bind(student.is_archived)
        .bind(&student.id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("student {}", student.id)));
        }

        self.notify(Table::Students);
        Ok(())
    }

    pub async fn student_by_id(&self, id: &str) -> StoreResult<Option<Student>> {
        let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(student)
    }

    pub async fn student_by_username(&self, username: &str) -> StoreResult<Option<Student>> {
        let student =
            sqlx::query_as::<_, Student>("SELECT * FROM students WHERE username = ? LIMIT 1")
                .bind(username)
                .fetch_optional(self.pool())
                .await?;
        Ok(student)
    }

    /// Lookup by either id or username in one query.
    pub async fn student_by_login(&self, login: &str) -> StoreResult<Option<Student>> {
        let student = sqlx::query_as::<_, Student>(
            "SELECT * FROM students WHERE id = ? OR username = ? LIMIT 1",
        )
        .bind(login)
        .bind(login)
        .fetch_optional(self.pool())
        .await?;
        Ok(student)
    }

    /// Every student row, archived included.
    pub async fn all_students(&self) -> StoreResult<Vec<Student>> {
        let students = sqlx::query_as::<_, Student>("SELECT * FROM students ORDER BY id")
            .fetch_all(self.pool())
            .await?;
        Ok(students)
    }

    /// Active roster of one class.
    pub async fn students_by_class(&self, grade: &str, section: &str) -> StoreResult<Vec<Student>> {
        let students = sqlx::query_as::<_, Student>(
            r#"
            SELECT * FROM students
            WHERE grade = ? AND section = ? AND is_archived = 0
            ORDER BY last_name, first_name
            "#,
        )
        .bind(grade)
        .bind(section)
        .fetch_all(self.pool())
        .await?;
        Ok(students)
    }

    /// One class including archived students (attendance history exports).
    pub async fn students_by_class_all(
        &self,
        grade: &str,
        section: &str,
    ) -> StoreResult<Vec<Student>> {
        let students = sqlx::query_as::<_, Student>(
            r#"
            SELECT * FROM students
            WHERE grade = ? AND section = ?
            ORDER BY last_name, first_name
            "#,
        )
        .bind(grade)
        .bind(section)
        .fetch_all(self.pool())
        .await?;
        Ok(students)
    }

    pub async fn archived_students(&self) -> StoreResult<Vec<Student>> {
        let students = sqlx::query_as::<_, Student>(
            "SELECT * FROM students WHERE is_archived = 1 ORDER BY last_name, first_name",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(students)
    }

    /// Flag-only flip; the row keeps its other fields.
    pub async fn set_student_archived(&self, id: &str, archived: bool) -> StoreResult<()> {
        let result = sqlx::query("UPDATE students SET is_archived = ? WHERE id = ?")
            .bind(archived)
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("student {}", id)));
        }

        self.notify(Table::Students);
        Ok(())
    }

    pub async fn update_student_credentials(
        &self,
        id: &str,
        username: &str,
        password: &str,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE students
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
            return Err(StoreError::NotFound(format!("student {}", id)));
        }

        self.notify(Table::Students);
        Ok(())
    }

    pub async fn delete_student(&self, id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        self.notify(Table::Students);
        Ok(())
    }

    pub async fn delete_all_students(&self) -> StoreResult<()> {
        sqlx::query("DELETE FROM students").execute(self.pool()).await?;
        self.notify(Table::Students);
        Ok(())
    }

    pub async fn count_students_by_class(&self, grade: &str, section: &str) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM students WHERE grade = ? AND section = ? AND is_archived = 0",
        )
        .bind(grade)
        .bind(section)
        .fetch_one(self.pool())
        .await?;
        Ok(count)
    }

}
