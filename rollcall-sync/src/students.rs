//! Student repository: local writes with a best-effort remote mirror, and
//! remote-fallback lookups with local write-through.

use std::sync::Arc;

use serde_json::{json, Map};
use tokio::sync::watch;

use rollcall_remote::{is_valid_key, RemoteStore};
use rollcall_store::{live, LocalStore, Student};

use crate::error::SyncResult;
use crate::mirror::RemoteMirror;
use crate::paths;

pub struct StudentRepository {
    store: Arc<LocalStore>,
    mirror: RemoteMirror,
}

impl StudentRepository {
    pub fn new(store: Arc<LocalStore>, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            mirror: RemoteMirror::new(remote),
        }
    }

    fn entity_path(id: &str) -> String {
        format!("{}/{}", paths::STUDENTS, id)
    }

    /// Local read; on miss one remote read-by-key with local write-through.
    /// Remote failures degrade to "not found".
    pub async fn get(&self, id: &str) -> SyncResult<Option<Student>> {
        if let Some(local) = self.store.student_by_id(id).await? {
            return Ok(Some(local));
        }
        self.fetch_remote(&Self::entity_path(id)).await
    }

    pub async fn get_by_username(&self, username: &str) -> SyncResult<Option<Student>> {
        if let Some(local) = self.store.student_by_username(username).await? {
            return Ok(Some(local));
        }
        self.query_remote("username", username).await
    }

    /// Login lookup: local id-or-username first, then remote by id (when the
    /// login is even a legal key), then remote by username. First match wins.
    pub async fn find_by_login(&self, login: &str) -> SyncResult<Option<Student>> {
        if let Some(local) = self.store.student_by_login(login).await? {
            return Ok(Some(local));
        }

        // A login containing key-illegal characters cannot be an id key; go
        // straight to the username query.
        if is_valid_key(login) {
            if let Some(student) = self.fetch_remote(&Self::entity_path(login)).await? {
                return Ok(Some(student));
            }
        }

        self.query_remote("username", login).await
    }

    /// Read one remote document and write it through into the local store.
    async fn fetch_remote(&self, path: &str) -> SyncResult<Option<Student>> {
        let value = match self.mirror.remote().read(path).await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "remote student lookup failed");
                return Ok(None);
            }
        };

        let Some(value) = value else { return Ok(None) };
        match serde_json::from_value::<Student>(value) {
            Ok(student) => {
                self.store.insert_student(&student).await?;
                Ok(Some(student))
            }
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "malformed remote student document");
                Ok(None)
            }
        }
    }

    async fn query_remote(&self, field: &str, value: &str) -> SyncResult<Option<Student>> {
        let matches = match self
            .mirror
            .remote()
            .query_equal(paths::STUDENTS, field, &json!(value))
            .await
        {
            Ok(matches) => matches,
            Err(err) => {
                tracing::warn!(field = %field, error = %err, "remote student query failed");
                return Ok(None);
            }
        };

        for candidate in matches {
            match serde_json::from_value::<Student>(candidate) {
                Ok(student) => {
                    self.store.insert_student(&student).await?;
                    return Ok(Some(student));
                }
                Err(err) => {
                    tracing::warn!(field = %field, error = %err, "malformed remote student document");
                }
            }
        }
        Ok(None)
    }

    /// Local write defines success; the mirror write runs in the background.
    pub async fn insert(&self, student: &Student) -> SyncResult<()> {
        self.store.insert_student(student).await?;
        self.mirror
            .spawn_write_full(Self::entity_path(&student.id), serde_json::to_value(student)?);
        Ok(())
    }

    /// Bulk local write, then one batched mirror write keyed by `/id`.
    pub async fn insert_all(&self, students: &[Student]) -> SyncResult<()> {
        self.store.insert_students(students).await?;

        if !students.is_empty() {
            let mut children = Map::new();
            for student in students {
                children.insert(format!("/{}", student.id), serde_json::to_value(student)?);
            }
            self.mirror.spawn_write_batch(paths::STUDENTS.to_string(), children);
        }
        Ok(())
    }

    pub async fn update(&self, student: &Student) -> SyncResult<()> {
        self.store.update_student(student).await?;
        self.mirror
            .spawn_write_full(Self::entity_path(&student.id), serde_json::to_value(student)?);
        Ok(())
    }

    /// Flag-only flip, mirrored as a partial update so concurrent remote
    /// edits to other fields survive.
    pub async fn archive(&self, id: &str) -> SyncResult<()> {
        self.set_archived(id, true).await
    }

    pub async fn restore(&self, id: &str) -> SyncResult<()> {
        self.set_archived(id, false).await
    }

    async fn set_archived(&self, id: &str, archived: bool) -> SyncResult<()> {
        self.store.set_student_archived(id, archived).await?;

        let mut fields = Map::new();
        fields.insert("isArchived".to_string(), json!(archived));
        self.mirror.spawn_write_partial(Self::entity_path(id), fields);
        Ok(())
    }

    pub async fn update_credentials(
        &self,
        id: &str,
        username: &str,
        password: &str,
    ) -> SyncResult<()> {
        self.store.update_student_credentials(id, username, password).await?;

        let mut fields = Map::new();
        fields.insert("username".to_string(), json!(username));
        fields.insert("password".to_string(), json!(password));
        fields.insert("hasChangedCredentials".to_string(), json!(true));
        self.mirror.spawn_write_partial(Self::entity_path(id), fields);
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> SyncResult<()> {
        self.store.delete_student(id).await?;
        self.mirror.spawn_delete(Self::entity_path(id));
        Ok(())
    }

    /// Local-only clear; the remote roster is left in place.
    pub async fn delete_all(&self) -> SyncResult<()> {
        self.store.delete_all_students().await?;
        Ok(())
    }

    pub async fn exists_local(&self, id: &str) -> SyncResult<bool> {
        Ok(self.store.student_by_id(id).await?.is_some())
    }

    pub async fn all(&self) -> SyncResult<Vec<Student>> {
        Ok(self.store.all_students().await?)
    }

    pub async fn by_class(&self, grade: &str, section: &str) -> SyncResult<Vec<Student>> {
        Ok(self.store.students_by_class(grade, section).await?)
    }

    pub async fn by_class_all(&self, grade: &str, section: &str) -> SyncResult<Vec<Student>> {
        Ok(self.store.students_by_class_all(grade, section).await?)
    }

    pub async fn archived(&self) -> SyncResult<Vec<Student>> {
        Ok(self.store.archived_students().await?)
    }

    pub async fn count_by_class(&self, grade: &str, section: &str) -> SyncResult<i64> {
        Ok(self.store.count_students_by_class(grade, section).await?)
    }

    /// Live snapshot of the full roster.
    pub fn watch(&self) -> watch::Receiver<Vec<Student>> {
        live::watch_students(Arc::clone(&self.store))
    }
}
