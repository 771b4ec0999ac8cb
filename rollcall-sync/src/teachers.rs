//! Teacher repository: local writes with a best-effort remote mirror, and
//! remote-fallback lookups with local write-through.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio::sync::watch;

use rollcall_remote::RemoteStore;
use rollcall_store::{live, LocalStore, Teacher, TeacherRole};

use crate::error::SyncResult;
use crate::mirror::RemoteMirror;
use crate::paths;

pub struct TeacherRepository {
    store: Arc<LocalStore>,
    mirror: RemoteMirror,
}

impl TeacherRepository {
    pub fn new(store: Arc<LocalStore>, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            mirror: RemoteMirror::new(remote),
        }
    }

    fn entity_path(id: &str) -> String {
        format!("{}/{}", paths::TEACHERS, id)
    }

    /// Local read; on miss one remote read-by-key with local write-through.
    pub async fn get(&self, id: &str) -> SyncResult<Option<Teacher>> {
        if let Some(local) = self.store.teacher_by_id(id).await? {
            return Ok(Some(local));
        }

        let path = Self::entity_path(id);
        let value = match self.mirror.remote().read(&path).await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "remote teacher lookup failed");
                return Ok(None);
            }
        };

        match value {
            Some(value) => self.write_through(value).await,
            None => Ok(None),
        }
    }

    /// Username is unique; any remote duplicates resolve to the first match
    /// in key order.
    pub async fn get_by_username(&self, username: &str) -> SyncResult<Option<Teacher>> {
        if let Some(local) = self.store.teacher_by_username(username).await? {
            return Ok(Some(local));
        }

        let matches = match self
            .mirror
            .remote()
            .query_equal(paths::TEACHERS, "username", &json!(username))
            .await
        {
            Ok(matches) => matches,
            Err(err) => {
                tracing::warn!(username = %username, error = %err, "remote teacher query failed");
                return Ok(None);
            }
        };

        for candidate in matches {
            if let Some(teacher) = self.write_through(candidate).await? {
                return Ok(Some(teacher));
            }
        }
        Ok(None)
    }

    async fn write_through(&self, value: Value) -> SyncResult<Option<Teacher>> {
        match serde_json::from_value::<Teacher>(value) {
            Ok(teacher) => {
                self.store.insert_teacher(&teacher).await?;
                Ok(Some(teacher))
            }
            Err(err) => {
                tracing::warn!(error = %err, "malformed remote teacher document");
                Ok(None)
            }
        }
    }

    pub async fn insert(&self, teacher: &Teacher) -> SyncResult<()> {
        self.store.insert_teacher(teacher).await?;
        self.mirror
            .spawn_write_full(Self::entity_path(&teacher.id), serde_json::to_value(teacher)?);
        Ok(())
    }

    pub async fn update(&self, teacher: &Teacher) -> SyncResult<()> {
        self.store.update_teacher(teacher).await?;
        self.mirror
            .spawn_write_full(Self::entity_path(&teacher.id), serde_json::to_value(teacher)?);
        Ok(())
    }

    /// Partial advisory reassignment: only the advisory fields and the
    /// derived role travel to the remote.
    pub async fn update_advisory(
        &self,
        id: &str,
        grade: Option<&str>,
        section: Option<&str>,
        track: Option<&str>,
        start_time: Option<&str>,
    ) -> SyncResult<()> {
        self.store
            .update_teacher_advisory(id, grade, section, track, start_time)
            .await?;

        let role = if grade.is_some() {
            TeacherRole::Adviser
        } else {
            TeacherRole::Subject
        };

        let mut fields = Map::new();
        fields.insert("advisoryGrade".to_string(), json!(grade));
        fields.insert("advisorySection".to_string(), json!(section));
        fields.insert("advisoryTrack".to_string(), json!(track));
        fields.insert("advisoryStartTime".to_string(), json!(start_time));
        fields.insert("role".to_string(), json!(role.as_str()));
        self.mirror.spawn_write_partial(Self::entity_path(id), fields);
        Ok(())
    }

    pub async fn update_credentials(
        &self,
        id: &str,
        username: &str,
        password: &str,
    ) -> SyncResult<()> {
        self.store.update_teacher_credentials(id, username, password).await?;

        let mut fields = Map::new();
        fields.insert("username".to_string(), json!(username));
        fields.insert("password".to_string(), json!(password));
        fields.insert("hasChangedCredentials".to_string(), json!(true));
        self.mirror.spawn_write_partial(Self::entity_path(id), fields);
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> SyncResult<()> {
        self.store.delete_teacher(id).await?;
        self.mirror.spawn_delete(Self::entity_path(id));
        Ok(())
    }

    /// Local-only clear; the remote faculty list is left in place.
    pub async fn delete_all(&self) -> SyncResult<()> {
        self.store.delete_all_teachers().await?;
        Ok(())
    }

    pub async fn all(&self) -> SyncResult<Vec<Teacher>> {
        Ok(self.store.all_teachers().await?)
    }

    /// Live snapshot of the faculty list.
    pub fn watch(&self) -> watch::Receiver<Vec<Teacher>> {
        live::watch_teachers(Arc::clone(&self.store))
    }
}
