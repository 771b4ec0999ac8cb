//! In-memory remote backend.
//!
//! Holds the document tree as one JSON value behind a mutex. Used by tests
//! and offline development; the fail switch simulates a dead network, the
//! operation counters let tests assert how often the adapter was touched.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{RemoteError, RemoteResult};
use crate::store::RemoteStore;

pub struct MemoryRemote {
    root: Mutex<Value>,
    reads: AtomicU64,
    writes: AtomicU64,
    failing: AtomicBool,
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn node_ref<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cur = root;
    for seg in segments(path) {
        cur = cur.as_object()?.get(seg)?;
    }
    Some(cur)
}

/// Navigate to `path`, materializing intermediate objects on the way.
fn node_mut<'a>(root: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut cur = root;
    for seg in segments(path) {
        if !matches!(cur, Value::Object(_)) {
            *cur = Value::Object(Map::new());
        }
        let Value::Object(map) = cur else { return None };
        cur = map.entry(seg.to_string()).or_insert(Value::Null);
    }
    Some(cur)
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self {
            root: Mutex::new(Value::Object(Map::new())),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent operation fail as unavailable.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// A copy of the whole tree, for assertions.
    pub async fn snapshot(&self) -> Value {
        self.root.lock().await.clone()
    }

    /// Seed a path directly, bypassing counters (test fixtures).
    pub async fn seed(&self, path: &str, value: Value) {
        let mut root = self.root.lock().await;
        if let Some(node) = node_mut(&mut root, path) {
            *node = value;
        }
    }

    fn gate(&self) -> RemoteResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable);
        }
        Ok(())
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn read(&self, path: &str) -> RemoteResult<Option<Value>> {
        self.gate()?;
        self.reads.fetch_add(1, Ordering::SeqCst);

        let root = self.root.lock().await;
        Ok(node_ref(&root, path).filter(|v| !v.is_null()).cloned())
    }

    async fn query_equal(
        &self,
        path: &str,
        field: &str,
        value: &Value,
    ) -> RemoteResult<Vec<Value>> {
        self.gate()?;
        self.reads.fetch_add(1, Ordering::SeqCst);

        let root = self.root.lock().await;
        let mut matches = Vec::new();
        if let Some(Value::Object(children)) = node_ref(&root, path) {
            // Map iteration is in ascending key order.
            for child in children.values() {
                if child.get(field) == Some(value) {
                    matches.push(child.clone());
                }
            }
        }
        Ok(matches)
    }

    async fn write_full(&self, path: &str, value: &Value) -> RemoteResult<()> {
        self.gate()?;
        self.writes.fetch_add(1, Ordering::SeqCst);

        let mut root = self.root.lock().await;
        if let Some(node) = node_mut(&mut root, path) {
            *node = value.clone();
        }
        Ok(())
    }

    async fn write_partial(&self, path: &str, fields: &Map<String, Value>) -> RemoteResult<()> {
        self.gate()?;
        self.writes.fetch_add(1, Ordering::SeqCst);

        let mut root = self.root.lock().await;
        for (field, value) in fields {
            if let Some(node) = node_mut(&mut root, &format!("{}/{}", path, field)) {
                *node = value.clone();
            }
        }
        Ok(())
    }

    async fn write_batch(&self, path: &str, children: &Map<String, Value>) -> RemoteResult<()> {
        self.gate()?;
        self.writes.fetch_add(1, Ordering::SeqCst);

        let mut root = self.root.lock().await;
        for (child_path, value) in children {
            if let Some(node) = node_mut(&mut root, &format!("{}/{}", path, child_path)) {
                *node = value.clone();
            }
        }
        Ok(())
    }

    async fn append(&self, path: &str, value: &Value) -> RemoteResult<String> {
        self.gate()?;
        self.writes.fetch_add(1, Ordering::SeqCst);

        let key = format!("-{}", Uuid::new_v4().simple());
        let mut root = self.root.lock().await;
        if let Some(node) = node_mut(&mut root, &format!("{}/{}", path, key)) {
            *node = value.clone();
        }
        Ok(key)
    }

    async fn delete(&self, path: &str) -> RemoteResult<()> {
        self.gate()?;
        self.writes.fetch_add(1, Ordering::SeqCst);

        let mut segs: Vec<&str> = segments(path).collect();
        let last = match segs.pop() {
            Some(last) => last,
            None => return Ok(()),
        };
        let parent_path = segs.join("/");

        let mut root = self.root.lock().await;
        if let Some(Value::Object(map)) = node_mut(&mut root, &parent_path) {
            map.remove(last);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn read_write_round_trip() {
        let remote = MemoryRemote::new();

        assert_eq!(remote.read("students/S1").await.unwrap(), None);

        remote
            .write_full("students/S1", &json!({"firstName": "Ana"}))
            .await
            .unwrap();
        let value = remote.read("students/S1").await.unwrap().unwrap();
        assert_eq!(value["firstName"], "Ana");

        remote.delete("students/S1").await.unwrap();
        assert_eq!(remote.read("students/S1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let remote = MemoryRemote::new();
        remote
            .write_full("students/S1", &json!({"firstName": "Ana", "isArchived": false}))
            .await
            .unwrap();

        let mut fields = Map::new();
        fields.insert("isArchived".to_string(), json!(true));
        remote.write_partial("students/S1", &fields).await.unwrap();

        let value = remote.read("students/S1").await.unwrap().unwrap();
        assert_eq!(value["firstName"], "Ana");
        assert_eq!(value["isArchived"], true);
    }

    #[tokio::test]
    async fn batch_write_replaces_children() {
        let remote = MemoryRemote::new();

        let mut children = Map::new();
        children.insert("/S1".to_string(), json!({"firstName": "Ana"}));
        children.insert("/S2".to_string(), json!({"firstName": "Ben"}));
        remote.write_batch("students", &children).await.unwrap();

        let tree = remote.read("students").await.unwrap().unwrap();
        assert_eq!(tree.as_object().unwrap().len(), 2);
        assert_eq!(tree["S2"]["firstName"], "Ben");
    }

    #[tokio::test]
    async fn append_generates_distinct_keys() {
        let remote = MemoryRemote::new();

        let k1 = remote.append("attendance", &json!({"n": 1})).await.unwrap();
        let k2 = remote.append("attendance", &json!({"n": 2})).await.unwrap();
        assert_ne!(k1, k2);

        let tree = remote.read("attendance").await.unwrap().unwrap();
        assert_eq!(tree.as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn query_equal_matches_field() {
        let remote = MemoryRemote::new();
        remote
            .write_full(
                "students",
                &json!({
                    "S1": {"username": "ana"},
                    "S2": {"username": "ben"},
                    "S3": {"username": "ana"},
                }),
            )
            .await
            .unwrap();

        let matches = remote
            .query_equal("students", "username", &json!("ana"))
            .await
            .unwrap();
        assert_eq!(matches.len(), 2);

        let none = remote
            .query_equal("students", "username", &json!("cara"))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn fail_switch_rejects_everything() {
        let remote = MemoryRemote::new();
        remote.set_failing(true);

        assert!(matches!(
            remote.read("students").await,
            Err(RemoteError::Unavailable)
        ));
        assert!(matches!(
            remote.write_full("students/S1", &json!({})).await,
            Err(RemoteError::Unavailable)
        ));

        remote.set_failing(false);
        assert!(remote.read("students").await.is_ok());
    }

    #[tokio::test]
    async fn counters_track_operations() {
        let remote = MemoryRemote::new();

        remote.write_full("a/b", &json!(1)).await.unwrap();
        remote.read("a/b").await.unwrap();
        remote.read("a/b").await.unwrap();

        assert_eq!(remote.write_count(), 1);
        assert_eq!(remote.read_count(), 2);
    }
}
