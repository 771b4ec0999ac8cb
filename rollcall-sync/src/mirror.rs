//! Best-effort remote mirroring.
//!
//! The local write has already succeeded when these run; the mirror write is
//! dispatched as an independent task whose failure is observable only in the
//! logs. The periodic sync pass is the backstop that re-converges whatever a
//! mirror write missed.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use rollcall_remote::RemoteStore;

#[derive(Clone)]
pub(crate) struct RemoteMirror {
    remote: Arc<dyn RemoteStore>,
}

impl RemoteMirror {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self { remote }
    }

    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.remote
    }

    pub fn spawn_write_full(&self, path: String, value: Value) -> JoinHandle<()> {
        let remote = Arc::clone(&self.remote);
        tokio::spawn(async move {
            if let Err(err) = remote.write_full(&path, &value).await {
                tracing::warn!(path = %path, error = %err, "remote mirror write failed");
            }
        })
    }

    pub fn spawn_write_partial(&self, path: String, fields: Map<String, Value>) -> JoinHandle<()> {
        let remote = Arc::clone(&self.remote);
        tokio::spawn(async move {
            if let Err(err) = remote.write_partial(&path, &fields).await {
                tracing::warn!(path = %path, error = %err, "remote mirror partial update failed");
            }
        })
    }

    pub fn spawn_write_batch(&self, path: String, children: Map<String, Value>) -> JoinHandle<()> {
        let remote = Arc::clone(&self.remote);
        tokio::spawn(async move {
            if let Err(err) = remote.write_batch(&path, &children).await {
                tracing::warn!(path = %path, error = %err, "remote mirror batch write failed");
            }
        })
    }

    pub fn spawn_delete(&self, path: String) -> JoinHandle<()> {
        let remote = Arc::clone(&self.remote);
        tokio::spawn(async move {
            if let Err(err) = remote.delete(&path).await {
                tracing::warn!(path = %path, error = %err, "remote mirror delete failed");
            }
        })
    }
}
