//! The remote store seam.
//!
//! A key-addressed document tree: paths are `/`-separated keys, values are
//! JSON. Every operation is asynchronous and individually fallible; callers
//! decide whether a failure is swallowed (repository mirror writes) or aborts
//! the work (sync pass).

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::RemoteResult;

/// Characters a single path key may not contain.
pub const ILLEGAL_KEY_CHARS: &[char] = &['.', '#', '$', '[', ']', '/'];

/// Whether `key` is usable as one path segment of the remote tree.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(ILLEGAL_KEY_CHARS)
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read the value at `path`; `None` when nothing is stored there.
    async fn read(&self, path: &str) -> RemoteResult<Option<Value>>;

    /// Children of `path` whose `field` equals `value`, in ascending key
    /// order.
    async fn query_equal(
        &self,
        path: &str,
        field: &str,
        value: &Value,
    ) -> RemoteResult<Vec<Value>>;

    /// Overwrite the full value at `path`.
    async fn write_full(&self, path: &str, value: &Value) -> RemoteResult<()>;

    /// Update only the named fields of the object at `path`.
    async fn write_partial(&self, path: &str, fields: &Map<String, Value>) -> RemoteResult<()>;

    /// One round trip writing several children of `path`; map keys are
    /// relative paths (e.g. `/S1`), values full replacements.
    async fn write_batch(&self, path: &str, children: &Map<String, Value>) -> RemoteResult<()>;

    /// Append `value` under a generated key; returns the key.
    async fn append(&self, path: &str, value: &Value) -> RemoteResult<String>;

    /// Delete the value at `path`.
    async fn delete(&self, path: &str) -> RemoteResult<()>;
}
