//! Remote mirror store adapter for the Rollcall attendance engine.
//!
//! The remote side is a key-addressed JSON document tree reached over the
//! network; it mirrors the local store and is never authoritative except
//! during an explicit pull. This crate provides the adapter seam and two
//! backends:
//!
//! - [`RestRemote`] — the production REST client
//! - [`MemoryRemote`] — an in-memory tree for tests and offline development

pub mod error;
pub mod memory;
pub mod rest;
pub mod store;

pub use error::{RemoteError, RemoteResult};
pub use memory::MemoryRemote;
pub use rest::{RemoteConfig, RestRemote};
pub use store::{is_valid_key, RemoteStore, ILLEGAL_KEY_CHARS};
