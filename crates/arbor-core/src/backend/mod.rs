//! Backend adapters
//!
//! A backend is the storage engine of record for one or more documents. The
//! stores need exactly two primitives from it, both asynchronous:
//!
//! - `get(key)` returning the stored string or nothing
//! - `set(key, value)` acknowledging a write
//!
//! There are no transactions and no ordering guarantees across clients.
//! Concrete engines (browser storage, socket server, realtime database)
//! live outside this crate; [`InMemoryBackend`] is provided for tests and
//! ephemeral documents.

mod error;
mod memory;

use async_trait::async_trait;

pub use error::{BackendError, BackendResult};
pub use memory::InMemoryBackend;

/// An asynchronous string key-value store
///
/// Implementations must be shareable across tasks: stores hand writes to a
/// background task that holds its own handle to the backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Read the raw value stored under `key`, or `None` if absent
    async fn get(&self, key: &str) -> BackendResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> BackendResult<()>;
}
