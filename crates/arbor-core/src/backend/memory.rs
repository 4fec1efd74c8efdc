//! In-memory backend for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::error::{BackendError, BackendResult};
use super::Backend;

/// An in-memory key-value backend.
///
/// This backend stores all values in memory and is suitable for:
/// - Unit tests
/// - Documents that don't need to outlive the process
///
/// Reads and writes can be made to fail on demand to exercise the stores'
/// fallback paths.
///
/// # Example
///
/// ```ignore
/// let backend = Arc::new(InMemoryBackend::with_data([("docsave:lastID", "41")]));
/// let mut doc = DocumentStore::new(backend.clone(), "doc", StoreOptions::default());
/// assert_eq!(doc.get_id().await?, 42);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicU64,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend preloaded with raw stored values.
    ///
    /// Useful for testing decoding of legacy data.
    pub fn with_data<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let data = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            data: RwLock::new(data),
            ..Self::default()
        }
    }

    /// Returns the raw stored value for a key, bypassing failure injection.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.data.read().get(key).cloned()
    }

    /// Returns all stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Make subsequent reads fail (or succeed again).
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Relaxed);
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn get(&self, key: &str) -> BackendResult<Option<String>> {
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(BackendError::Unavailable {
                backend: "inmemory".to_string(),
                details: "reads disabled".to_string(),
            });
        }
        Ok(self.data.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> BackendResult<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(BackendError::Rejected {
                key: key.to_string(),
                details: "writes disabled".to_string(),
            });
        }
        self.data.write().insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
