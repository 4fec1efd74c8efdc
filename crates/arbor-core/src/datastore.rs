//! Cache-and-codec layer
//!
//! `DataStore` sits between the typed stores and a [`Backend`]. It owns a
//! per-instance cache of decoded values and converts values to and from the
//! JSON strings the backend holds.
//!
//! ## Reads
//!
//! A cached key is answered immediately, without touching the backend.
//! Otherwise the backend is queried; an absent (or JSON `null`) value
//! yields the caller's default, anything else is parsed and passed through
//! the caller's decoder. The result is cached either way.
//!
//! ## Writes
//!
//! `set` updates the cache and queues the write for the backend, then
//! returns. Callers never wait for the backend: a `get` right after a `set`
//! on the same instance sees the new value, but the backend may still hold
//! the old one, and a crash before the queue drains loses the write.
//! Backend write failures are logged and counted, never returned.
//!
//! Queued writes are applied by one background task per store, in the
//! order they were issued. [`DataStore::flush`] waits for the queue to
//! drain.
//!
//! The cache is never evicted; it holds at most one document's keys.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::backend::{Backend, BackendError, BackendResult};
use crate::codec::{encode_stored, parse_stored};

/// Behaviour switches for a store instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Serve repeated reads from memory and make writes visible to reads
    /// immediately. Without it every read goes to the backend.
    pub use_cache: bool,
    /// Sleep this long before every get and set (latency simulation)
    pub simulate_delay: Option<Duration>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            simulate_delay: None,
        }
    }
}

/// Commands for the background writer
#[derive(Debug)]
enum WriteCommand {
    Put { key: String, value: String },
    Flush(oneshot::Sender<()>),
}

/// Write-through cache over a backend
///
/// Must be created inside a Tokio runtime: construction spawns the
/// background writer task.
pub struct DataStore {
    backend: Arc<dyn Backend>,
    cache: HashMap<String, Value>,
    /// Keys this instance has issued writes for
    written: HashSet<String>,
    options: StoreOptions,
    writes: mpsc::UnboundedSender<WriteCommand>,
    failed_writes: Arc<AtomicU64>,
}

impl DataStore {
    /// Create a store over `backend` and start its writer task
    pub fn new(backend: Arc<dyn Backend>, options: StoreOptions) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let failed_writes = Arc::new(AtomicU64::new(0));

        tokio::spawn(write_loop(backend.clone(), rx, failed_writes.clone()));

        Self {
            backend,
            cache: HashMap::new(),
            written: HashSet::new(),
            options,
            writes: tx,
            failed_writes,
        }
    }

    /// Read a value, decoding it with serde
    pub async fn get<T>(&mut self, key: &str, default: T) -> T
    where
        T: Serialize + DeserializeOwned,
    {
        self.get_with(key, default, |value| serde_json::from_value(value).ok())
            .await
    }

    /// Read a value, decoding stored data with `decode`
    ///
    /// `decode` maps whatever shape is on disk (current or legacy) to `T`;
    /// returning `None` means the data is unusable and `default` is used.
    /// Cached values are already decoded and skip `decode`.
    pub async fn get_with<T, D>(&mut self, key: &str, default: T, decode: D) -> T
    where
        T: Serialize + DeserializeOwned,
        D: FnOnce(Value) -> Option<T>,
    {
        match self.lookup(key, default, decode).await {
            Ok(value) => value,
            // Not cached, so the next read retries the backend
            Err((default, e)) => {
                warn!(key, error = %e, "Backend read failed, using default");
                default
            }
        }
    }

    /// Read a value like [`DataStore::get`], but report a failed backend
    /// read instead of answering with `default`
    ///
    /// Absent and undecodable values still yield `default`.
    pub async fn try_get<T>(&mut self, key: &str, default: T) -> BackendResult<T>
    where
        T: Serialize + DeserializeOwned,
    {
        self.lookup(key, default, |value| serde_json::from_value(value).ok())
            .await
            .map_err(|(_, e)| e)
    }

    /// Shared read path; a backend failure hands `default` back untouched
    async fn lookup<T, D>(
        &mut self,
        key: &str,
        default: T,
        decode: D,
    ) -> Result<T, (T, BackendError)>
    where
        T: Serialize + DeserializeOwned,
        D: FnOnce(Value) -> Option<T>,
    {
        self.delay().await;

        if self.options.use_cache {
            if let Some(cached) = self.cache.get(key) {
                return Ok(match serde_json::from_value(cached.clone()) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!(key, error = %e, "Cached value has unexpected type, using default");
                        default
                    }
                });
            }
        }

        let stored = match self.read_backend(key).await {
            Ok(stored) => stored,
            Err(e) => return Err((default, e)),
        };
        let decoded = match stored {
            None => {
                debug!(key, "Tried getting, defaulted");
                default
            }
            Some(stored) => match decode(stored) {
                Some(value) => {
                    debug!(key, "Got from storage");
                    value
                }
                None => {
                    warn!(key, "Stored value has an unknown shape, using default");
                    default
                }
            },
        };

        if self.options.use_cache {
            self.cache_value(key, &decoded);
        }
        Ok(decoded)
    }

    /// Read the parsed stored value, bypassing the cache entirely
    ///
    /// Used to inspect on-disk shapes that decoding would discard.
    pub async fn get_raw(&self, key: &str) -> Option<Value> {
        self.delay().await;
        match self.read_backend(key).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(key, error = %e, "Backend read failed");
                None
            }
        }
    }

    /// Write a value
    pub async fn set<T>(&mut self, key: &str, value: &T)
    where
        T: Serialize + ?Sized,
    {
        self.set_with(key, value, |v| v).await
    }

    /// Write a value, transforming it with `encode` before it is persisted
    ///
    /// The cache keeps the value as given; only the backend sees the
    /// encoded form.
    pub async fn set_with<T, E>(&mut self, key: &str, value: &T, encode: E)
    where
        T: Serialize + ?Sized,
        E: FnOnce(Value) -> Value,
    {
        self.delay().await;

        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(key, error = %e, "Value cannot be serialized, not stored");
                return;
            }
        };
        let encoded = encode(value.clone());

        if self.options.use_cache {
            self.cache.insert(key.to_string(), value);
        }

        self.written.insert(key.to_string());

        let raw = encode_stored(&encoded);
        debug!(key, value = %raw, "Setting to storage");

        // Fire and forget: the writer task reports its own failures
        let command = WriteCommand::Put {
            key: key.to_string(),
            value: raw,
        };
        if self.writes.send(command).is_err() {
            warn!(key, "Writer task has stopped, change will not be saved");
            self.failed_writes.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Wait until every write issued so far has reached the backend
    /// (successfully or not)
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.writes.send(WriteCommand::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Number of writes the backend has failed since this store was created
    ///
    /// Nonzero means some changes may not have been saved.
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    fn cached(&self, key: &str) -> Option<&Value> {
        self.cache.get(key)
    }

    /// Whether this instance has issued a write for `key`
    pub(crate) fn was_written(&self, key: &str) -> bool {
        self.written.contains(key)
    }

    #[cfg(test)]
    fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Fetch and parse a key; a stored `null` counts as absent
    async fn read_backend(&self, key: &str) -> BackendResult<Option<Value>> {
        Ok(match self.backend.get(key).await? {
            Some(raw) => match parse_stored(raw) {
                Value::Null => None,
                value => Some(value),
            },
            None => None,
        })
    }

    fn cache_value<T: Serialize>(&mut self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(v) => {
                self.cache.insert(key.to_string(), v);
            }
            Err(e) => warn!(key, error = %e, "Value cannot be cached"),
        }
    }

    async fn delay(&self) {
        if let Some(delay) = self.options.simulate_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Apply queued writes in order until the store is dropped
async fn write_loop(
    backend: Arc<dyn Backend>,
    mut commands: mpsc::UnboundedReceiver<WriteCommand>,
    failed_writes: Arc<AtomicU64>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            WriteCommand::Put { key, value } => {
                if let Err(e) = backend.set(&key, &value).await {
                    failed_writes.fetch_add(1, Ordering::Relaxed);
                    warn!(key = %key, error = %e, "Backend write failed, change may not be saved");
                }
            }
            WriteCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Store writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use serde_json::json;

    fn store_over(backend: &Arc<InMemoryBackend>) -> DataStore {
        DataStore::new(backend.clone(), StoreOptions::default())
    }

    #[tokio::test]
    async fn test_default_when_absent() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut store = store_over(&backend);

        let value: Vec<u64> = store.get("missing", vec![9]).await;
        assert_eq!(value, vec![9]);
        assert_eq!(store.cached("missing"), Some(&json!([9])));
    }

    #[tokio::test]
    async fn test_stored_null_is_absent() {
        let backend = Arc::new(InMemoryBackend::with_data([("k", "null")]));
        let mut store = store_over(&backend);

        assert_eq!(store.get("k", 3u64).await, 3);
    }

    #[tokio::test]
    async fn test_read_your_write_without_backend() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.set_fail_writes(true);
        let mut store = store_over(&backend);

        store.set("k", "value").await;
        assert_eq!(store.get("k", String::new()).await, "value");

        store.flush().await;
        assert_eq!(backend.raw("k"), None);
        assert_eq!(store.failed_writes(), 1);
        // Failure does not disturb the cached value
        assert_eq!(store.get("k", String::new()).await, "value");
    }

    #[tokio::test]
    async fn test_writes_reach_backend_as_json() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut store = store_over(&backend);

        store.set("line", &["a", "b"]).await;
        store.set("flag", &true).await;
        store.flush().await;

        assert_eq!(backend.raw("line"), Some(r#"["a","b"]"#.to_string()));
        assert_eq!(backend.raw("flag"), Some("true".to_string()));
        assert_eq!(store.failed_writes(), 0);
    }

    #[tokio::test]
    async fn test_writes_apply_in_issue_order() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut store = store_over(&backend);

        for i in 0..50u64 {
            store.set("counter", &i).await;
        }
        store.flush().await;

        assert_eq!(backend.raw("counter"), Some("49".to_string()));
        assert_eq!(backend.write_count(), 50);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_backend() {
        let backend = Arc::new(InMemoryBackend::with_data([("k", "7")]));
        let mut store = store_over(&backend);

        assert_eq!(store.get("k", 0u64).await, 7);

        backend.set_fail_reads(true);
        assert_eq!(store.get("k", 0u64).await, 7);
    }

    #[tokio::test]
    async fn test_raw_scalar_passes_through() {
        let backend = Arc::new(InMemoryBackend::with_data([("settings:theme", "solarized")]));
        let mut store = store_over(&backend);

        let theme: String = store.get("settings:theme", "default-theme".to_string()).await;
        assert_eq!(theme, "solarized");
    }

    #[tokio::test]
    async fn test_undecodable_value_uses_default() {
        let backend = Arc::new(InMemoryBackend::with_data([("k", r#"{"not":"a number"}"#)]));
        let mut store = store_over(&backend);

        assert_eq!(store.get("k", 4u64).await, 4);
        assert_eq!(store.cached("k"), Some(&json!(4)));
    }

    #[tokio::test]
    async fn test_custom_decode() {
        let backend = Arc::new(InMemoryBackend::with_data([("k", "5")]));
        let mut store = store_over(&backend);

        let value: Vec<u64> = store
            .get_with("k", vec![], |v| v.as_u64().map(|n| vec![n, n]))
            .await;
        assert_eq!(value, vec![5, 5]);
    }

    #[tokio::test]
    async fn test_failed_read_is_not_cached() {
        let backend = Arc::new(InMemoryBackend::with_data([("k", "7")]));
        backend.set_fail_reads(true);
        let mut store = store_over(&backend);

        assert_eq!(store.get("k", 0u64).await, 0);
        assert!(store.cached("k").is_none());

        backend.set_fail_reads(false);
        assert_eq!(store.get("k", 0u64).await, 7);
    }

    #[tokio::test]
    async fn test_try_get_reports_failed_read() {
        let backend = Arc::new(InMemoryBackend::with_data([("k", "7")]));
        backend.set_fail_reads(true);
        let mut store = store_over(&backend);

        assert!(store.try_get("k", 0u64).await.is_err());
        assert!(store.try_get("missing", 0u64).await.is_err());
        assert!(store.cached("k").is_none());

        backend.set_fail_reads(false);
        assert_eq!(store.try_get("k", 0u64).await.unwrap(), 7);
        assert_eq!(store.try_get("missing", 3u64).await.unwrap(), 3);

        // Answered from the cache once seen
        backend.set_fail_reads(true);
        assert_eq!(store.try_get("k", 0u64).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_set_with_encode() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut store = store_over(&backend);

        store
            .set_with("k", &3u64, |v| json!({ "wrapped": v }))
            .await;
        store.flush().await;

        assert_eq!(store.get("k", 0u64).await, 3);
        assert_eq!(backend.raw("k"), Some(r#"{"wrapped":3}"#.to_string()));
    }

    #[tokio::test]
    async fn test_idempotent_set() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut store = store_over(&backend);

        store.set("k", "same").await;
        store.flush().await;
        let after_one = backend.raw("k");

        store.set("k", "same").await;
        store.flush().await;

        assert_eq!(backend.raw("k"), after_one);
        assert_eq!(store.get("k", String::new()).await, "same");
        assert_eq!(store.cache_len(), 1);
    }

    #[tokio::test]
    async fn test_cache_disabled_reads_backend() {
        let backend = Arc::new(InMemoryBackend::new());
        let options = StoreOptions {
            use_cache: false,
            simulate_delay: None,
        };
        let mut store = DataStore::new(backend.clone(), options);

        store.set("k", &1u64).await;
        store.flush().await;
        assert_eq!(store.get("k", 0u64).await, 1);
        assert_eq!(store.cache_len(), 0);

        backend.set_fail_reads(true);
        assert_eq!(store.get("k", 0u64).await, 0);
    }

    #[tokio::test]
    async fn test_simulated_delay_keeps_semantics() {
        let backend = Arc::new(InMemoryBackend::new());
        let options = StoreOptions {
            use_cache: true,
            simulate_delay: Some(Duration::from_millis(1)),
        };
        let mut store = DataStore::new(backend.clone(), options);

        store.set("k", "v").await;
        assert_eq!(store.get("k", String::new()).await, "v");
    }

    #[tokio::test]
    async fn test_get_raw_bypasses_cache() {
        let backend = Arc::new(InMemoryBackend::with_data([("k", r#"[{"char":"a"}]"#)]));
        let store = store_over(&backend);

        assert_eq!(store.get_raw("k").await, Some(json!([{"char": "a"}])));
        assert!(store.cached("k").is_none());
        assert_eq!(store.get_raw("missing").await, None);
    }
}
