//! Document tree store
//!
//! A document is a graph of rows. Each row has a line of text, an ordered
//! list of children, a list of parents (more than one when the row has
//! been cloned elsewhere), a collapsed flag and, once removed from the
//! tree, the parent it was detached from. Each attribute is a separate key
//! so that rows can be loaded and saved piecemeal.
//!
//! Keeping `parents` and `children` consistent with each other is the
//! caller's job; nothing here checks or repairs it. Rows are never deleted,
//! only detached.
//!
//! ## Row IDs
//!
//! IDs come from a per-document counter. The first allocation of a store
//! instance reads the persisted counter; later allocations count up in
//! memory, and every allocation writes the new value back without waiting.
//! If that first read fails, nothing is allocated and the error is returned:
//! guessing a counter would hand out IDs of rows that already exist.
//! Two live instances over the same document can therefore hand out the
//! same ID; callers must keep one writer per document.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::backend::{Backend, BackendResult};
use crate::codec::{self, decode_line, decode_parents};
use crate::datastore::{DataStore, StoreOptions};
use crate::keys::DocKeys;
use crate::settings::DocSetting;
use crate::types::{Line, Row};

/// Attempts at reading the persisted ID counter while the backend reports
/// transient failures
const COUNTER_READ_ATTEMPTS: u32 = 3;

/// Pause between counter read attempts, multiplied by the attempt number
const COUNTER_RETRY_DELAY: Duration = Duration::from_millis(20);

/// Rows, settings and plugin data of one document
pub struct DocumentStore {
    store: DataStore,
    doc_name: String,
    keys: DocKeys,
    /// Highest ID this instance has handed out
    last_id: Option<Row>,
}

impl DocumentStore {
    /// Create a store over `backend` for the document `doc_name`
    pub fn new(backend: Arc<dyn Backend>, doc_name: &str, options: StoreOptions) -> Self {
        Self {
            store: DataStore::new(backend, options),
            doc_name: doc_name.to_string(),
            keys: DocKeys::new(doc_name),
            last_id: None,
        }
    }

    /// Get the document name
    pub fn doc_name(&self) -> &str {
        &self.doc_name
    }

    // ==================== Row Attributes ====================

    pub async fn get_line(&mut self, row: Row) -> Line {
        let key = self.keys.line(row);
        self.store.get_with(&key, Line::new(), decode_line).await
    }

    pub async fn set_line(&mut self, row: Row, line: &[String]) {
        let key = self.keys.line(row);
        self.store.set(&key, line).await
    }

    /// Check whether the row's stored line is in the old per-character
    /// format with strikethrough set
    ///
    /// Reads the backend directly, since the cache only holds decoded lines.
    /// A line this instance has already set is in the current format, so
    /// the answer is `false` even while that write is still queued. Kept for
    /// migrating old documents.
    pub async fn is_struck_through_old_format(&self, row: Row) -> bool {
        let key = self.keys.line(row);
        if self.store.was_written(&key) {
            return false;
        }
        self.store
            .get_raw(&key)
            .await
            .is_some_and(|stored| codec::is_struck_through_old_format(&stored))
    }

    pub async fn get_parents(&mut self, row: Row) -> Vec<Row> {
        let key = self.keys.parents(row);
        self.store.get_with(&key, Vec::new(), decode_parents).await
    }

    pub async fn set_parents(&mut self, row: Row, parents: &[Row]) {
        let key = self.keys.parents(row);
        self.store.set(&key, parents).await
    }

    pub async fn get_children(&mut self, row: Row) -> Vec<Row> {
        let key = self.keys.children(row);
        self.store.get(&key, Vec::new()).await
    }

    pub async fn set_children(&mut self, row: Row, children: &[Row]) {
        let key = self.keys.children(row);
        self.store.set(&key, children).await
    }

    /// Get the parent a detached row was removed from, if it is detached
    pub async fn get_detached_parent(&mut self, row: Row) -> Option<Row> {
        let key = self.keys.detached_parent(row);
        self.store.get(&key, None).await
    }

    /// Mark a row as detached from `parent`, or clear the mark with `None`
    pub async fn set_detached_parent(&mut self, row: Row, parent: Option<Row>) {
        let key = self.keys.detached_parent(row);
        self.store.set(&key, &parent).await
    }

    pub async fn get_collapsed(&mut self, row: Row) -> bool {
        let key = self.keys.collapsed(row);
        self.store.get(&key, false).await
    }

    pub async fn set_collapsed(&mut self, row: Row, collapsed: bool) {
        let key = self.keys.collapsed(row);
        self.store.set(&key, &collapsed).await
    }

    // ==================== Document Settings ====================

    /// Get a setting stored with the document
    pub async fn get_setting<S: DocSetting>(&mut self, _setting: S) -> S::Value {
        let key = self.keys.setting(S::NAME);
        self.store.get(&key, S::default_value()).await
    }

    /// Set a setting stored with the document
    pub async fn set_setting<S: DocSetting>(&mut self, _setting: S, value: &S::Value) {
        let key = self.keys.setting(S::NAME);
        self.store.set(&key, value).await
    }

    // ==================== Plugin Data ====================

    /// Get a plugin's value for `key`, or `default` if it never stored one
    ///
    /// The shape is the plugin's business; data that doesn't deserialize
    /// as `T` also yields `default`.
    pub async fn get_plugin_data<T>(&mut self, plugin: &str, key: &str, default: T) -> T
    where
        T: Serialize + DeserializeOwned,
    {
        let key = self.keys.plugin_data(plugin, key);
        self.store.get(&key, default).await
    }

    pub async fn set_plugin_data<T>(&mut self, plugin: &str, key: &str, data: &T)
    where
        T: Serialize + ?Sized,
    {
        let key = self.keys.plugin_data(plugin, key);
        self.store.set(&key, data).await
    }

    // ==================== Row Allocation ====================

    /// Allocate the next row ID
    ///
    /// Only the first call per instance reads the backend. That read is
    /// retried while the failure looks transient; if it still fails, the
    /// error is returned and nothing is allocated or written.
    pub async fn get_id(&mut self) -> BackendResult<Row> {
        let id = match self.last_id {
            Some(last) => last + 1,
            None => self.read_counter().await? + 1,
        };
        // Fire and forget
        self.store.set(&self.keys.last_id(), &id).await;
        self.last_id = Some(id);
        Ok(id)
    }

    /// Allocate a row with an empty line, no children and expanded
    ///
    /// Parents are left for the caller to attach. Fails only when
    /// [`DocumentStore::get_id`] does, in which case no row is touched.
    pub async fn get_new(&mut self) -> BackendResult<Row> {
        let row = self.get_id().await?;
        self.set_line(row, &[]).await;
        self.set_children(row, &[]).await;
        self.set_collapsed(row, false).await;
        Ok(row)
    }

    async fn read_counter(&mut self) -> BackendResult<Row> {
        let key = self.keys.last_id();
        let mut attempt = 1;
        loop {
            match self.store.try_get::<Row>(&key, 0).await {
                Ok(last) => return Ok(last),
                Err(e) if e.is_transient() && attempt < COUNTER_READ_ATTEMPTS => {
                    warn!(error = %e, attempt, "Reading ID counter failed, retrying");
                    tokio::time::sleep(COUNTER_RETRY_DELAY * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Reading ID counter failed, no ID allocated");
                    return Err(e);
                }
            }
        }
    }

    // ==================== Persistence ====================

    /// Wait for all issued writes to reach the backend
    pub async fn flush(&self) {
        self.store.flush().await
    }

    /// Number of writes the backend failed; nonzero means unsaved changes
    pub fn failed_writes(&self) -> u64 {
        self.store.failed_writes()
    }
}
