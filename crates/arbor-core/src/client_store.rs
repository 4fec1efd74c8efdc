//! Client settings store
//!
//! Holds what belongs to this client rather than to a document's content:
//! client-wide settings, settings for this client's copy of one document
//! (notably which backend that document lives in), the last viewed
//! position and recorded macros.
//!
//! ## Usage
//!
//! ```ignore
//! let mut client = ClientStore::new(local_backend, "notes", StoreOptions::default());
//!
//! client.set_client_setting(Theme, &"dark-theme".to_string()).await;
//! let source = client.get_doc_setting(DataSource).await;
//! ```

use std::sync::Arc;

use crate::backend::Backend;
use crate::datastore::{DataStore, StoreOptions};
use crate::keys::{self, DocKeys};
use crate::settings::{ClientSetting, LocalDocSetting};
use crate::types::{MacroMap, Row, SerializedPath};

/// Per-client settings for one document name
pub struct ClientStore {
    store: DataStore,
    doc_name: String,
    keys: DocKeys,
}

impl ClientStore {
    /// Create a client store over `backend` for the document `doc_name`
    ///
    /// An empty `doc_name` is the unnamed default document.
    pub fn new(backend: Arc<dyn Backend>, doc_name: &str, options: StoreOptions) -> Self {
        Self {
            store: DataStore::new(backend, options),
            doc_name: doc_name.to_string(),
            keys: DocKeys::new(doc_name),
        }
    }

    /// Get the document name
    pub fn doc_name(&self) -> &str {
        &self.doc_name
    }

    // ==================== Client Settings ====================

    /// Get a client-wide setting
    pub async fn get_client_setting<S: ClientSetting>(&mut self, _setting: S) -> S::Value {
        self.store
            .get(&keys::client_setting(S::NAME), S::default_value())
            .await
    }

    /// Set a client-wide setting
    pub async fn set_client_setting<S: ClientSetting>(&mut self, _setting: S, value: &S::Value) {
        self.store.set(&keys::client_setting(S::NAME), value).await
    }

    // ==================== Local Document Settings ====================

    /// Get a setting for this client's copy of the document
    pub async fn get_doc_setting<S: LocalDocSetting>(&mut self, _setting: S) -> S::Value {
        let key = keys::local_doc_setting(&self.doc_name, S::NAME);
        self.store.get(&key, S::default_value()).await
    }

    /// Set a setting for this client's copy of the document
    pub async fn set_doc_setting<S: LocalDocSetting>(&mut self, _setting: S, value: &S::Value) {
        let key = keys::local_doc_setting(&self.doc_name, S::NAME);
        self.store.set(&key, value).await
    }

    // ==================== View State ====================

    /// Get the last viewed root (for restoring the view on reload)
    pub async fn get_last_view_root(&mut self) -> SerializedPath {
        self.store
            .get(&self.keys.last_view_root(), SerializedPath::new())
            .await
    }

    /// Remember the viewed root as a path from the document root
    pub async fn set_last_view_root(&mut self, ancestry: &[Row]) {
        self.store.set(&self.keys.last_view_root(), ancestry).await
    }

    /// Get the mapping of macro register -> macro
    pub async fn get_macros(&mut self) -> MacroMap {
        self.store.get(&self.keys.macros(), MacroMap::new()).await
    }

    /// Replace the mapping of macro register -> macro
    pub async fn set_macros(&mut self, macros: &MacroMap) {
        self.store.set(&self.keys.macros(), macros).await
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::settings::{DataSource, FirebaseId, Hotkeys, ShowKeyBindings, SocketServerHost, Theme};
    use crate::types::BackendType;
    use serde_json::json;

    fn client(backend: &Arc<InMemoryBackend>, doc_name: &str) -> ClientStore {
        ClientStore::new(backend.clone(), doc_name, StoreOptions::default())
    }

    #[tokio::test]
    async fn test_client_setting_defaults() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut store = client(&backend, "doc1");

        assert_eq!(store.get_client_setting(Theme).await, "default-theme");
        assert!(store.get_client_setting(ShowKeyBindings).await);
        assert!(store.get_client_setting(Hotkeys).await.is_empty());
    }

    #[tokio::test]
    async fn test_client_setting_roundtrip_and_key() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut store = client(&backend, "doc1");

        store
            .set_client_setting(Theme, &"dark-theme".to_string())
            .await;
        store.set_client_setting(ShowKeyBindings, &false).await;

        assert_eq!(store.get_client_setting(Theme).await, "dark-theme");
        assert!(!store.get_client_setting(ShowKeyBindings).await);

        store.flush().await;
        assert_eq!(backend.raw("settings:theme"), Some("\"dark-theme\"".to_string()));
        assert_eq!(backend.raw("settings:showKeyBindings"), Some("false".to_string()));
    }

    #[tokio::test]
    async fn test_client_settings_are_shared_across_documents() {
        let backend = Arc::new(InMemoryBackend::new());

        let mut first = client(&backend, "doc1");
        first.set_client_setting(Theme, &"solarized".to_string()).await;
        first.flush().await;

        let mut second = client(&backend, "doc2");
        assert_eq!(second.get_client_setting(Theme).await, "solarized");
    }

    #[tokio::test]
    async fn test_hotkeys_roundtrip() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut store = client(&backend, "");

        let mut hotkeys = serde_json::Map::new();
        hotkeys.insert("NORMAL".to_string(), json!({"undo": ["u"]}));
        store.set_client_setting(Hotkeys, &hotkeys).await;

        assert_eq!(store.get_client_setting(Hotkeys).await, hotkeys);
    }

    #[tokio::test]
    async fn test_doc_setting_defaults() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut store = client(&backend, "doc1");

        assert_eq!(store.get_doc_setting(DataSource).await, BackendType::Local);
        assert_eq!(store.get_doc_setting(FirebaseId).await, None);
    }

    #[tokio::test]
    async fn test_doc_settings_are_per_document() {
        let backend = Arc::new(InMemoryBackend::new());

        let mut first = client(&backend, "doc1");
        first
            .set_doc_setting(DataSource, &BackendType::SocketServer)
            .await;
        first
            .set_doc_setting(SocketServerHost, &Some("ws://localhost:3001".to_string()))
            .await;
        first.flush().await;

        assert_eq!(
            backend.raw("settings:doc1:dataSource"),
            Some("\"socketserver\"".to_string())
        );

        let mut second = client(&backend, "doc2");
        assert_eq!(second.get_doc_setting(DataSource).await, BackendType::Local);
        assert_eq!(second.get_doc_setting(SocketServerHost).await, None);

        let mut reopened = client(&backend, "doc1");
        assert_eq!(
            reopened.get_doc_setting(SocketServerHost).await,
            Some("ws://localhost:3001".to_string())
        );
    }

    #[tokio::test]
    async fn test_unknown_backend_type_falls_back_to_default() {
        let backend = Arc::new(InMemoryBackend::with_data([(
            "settings:doc1:dataSource",
            "\"carrier-pigeon\"",
        )]));
        let mut store = client(&backend, "doc1");

        assert_eq!(store.get_doc_setting(DataSource).await, BackendType::Local);
    }

    #[tokio::test]
    async fn test_last_view_root() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut store = client(&backend, "doc1");

        assert!(store.get_last_view_root().await.is_empty());

        store.set_last_view_root(&[0, 4, 9]).await;
        assert_eq!(store.get_last_view_root().await, vec![0, 4, 9]);

        store.flush().await;
        assert_eq!(backend.raw("doc1save:lastviewroot2"), Some("[0,4,9]".to_string()));
    }

    #[tokio::test]
    async fn test_macros() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut store = client(&backend, "doc1");

        assert!(store.get_macros().await.is_empty());

        let mut macros = MacroMap::new();
        macros.insert("q".to_string(), vec!["d".to_string(), "d".to_string()]);
        store.set_macros(&macros).await;

        assert_eq!(store.get_macros().await, macros);
        store.flush().await;
        assert_eq!(
            backend.raw("doc1save:macros"),
            Some(r#"{"q":["d","d"]}"#.to_string())
        );
    }

    #[tokio::test]
    async fn test_legacy_raw_theme() {
        let backend = Arc::new(InMemoryBackend::with_data([("settings:theme", "dark-theme")]));
        let mut store = client(&backend, "doc1");

        assert_eq!(store.get_client_setting(Theme).await, "dark-theme");
    }
}
