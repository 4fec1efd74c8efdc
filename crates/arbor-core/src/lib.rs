//! Arbor Core Library
//!
//! This crate provides the persistence layer for Arbor, an outliner whose
//! documents are graphs of rows (a row may be cloned under several parents).
//!
//! # Architecture
//!
//! - **Backend**: any async string key-value store (`get` / `set`)
//! - **DataStore**: write-through cache plus JSON codec over a backend
//! - **ClientStore / DocumentStore**: typed, row- and scope-oriented API
//!
//! Reads are served from the per-instance cache once a key has been seen.
//! Writes update the cache immediately and reach the backend in the
//! background.
//!
//! # Quick Start
//!
//! ```text
//! let backend = Arc::new(InMemoryBackend::new());
//! let mut doc = DocumentStore::new(backend, "notes", StoreOptions::default());
//!
//! let row = doc.get_new().await?;
//! doc.set_line(row, &line_from_str("hello")).await;
//! doc.set_children(ROOT_ROW, &[row]).await;
//! ```
//!
//! # Modules
//!
//! - `document_store`: rows, document settings, plugin data, ID allocation
//! - `client_store`: client-wide and per-document local settings
//! - `datastore`: the cache-and-codec layer both stores share
//! - `codec`: decoding of current and legacy stored shapes
//! - `keys`: the persisted key scheme
//! - `settings`: typed setting keys and their defaults
//! - `backend`: the backend trait and an in-memory implementation
//! - `config`: application configuration

pub mod backend;
pub mod client_store;
pub mod codec;
pub mod config;
pub mod datastore;
pub mod document_store;
pub mod keys;
pub mod settings;
pub mod types;

pub use backend::{Backend, BackendError, BackendResult, InMemoryBackend};
pub use client_store::ClientStore;
pub use config::Config;
pub use datastore::{DataStore, StoreOptions};
pub use document_store::DocumentStore;
pub use types::{
    line_from_str, line_to_string, BackendType, HotkeySettings, Line, Macro, MacroMap, Row,
    SerializedPath, ROOT_ROW,
};
