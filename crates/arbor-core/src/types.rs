//! Data types for Arbor documents
//!
//! Defines the identifiers and value shapes that are persisted by the
//! stores. Shapes here are the canonical in-memory forms; legacy on-disk
//! shapes live in [`crate::codec`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one row in a document
///
/// Allocated monotonically per document starting at 1 and never reused.
pub type Row = u64;

/// The implicit root of every document; never allocated.
pub const ROOT_ROW: Row = 0;

/// Text content of a row, one character per entry
pub type Line = Vec<String>;

/// Ancestry from the document root down to a row
pub type SerializedPath = Vec<Row>;

/// A recorded macro: the sequence of keys it replays
pub type Macro = Vec<String>;

/// Mapping of macro register -> macro
pub type MacroMap = BTreeMap<String, Macro>;

/// Hotkey overrides, keyed by mode and then by action name
pub type HotkeySettings = serde_json::Map<String, serde_json::Value>;

/// Which backend a document is stored in
///
/// This is a local-document setting: it selects the backend, so it can
/// never live in the backend it selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Browser local storage (or another per-client store)
    #[default]
    Local,
    /// Third-party realtime database
    Firebase,
    /// Ephemeral, process-local storage
    InMemory,
    /// Remote socket server
    SocketServer,
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Firebase => write!(f, "firebase"),
            Self::InMemory => write!(f, "inmemory"),
            Self::SocketServer => write!(f, "socketserver"),
        }
    }
}

/// Build a line from text, one entry per character
pub fn line_from_str(text: &str) -> Line {
    text.chars().map(String::from).collect()
}

/// Join a line back into text
pub fn line_to_string(line: &[String]) -> String {
    line.concat()
}
