//! Persisted key scheme
//!
//! Every key written to a backend is built here. The layout predates this
//! crate and existing data depends on it byte for byte:
//!
//! | Family                  | Key                                        |
//! |-------------------------|--------------------------------------------|
//! | client setting          | `settings:<name>`                          |
//! | local document setting  | `settings:<doc>:<name>`                    |
//! | last view root          | `<doc>save:lastviewroot2`                  |
//! | macros                  | `<doc>save:macros`                         |
//! | row attribute           | `<doc>save:<row>:<attr>`                   |
//! | document setting        | `<doc>save:settings:<name>`                |
//! | plugin data             | `<doc>save:plugin:<plugin>:data:<key>`     |
//! | row ID counter          | `<doc>save:lastID`                         |

use crate::types::Row;

/// Row attribute suffixes
mod attr {
    pub const LINE: &str = "line";
    pub const PARENTS: &str = "parent";
    pub const CHILDREN: &str = "children";
    pub const DETACHED_PARENT: &str = "detached_parent";
    pub const COLLAPSED: &str = "collapsed";
}

const SETTINGS: &str = "settings";
const LAST_VIEW_ROOT: &str = "lastviewroot2";
const MACROS: &str = "macros";
const LAST_ID: &str = "lastID";

/// Key of a client-global setting (no document prefix)
pub fn client_setting(name: &str) -> String {
    format!("{}:{}", SETTINGS, name)
}

/// Key of a setting local to this client and one document
///
/// Deliberately not under the document prefix; older clients wrote it here.
pub fn local_doc_setting(doc_name: &str, name: &str) -> String {
    format!("{}:{}:{}", SETTINGS, doc_name, name)
}

/// Builder for keys under one document's prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocKeys {
    prefix: String,
}

impl DocKeys {
    pub fn new(doc_name: &str) -> Self {
        Self {
            prefix: format!("{}save", doc_name),
        }
    }

    /// The `<doc>save` prefix shared by all keys of the document
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn last_view_root(&self) -> String {
        format!("{}:{}", self.prefix, LAST_VIEW_ROOT)
    }

    pub fn macros(&self) -> String {
        format!("{}:{}", self.prefix, MACROS)
    }

    pub fn last_id(&self) -> String {
        format!("{}:{}", self.prefix, LAST_ID)
    }

    pub fn line(&self, row: Row) -> String {
        self.row_attr(row, attr::LINE)
    }

    pub fn parents(&self, row: Row) -> String {
        self.row_attr(row, attr::PARENTS)
    }

    pub fn children(&self, row: Row) -> String {
        self.row_attr(row, attr::CHILDREN)
    }

    pub fn detached_parent(&self, row: Row) -> String {
        self.row_attr(row, attr::DETACHED_PARENT)
    }

    pub fn collapsed(&self, row: Row) -> String {
        self.row_attr(row, attr::COLLAPSED)
    }

    pub fn setting(&self, name: &str) -> String {
        format!("{}:{}:{}", self.prefix, SETTINGS, name)
    }

    pub fn plugin_data(&self, plugin: &str, key: &str) -> String {
        format!("{}:plugin:{}:data:{}", self.prefix, plugin, key)
    }

    fn row_attr(&self, row: Row, attr: &str) -> String {
        format!("{}:{}:{}", self.prefix, row, attr)
    }
}
