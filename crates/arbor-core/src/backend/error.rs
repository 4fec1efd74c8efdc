//! Backend error handling

use std::io;
use thiserror::Error;

/// Errors a backend may report for a single get or set
///
/// The stores mostly keep these from their callers: failed reads fall back
/// to defaults and failed writes are logged and counted. Row ID allocation
/// is the exception, since a defaulted counter would reuse existing IDs.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend cannot be reached (connection lost, not yet opened)
    #[error("Backend '{backend}' is unavailable: {details}")]
    Unavailable { backend: String, details: String },

    /// The backend refused the operation (quota, permissions, auth)
    #[error("Backend rejected operation on key '{key}': {details}")]
    Rejected { key: String, details: String },

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl BackendError {
    /// Check if retrying the same operation later might succeed
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Unavailable { .. } => true,
            BackendError::Rejected { .. } => false,
            BackendError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::Interrupted
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::ConnectionReset
            ),
        }
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;
