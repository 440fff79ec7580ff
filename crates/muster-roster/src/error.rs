//! Error types for roster loading.

use thiserror::Error;

/// Result type for roster operations.
pub type Result<T> = std::result::Result<T, RosterError>;

/// Errors that can occur while loading the roster.
#[derive(Debug, Error)]
pub enum RosterError {
    /// The roster file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The roster file is not valid roster JSON.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
