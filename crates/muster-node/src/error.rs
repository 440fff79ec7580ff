//! Error types for the node.

use muster_engine::EngineError;
use muster_roster::RosterError;
use muster_store::StoreError;
use thiserror::Error;

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running the node.
#[derive(Debug, Error)]
pub enum Error {
    /// Roster could not be loaded
    #[error("Roster error: {0}")]
    Roster(#[from] RosterError),

    /// Store could not be opened or written
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Engine rejected an operation
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The command worker has stopped
    #[error("Command worker is not running")]
    WorkerGone,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
