//! Error types for the resolution engine.
//!
//! Absence (unknown mocker, module or route) is never an error: lookups return
//! `Option`. These types cover genuine failures only.

use std::path::PathBuf;

/// Failure while walking the mocker base directory.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Mocker base path does not exist: {0}")]
    MissingBasePath(PathBuf),
    #[error("Mocker base path is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Failed to read directory {0}: {1}")]
    ReadDir(PathBuf, #[source] std::io::Error),
}

/// Failure while producing a mock module's result.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("Script error in module '{module}': {message}")]
    Script { module: String, message: String },
    #[error("Module '{module}' rejected: {message}")]
    Rejected { module: String, message: String },
    #[error("Module '{0}' returned without calling done.resolve or done.reject")]
    NeverCompleted(String),
    #[error("Handler for module '{module}' failed: {source}")]
    Handler {
        module: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Failure reading or writing the persisted snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Snapshot I/O error at {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Snapshot at {0} is not valid: {1}")]
    Format(PathBuf, #[source] serde_json::Error),
}

/// Failure loading or validating [`ParserOptions`](crate::config::ParserOptions).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors surfaced by the [`Parser`](crate::parser::Parser).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to start file watcher: {0}")]
    Watch(String),
    #[error("Parser has been disposed")]
    Disposed,
}
