// Error types for TodoStore

use thiserror::Error;

/// Failures of the durable key-value slot
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid slot key: {0}")]
    InvalidKey(String),
}

/// Failures while parsing an import payload
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected a JSON array of tasks, found {0}")]
    NotAnArray(&'static str),

    #[error("Task at index {index} is invalid: {reason}")]
    InvalidRecord { index: usize, reason: String },

    #[error("Unsupported schema version {found} (newest supported is {supported})")]
    UnsupportedVersion { found: u64, supported: u32 },

    #[error("Failed to read import file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by `TodoStore` operations
#[derive(Debug, Error)]
pub enum TodoError {
    #[error("Task text cannot be empty or whitespace-only")]
    EmptyText,

    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Task id prefix '{0}' matches more than one task")]
    Ambiguous(String),

    #[error("Import failed, existing tasks kept: {0}")]
    Import(#[from] ImportError),

    /// The in-memory change was applied but could not be written out
    #[error("Failed to save tasks: {0}")]
    Persistence(#[from] PersistenceError),
}

impl TodoError {
    /// Check if this is a save failure after an applied mutation
    pub fn is_persistence(&self) -> bool {
        matches!(self, TodoError::Persistence(_))
    }
}
