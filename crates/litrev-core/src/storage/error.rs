//! # litrev Core Storage System Errors
//!
//! Error types for the storage subsystem: file I/O, project layout
//! resolution, settings parsing and provider interactions.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageSystemError {
    #[error("I/O error during operation '{operation}' on path '{}': {source}", path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "<unknown>".into()))]
    Io {
        path: Option<PathBuf>,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found at path: {0}")]
    FileNotFound(PathBuf),

    #[error("Directory not found at path: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Not a litrev project (no '{0}' found in this directory or any parent)")]
    ProjectNotFound(String),

    #[error("Serialization to '{format}' failed: {source}")]
    SerializationError {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Deserialization from '{format}' failed: {source}")]
    DeserializationError {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Unsupported configuration format: {0}")]
    UnsupportedConfigFormat(String),

    #[error("Storage operation '{operation}' failed for path '{}': {message}", path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "<unknown>".into()))]
    OperationFailed {
        operation: String,
        path: Option<PathBuf>,
        message: String,
    },

    #[error("Resource already exists and overwrite is not permitted: {0}")]
    ResourceExists(PathBuf),
}

impl StorageSystemError {
    pub fn io(
        source: std::io::Error,
        operation: impl Into<String>,
        path: Option<PathBuf>,
    ) -> Self {
        StorageSystemError::Io {
            source,
            operation: operation.into(),
            path,
        }
    }
}
