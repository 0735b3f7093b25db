use std::fmt::Debug;
use std::path::{Path, PathBuf};
use crate::storage::error::StorageSystemError;

/// Trait for storage providers that can read and write project data
pub trait StorageProvider: Send + Sync + Debug {
    /// Get the name of this provider
    fn name(&self) -> &str;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if a path is a file
    fn is_file(&self, path: &Path) -> bool;

    /// Check if a path is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Create a directory and all its parent directories
    fn create_dir_all(&self, path: &Path) -> Result<(), StorageSystemError>;

    /// Read a file to a string
    fn read_to_string(&self, path: &Path) -> Result<String, StorageSystemError>;

    /// Write a string to a file (atomically, via a temp file in the same dir)
    fn write_string(&self, path: &Path, contents: &str) -> Result<(), StorageSystemError>;

    /// Copy a file from one path to another
    fn copy(&self, from: &Path, to: &Path) -> Result<(), StorageSystemError>;

    /// Remove a file
    fn remove_file(&self, path: &Path) -> Result<(), StorageSystemError>;

    /// List all entries in a directory
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, StorageSystemError>;
}
