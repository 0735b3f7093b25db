use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::storage::error::StorageSystemError;
use crate::storage::provider::StorageProvider;

/// Local filesystem storage provider
#[derive(Clone)]
pub struct LocalStorageProvider {
    base_path: PathBuf,
}

impl LocalStorageProvider {
    /// Create a new local storage provider with the given base path
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Resolve a relative path against the base path
    fn resolve_path<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.base_path.join(path)
    }
}

impl fmt::Debug for LocalStorageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStorageProvider")
            .field("base_path", &self.base_path)
            .finish()
    }
}

impl StorageProvider for LocalStorageProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve_path(path).exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        self.resolve_path(path).is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.resolve_path(path).is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), StorageSystemError> {
        let full_path = self.resolve_path(path);
        fs::create_dir_all(&full_path)
            .map_err(|e| StorageSystemError::io(e, "create_dir_all", Some(full_path)))
    }

    fn read_to_string(&self, path: &Path) -> Result<String, StorageSystemError> {
        let full_path = self.resolve_path(path);
        fs::read_to_string(&full_path)
            .map_err(|e| StorageSystemError::io(e, "read_to_string", Some(full_path)))
    }

    fn write_string(&self, path: &Path, contents: &str) -> Result<(), StorageSystemError> {
        let full_path = self.resolve_path(path);

        let parent = full_path.parent().ok_or_else(|| StorageSystemError::OperationFailed {
            operation: "write_string".to_string(),
            path: Some(full_path.clone()),
            message: "Cannot write to path without parent directory".to_string(),
        })?;
        if !parent.is_dir() {
            fs::create_dir_all(parent)
                .map_err(|e| StorageSystemError::io(e, "create_dir_all", Some(parent.to_path_buf())))?;
        }

        // Write to a temp file next to the target and persist atomically
        let temp_file = NamedTempFile::new_in(parent)
            .map_err(|e| StorageSystemError::io(e, "create_temp_file", Some(parent.to_path_buf())))?;
        temp_file
            .as_file()
            .write_all(contents.as_bytes())
            .map_err(|e| StorageSystemError::io(e, "write_to_temp_file", Some(temp_file.path().to_path_buf())))?;
        temp_file
            .persist(&full_path)
            .map_err(|e| StorageSystemError::io(e.error, "persist_temp_file", Some(full_path.clone())))?;

        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<(), StorageSystemError> {
        let from_full = self.resolve_path(from);
        let to_full = self.resolve_path(to);
        if let Some(parent) = to_full.parent() {
            if !parent.is_dir() {
                fs::create_dir_all(parent)
                    .map_err(|e| StorageSystemError::io(e, "create_dir_all", Some(parent.to_path_buf())))?;
            }
        }
        fs::copy(&from_full, &to_full)
            .map(|_| ())
            .map_err(|e| StorageSystemError::io(e, "copy", Some(from_full)))
    }

    fn remove_file(&self, path: &Path) -> Result<(), StorageSystemError> {
        let full_path = self.resolve_path(path);
        fs::remove_file(&full_path)
            .map_err(|e| StorageSystemError::io(e, "remove_file", Some(full_path)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, StorageSystemError> {
        let full_path = self.resolve_path(path);
        let entries = fs::read_dir(&full_path)
            .map_err(|e| StorageSystemError::io(e, "read_dir", Some(full_path.clone())))?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| StorageSystemError::io(e, "read_dir", Some(full_path.clone())))?;
            paths.push(entry.path());
        }
        paths.sort();
        Ok(paths)
    }
}
