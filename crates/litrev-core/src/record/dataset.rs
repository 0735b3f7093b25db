use std::collections::BTreeMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::kernel::constants;
use crate::kernel::error::Result;
use crate::record::error::RecordError;
use crate::record::{Record, RecordState};
use crate::storage::error::StorageSystemError;
use crate::storage::manager::{DefaultStorageManager, StorageManager};

/// The record store of a project: all records keyed by citation key.
///
/// Saving from an operation writes the canonical store plus a numbered
/// snapshot and an operation-log line under the history directory, so
/// every operation's result remains recoverable.
#[derive(Debug, Default)]
pub struct Dataset {
    records: BTreeMap<String, Record>,
}

impl Dataset {
    /// Create an empty dataset
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }

    /// Load the record store of a project.
    pub fn load(storage: &DefaultStorageManager) -> Result<Self> {
        let raw = storage.provider().read_to_string(storage.records_file())?;
        let records: BTreeMap<String, Record> =
            serde_json::from_str(&raw).map_err(|e| StorageSystemError::DeserializationError {
                format: "json".to_string(),
                source: Box::new(e),
            })?;
        for (key, record) in &records {
            if key != &record.id {
                return Err(RecordError::MalformedStore(format!(
                    "store key '{}' does not match record id '{}'",
                    key, record.id
                ))
                .into());
            }
        }
        Ok(Self { records })
    }

    /// Persist the record store on behalf of `operation`, writing a
    /// snapshot and appending to the operation log.
    pub fn save(&self, storage: &DefaultStorageManager, operation: &str) -> Result<()> {
        let raw = serde_json::to_string_pretty(&self.records).map_err(|e| {
            StorageSystemError::SerializationError {
                format: "json".to_string(),
                source: Box::new(e),
            }
        })?;
        let provider = storage.provider();
        provider.write_string(storage.records_file(), &raw)?;

        // Snapshot number = count of existing snapshots + 1
        provider.create_dir_all(storage.history_dir())?;
        let snapshot_count = provider
            .read_dir(storage.history_dir())?
            .iter()
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .count();
        let snapshot_name = format!("{:04}-{}.json", snapshot_count + 1, operation);
        provider.write_string(&storage.history_dir().join(&snapshot_name), &raw)?;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let log_path = storage.history_dir().join(constants::HISTORY_LOG_FILE);
        let mut log = if provider.is_file(&log_path) {
            provider.read_to_string(&log_path)?
        } else {
            String::new()
        };
        log.push_str(&format!(
            "{:04} {} {} records={}\n",
            snapshot_count + 1,
            timestamp,
            operation,
            self.records.len()
        ));
        provider.write_string(&log_path, &log)?;

        log::debug!(
            "Saved {} records ({} -> {})",
            self.records.len(),
            operation,
            snapshot_name
        );
        Ok(())
    }

    /// Insert a new record; the id must be unused.
    pub fn insert(&mut self, record: Record) -> Result<()> {
        if self.records.contains_key(&record.id) {
            return Err(RecordError::DuplicateId(record.id).into());
        }
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    /// Remove a record by id.
    pub fn remove(&mut self, id: &str) -> Option<Record> {
        self.records.remove(id)
    }

    /// Get a record by id.
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.get(id)
    }

    /// Get a mutable record by id.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Record> {
        self.records.get_mut(id)
    }

    /// Iterate over all records in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Iterate mutably over all records in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.records.values_mut()
    }

    /// Ids of all records in the given state.
    pub fn ids_in_state(&self, state: RecordState) -> Vec<String> {
        self.records
            .values()
            .filter(|r| r.status == state)
            .map(|r| r.id.clone())
            .collect()
    }

    /// Count of records in the given state.
    pub fn count_in_state(&self, state: RecordState) -> usize {
        self.records.values().filter(|r| r.status == state).count()
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// De-collide a proposed citation key by appending a letter suffix.
    pub fn unique_id(&self, base: &str) -> String {
        if !self.records.contains_key(base) {
            return base.to_string();
        }
        for suffix in 'a'..='z' {
            let candidate = format!("{}{}", base, suffix);
            if !self.records.contains_key(&candidate) {
                return candidate;
            }
        }
        // 26 collisions on one key is pathological; fall back to a counter
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}", base, n);
            if !self.records.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Counts per state, for status reporting.
    pub fn state_counts(&self) -> Vec<(RecordState, usize)> {
        RecordState::all()
            .iter()
            .map(|state| (*state, self.count_in_state(*state)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    /// Absolute path of the PDF attached to a record, if any.
    pub fn pdf_path(&self, storage: &DefaultStorageManager, id: &str) -> Option<std::path::PathBuf> {
        self.get(id)
            .and_then(|r| r.field("file"))
            .map(|file| storage.project_root().join(Path::new(file)))
    }
}
