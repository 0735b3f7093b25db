use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::storage::error::StorageSystemError;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

/// In-memory representation of free-form configuration data, used for
/// per-package configuration files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigData {
    /// Raw configuration values
    #[serde(flatten)]
    values: HashMap<String, serde_json::Value>,
}

impl ConfigData {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Get a configuration value
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Get a configuration value with default
    pub fn get_or<T: for<'de> Deserialize<'de>>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Set a configuration value
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), StorageSystemError> {
        let json_value =
            serde_json::to_value(value).map_err(|e| StorageSystemError::SerializationError {
                format: "json".to_string(),
                source: Box::new(e),
            })?;
        self.values.insert(key.to_string(), json_value);
        Ok(())
    }

    /// Remove a configuration value
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.values.remove(key)
    }

    /// Check if key exists
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Get all keys
    pub fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    /// Merge with another config, overriding existing values
    pub fn merge(&mut self, other: &ConfigData) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Serialize to string based on format
    pub fn serialize(&self, format: ConfigFormat) -> Result<String, StorageSystemError> {
        match format {
            ConfigFormat::Json => serde_json::to_string_pretty(&self).map_err(|e| {
                StorageSystemError::SerializationError {
                    format: "json".to_string(),
                    source: Box::new(e),
                }
            }),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::to_string(&self).map_err(|e| {
                StorageSystemError::SerializationError {
                    format: "yaml".to_string(),
                    source: Box::new(e),
                }
            }),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::to_string_pretty(&self).map_err(|e| {
                StorageSystemError::SerializationError {
                    format: "toml".to_string(),
                    source: Box::new(e),
                }
            }),
        }
    }

    /// Deserialize from string based on format
    pub fn deserialize(data: &str, format: ConfigFormat) -> Result<Self, StorageSystemError> {
        match format {
            ConfigFormat::Json => serde_json::from_str(data).map_err(|e| {
                StorageSystemError::DeserializationError {
                    format: "json".to_string(),
                    source: Box::new(e),
                }
            }),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data).map_err(|e| {
                StorageSystemError::DeserializationError {
                    format: "yaml".to_string(),
                    source: Box::new(e),
                }
            }),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data).map_err(|e| {
                StorageSystemError::DeserializationError {
                    format: "toml".to_string(),
                    source: Box::new(e),
                }
            }),
        }
    }
}
