use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::package_system::endpoint::EndpointType;
use crate::package_system::error::PackageSystemError;

/// Curated index of known package endpoints, embedded as a default and
/// overlayable from disk. Maps endpoint type to identifier to descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageIndex {
    pub entries: BTreeMap<EndpointType, BTreeMap<String, IndexEntry>>,
}

/// One curated index entry describing a known package endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Crate or library providing the endpoint
    pub module: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_schema: Option<serde_json::Value>,
}

impl PackageIndex {
    /// Parse an index document and validate every identifier.
    pub fn parse(data: &str) -> Result<Self, PackageSystemError> {
        let index: PackageIndex =
            serde_json::from_str(data).map_err(|e| PackageSystemError::ManifestError {
                path: PathBuf::from("<package index>"),
                message: format!("Failed to parse package index JSON: {}", e),
                source: Some(Box::new(e)),
            })?;
        for identifiers in index.entries.values() {
            for identifier in identifiers.keys() {
                validate_identifier(identifier)?;
            }
        }
        Ok(index)
    }

    pub fn get(&self, endpoint_type: EndpointType, identifier: &str) -> Option<&IndexEntry> {
        self.entries.get(&endpoint_type)?.get(identifier)
    }
}

/// Identifiers must be lowercase and contain no whitespace.
pub fn validate_identifier(identifier: &str) -> Result<(), PackageSystemError> {
    if identifier.is_empty() {
        return Err(PackageSystemError::InvalidIdentifier {
            identifier: identifier.to_string(),
            reason: "identifier is empty".to_string(),
        });
    }
    if identifier.chars().any(|c| c.is_whitespace()) {
        return Err(PackageSystemError::InvalidIdentifier {
            identifier: identifier.to_string(),
            reason: "identifier contains whitespace".to_string(),
        });
    }
    if identifier.chars().any(|c| c.is_uppercase()) {
        return Err(PackageSystemError::InvalidIdentifier {
            identifier: identifier.to_string(),
            reason: "identifier must be lowercase".to_string(),
        });
    }
    Ok(())
}

/// On-disk manifest of a loadable package, `<dir>/<id>/package.json`.
#[derive(Debug, Clone)]
pub struct PackageManifest {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    /// Library file name, relative to the package directory
    pub entry_point: String,
    pub endpoints: Vec<EndpointType>,
    /// Directory the manifest was loaded from
    pub base_dir: PathBuf,
}

#[derive(Deserialize, Debug)]
struct RawPackageManifest {
    id: String,
    #[serde(default)]
    name: Option<String>,
    version: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    entry_point: Option<String>,
    #[serde(default)]
    endpoints: Vec<String>,
}

impl PackageManifest {
    /// Parse a manifest file's content, resolving defaults against the
    /// directory it came from.
    pub fn parse(content: &str, path: &Path) -> Result<Self, PackageSystemError> {
        let raw: RawPackageManifest =
            serde_json::from_str(content).map_err(|e| PackageSystemError::ManifestError {
                path: path.to_path_buf(),
                message: format!("Failed to parse manifest JSON: {}", e),
                source: Some(Box::new(e)),
            })?;

        validate_identifier(&raw.id)?;

        let mut endpoints = Vec::new();
        for name in &raw.endpoints {
            let endpoint_type =
                name.parse::<EndpointType>()
                    .map_err(|_| PackageSystemError::ManifestError {
                        path: path.to_path_buf(),
                        message: format!("Unknown endpoint type '{}'", name),
                        source: None,
                    })?;
            endpoints.push(endpoint_type);
        }

        let base_dir = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        Ok(PackageManifest {
            entry_point: raw
                .entry_point
                .unwrap_or_else(|| format!("lib{}.so", raw.id.replace('-', "_"))),
            name: raw.name.unwrap_or_else(|| raw.id.clone()),
            id: raw.id,
            version: raw.version,
            description: raw.description,
            endpoints,
            base_dir,
        })
    }

    /// Absolute path of the library the manifest points at.
    pub fn library_path(&self) -> PathBuf {
        self.base_dir.join(&self.entry_point)
    }
}
