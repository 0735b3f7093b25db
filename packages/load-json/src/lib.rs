//! JSON search-result loader: the `json_import` load-conversion endpoint.
//!
//! Reads search result files holding a JSON array of bibliographic entries
//! and turns each entry into a record. An explicit `id` is honored; entries
//! without one get a citation key derived from author and year.
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use litrev_core::package_system::error::PackageSystemError;
use litrev_core::package_system::{
    EndpointInstance, EndpointSelection, EndpointType, OperationContext, PackageDeclaration,
    PackageRegistrar, ReviewPackage, CORE_VERSION,
};
use litrev_core::Record;

/// One entry of a JSON search result file.
#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    entrytype: Option<String>,
    #[serde(flatten)]
    fields: BTreeMap<String, serde_json::Value>,
}

impl RawEntry {
    /// Citation key: explicit id, else first-author surname plus year.
    fn citation_key(&self) -> String {
        if let Some(id) = &self.id {
            return id.clone();
        }
        let surname = self
            .fields
            .get("author")
            .and_then(|v| v.as_str())
            .and_then(|a| a.split(" and ").next())
            .map(|first| {
                first
                    .split(',')
                    .next()
                    .unwrap_or(first)
                    .split_whitespace()
                    .last()
                    .unwrap_or("anonymous")
                    .to_string()
            })
            .unwrap_or_else(|| "anonymous".to_string());
        let year = self
            .fields
            .get("year")
            .map(field_to_string)
            .unwrap_or_default();
        let key: String = format!("{}{}", surname, year)
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        if key.is_empty() { "anonymous".to_string() } else { key }
    }

    fn into_record(self) -> Record {
        let key = self.citation_key();
        let entrytype = self.entrytype.clone().unwrap_or_else(|| "misc".to_string());
        let mut record = Record::new(&key, &entrytype);
        for (field, value) in &self.fields {
            if value.is_null() {
                continue;
            }
            record.set_field(field, &field_to_string(value));
        }
        record
    }
}

fn field_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

struct JsonLoader;

#[async_trait]
impl litrev_core::package_system::endpoint::LoadConversionEndpoint for JsonLoader {
    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }

    async fn load(
        &self,
        _ctx: &OperationContext,
        path: &Path,
    ) -> Result<Vec<Record>, PackageSystemError> {
        let raw = std::fs::read_to_string(path).map_err(|e| PackageSystemError::OperationError {
            package_id: PACKAGE_ID.to_string(),
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        let entries: Vec<RawEntry> =
            serde_json::from_str(&raw).map_err(|e| PackageSystemError::ManifestError {
                path: path.to_path_buf(),
                message: "expected a JSON array of entries".to_string(),
                source: Some(Box::new(e)),
            })?;
        log::debug!("{}: {} entries in {}", PACKAGE_ID, entries.len(), path.display());
        Ok(entries.into_iter().map(RawEntry::into_record).collect())
    }
}

const PACKAGE_ID: &str = "json_import";

/// The `json_import` package.
pub struct JsonImportPackage;

impl ReviewPackage for JsonImportPackage {
    fn id(&self) -> &str {
        PACKAGE_ID
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Load JSON search result files"
    }

    fn provided_endpoints(&self) -> Vec<EndpointType> {
        vec![EndpointType::LoadConversion]
    }

    fn create_endpoint(
        &self,
        endpoint_type: EndpointType,
        _selection: &EndpointSelection,
        _ctx: &OperationContext,
    ) -> Result<EndpointInstance, PackageSystemError> {
        match endpoint_type {
            EndpointType::LoadConversion => {
                Ok(EndpointInstance::LoadConversion(Box::new(JsonLoader)))
            }
            other => Err(PackageSystemError::UndeclaredEndpoint {
                package_id: PACKAGE_ID.to_string(),
                endpoint_type: other,
            }),
        }
    }
}

fn register(registrar: &mut PackageRegistrar) {
    registrar.register(Arc::new(JsonImportPackage));
}

#[cfg(feature = "dynamic-export")]
#[no_mangle]
pub static litrev_package_declaration: PackageDeclaration = PackageDeclaration {
    core_version: CORE_VERSION,
    register,
};
