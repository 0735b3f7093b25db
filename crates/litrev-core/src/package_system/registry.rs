use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::package_system::endpoint::{EndpointType, ReviewPackage};
use crate::package_system::error::PackageSystemError;

/// Where an endpoint entry comes from, in loading-precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    /// Registered statically by the host binary
    BuiltIn,
    /// Dynamic library under the module packages directory
    Module(PathBuf),
    /// Project-local package under the custom packages directory
    Custom(PathBuf),
}

impl PackageSource {
    pub fn kind(&self) -> &'static str {
        match self {
            PackageSource::BuiltIn => "built_in",
            PackageSource::Module(_) => "module",
            PackageSource::Custom(_) => "custom",
        }
    }
}

/// One endpoint entry in the registry.
pub struct PackageEntry {
    pub identifier: String,
    /// Crate or library providing the endpoint
    pub module: String,
    pub description: String,
    pub source: PackageSource,
    pub installed: bool,
    /// Provider instance, present once the package is registered or loaded
    pub provider: Option<Arc<dyn ReviewPackage>>,
}

impl fmt::Debug for PackageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageEntry")
            .field("identifier", &self.identifier)
            .field("module", &self.module)
            .field("source", &self.source)
            .field("installed", &self.installed)
            .field("has_provider", &self.provider.is_some())
            .finish()
    }
}

/// Listing row returned by discovery.
#[derive(Debug, Clone, Serialize)]
pub struct PackageSummary {
    pub endpoint_type: EndpointType,
    pub identifier: String,
    pub module: String,
    pub description: String,
    pub source: String,
    pub installed: bool,
}

/// Endpoint entries keyed by type and identifier. Mutated only behind the
/// package manager's lock.
#[derive(Debug, Default)]
pub struct PackageRegistry {
    entries: BTreeMap<EndpointType, BTreeMap<String, PackageEntry>>,
}

impl PackageRegistry {
    pub fn new() -> Self {
        Self { entries: BTreeMap::new() }
    }

    /// Insert an entry. Duplicate identifiers per endpoint type are an
    /// error when both carry a provider; an index-only entry may be
    /// upgraded in place via [`PackageRegistry::attach_provider`].
    pub fn insert(
        &mut self,
        endpoint_type: EndpointType,
        entry: PackageEntry,
    ) -> Result<(), PackageSystemError> {
        let per_type = self.entries.entry(endpoint_type).or_default();
        if let Some(existing) = per_type.get(&entry.identifier) {
            if existing.provider.is_some() && entry.provider.is_some() {
                return Err(PackageSystemError::RegistrationError {
                    package_id: entry.identifier,
                    message: format!(
                        "endpoint already registered for {} by module '{}'",
                        endpoint_type, existing.module
                    ),
                });
            }
        }
        per_type.insert(entry.identifier.clone(), entry);
        Ok(())
    }

    /// Attach a provider to an existing entry, marking it installed.
    pub fn attach_provider(
        &mut self,
        endpoint_type: EndpointType,
        identifier: &str,
        source: PackageSource,
        provider: Arc<dyn ReviewPackage>,
    ) -> Result<(), PackageSystemError> {
        let per_type = self.entries.entry(endpoint_type).or_default();
        match per_type.get_mut(identifier) {
            Some(entry) => {
                if entry.provider.is_some() {
                    return Err(PackageSystemError::RegistrationError {
                        package_id: identifier.to_string(),
                        message: format!(
                            "endpoint already registered for {} by module '{}'",
                            endpoint_type, entry.module
                        ),
                    });
                }
                entry.source = source;
                entry.installed = true;
                entry.provider = Some(provider);
                Ok(())
            }
            None => self.insert(
                endpoint_type,
                PackageEntry {
                    identifier: identifier.to_string(),
                    module: provider.id().to_string(),
                    description: provider.description().to_string(),
                    source,
                    installed: true,
                    provider: Some(provider),
                },
            ),
        }
    }

    pub fn get(&self, endpoint_type: EndpointType, identifier: &str) -> Option<&PackageEntry> {
        self.entries.get(&endpoint_type)?.get(identifier)
    }

    pub fn get_mut(
        &mut self,
        endpoint_type: EndpointType,
        identifier: &str,
    ) -> Option<&mut PackageEntry> {
        self.entries.get_mut(&endpoint_type)?.get_mut(identifier)
    }

    pub fn set_installed(&mut self, endpoint_type: EndpointType, identifier: &str, installed: bool) {
        if let Some(entry) = self.get_mut(endpoint_type, identifier) {
            entry.installed = installed;
        }
    }

    pub fn iter_type(
        &self,
        endpoint_type: EndpointType,
    ) -> impl Iterator<Item = &PackageEntry> {
        self.entries
            .get(&endpoint_type)
            .into_iter()
            .flat_map(|per_type| per_type.values())
    }

    /// All entries, grouped by endpoint type and sorted by identifier.
    pub fn summaries(&self, installed_only: bool) -> Vec<PackageSummary> {
        let mut out = Vec::new();
        for (endpoint_type, per_type) in &self.entries {
            for entry in per_type.values() {
                if installed_only && !entry.installed {
                    continue;
                }
                out.push(PackageSummary {
                    endpoint_type: *endpoint_type,
                    identifier: entry.identifier.clone(),
                    module: entry.module.clone(),
                    description: entry.description.clone(),
                    source: entry.source.kind().to_string(),
                    installed: entry.installed,
                });
            }
        }
        out
    }

    pub fn entry_count(&self) -> usize {
        self.entries.values().map(|per_type| per_type.len()).sum()
    }
}
