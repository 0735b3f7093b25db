use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::Mutex;

use crate::event::manager::{DefaultEventManager, EventManager};
use crate::event::types::ReviewEvent;
use crate::kernel::component::KernelComponent;
use crate::kernel::error::Result as KernelResult;
use crate::package_system::endpoint::{
    EndpointInstance, EndpointSelection, EndpointType, OperationContext, ReviewPackage,
};
use crate::package_system::error::PackageSystemError;
use crate::package_system::loader::PackageLoader;
use crate::package_system::manifest::{PackageIndex, PackageManifest};
use crate::package_system::registry::{
    PackageEntry, PackageRegistry, PackageSource, PackageSummary,
};
use crate::storage::config::{ConfigData, ConfigFormat};

/// Curated default index of known package endpoints.
const BUILTIN_INDEX: &str = include_str!("builtin_index.json");

/// An endpoint instance paired with the selection that produced it.
#[derive(Debug)]
pub struct LoadedEndpoint {
    pub selection: EndpointSelection,
    pub instance: EndpointInstance,
}

/// Package manager interface
#[async_trait]
pub trait PackageManager: KernelComponent {
    /// List known endpoints, optionally restricted to one type and to
    /// installed entries.
    async fn discover(
        &self,
        endpoint_type: Option<EndpointType>,
        installed_only: bool,
    ) -> Vec<PackageSummary>;

    /// Settings schema of one endpoint.
    async fn endpoint_details(
        &self,
        endpoint_type: EndpointType,
        identifier: &str,
    ) -> Result<serde_json::Value, PackageSystemError>;

    /// Resolve the selected endpoints for one operation, instantiating
    /// each through its provider and verifying the capability contract.
    async fn load_packages(
        &self,
        endpoint_type: EndpointType,
        selections: &[EndpointSelection],
        ctx: &OperationContext,
        ignore_not_available: bool,
    ) -> Result<Vec<LoadedEndpoint>, PackageSystemError>;
}

/// Default implementation of [`PackageManager`].
///
/// Resolution follows the precedence ladder: statically registered
/// built-ins, then dynamic libraries under the module packages directory,
/// then project-local custom packages.
#[derive(Debug)]
pub struct DefaultPackageManager {
    name: &'static str,
    module_dir: PathBuf,
    custom_dir: PathBuf,
    config_dir: Option<PathBuf>,
    registry: Arc<Mutex<PackageRegistry>>,
    loader: Mutex<PackageLoader>,
    events: Option<Arc<DefaultEventManager>>,
}

impl DefaultPackageManager {
    pub fn new(module_dir: PathBuf, custom_dir: PathBuf) -> Self {
        Self {
            name: "DefaultPackageManager",
            module_dir,
            custom_dir,
            config_dir: None,
            registry: Arc::new(Mutex::new(PackageRegistry::new())),
            loader: Mutex::new(PackageLoader::new()),
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<DefaultEventManager>) -> Self {
        self.events = Some(events);
        self
    }

    /// Directory searched for `<identifier>.{json,yaml,toml}` configuration
    /// files overlaid under the selection parameters.
    pub fn with_config_dir(mut self, config_dir: PathBuf) -> Self {
        self.config_dir = Some(config_dir);
        self
    }

    /// Statically register a built-in package for every endpoint type it
    /// declares. Used by the host binary before the kernel starts.
    pub async fn register_builtin(
        &self,
        package: Arc<dyn ReviewPackage>,
    ) -> Result<(), PackageSystemError> {
        let mut registry = self.registry.lock().await;
        for endpoint_type in package.provided_endpoints() {
            registry.attach_provider(
                endpoint_type,
                package.id(),
                PackageSource::BuiltIn,
                package.clone(),
            )?;
        }
        Ok(())
    }

    /// Parse the embedded index into the registry. Entries already backed
    /// by a registered built-in keep their provider.
    async fn load_index(&self) -> Result<(), PackageSystemError> {
        let index = PackageIndex::parse(BUILTIN_INDEX)?;
        let mut registry = self.registry.lock().await;
        for (endpoint_type, identifiers) in &index.entries {
            for (identifier, descriptor) in identifiers {
                if registry.get(*endpoint_type, identifier).is_some() {
                    continue;
                }
                registry.insert(
                    *endpoint_type,
                    PackageEntry {
                        identifier: identifier.clone(),
                        module: descriptor.module.clone(),
                        description: descriptor.description.clone(),
                        source: PackageSource::Module(self.module_dir.join(&descriptor.module)),
                        installed: false,
                        provider: None,
                    },
                )?;
            }
        }
        Ok(())
    }

    fn source_for(&self, manifest: &PackageManifest) -> PackageSource {
        if manifest.base_dir.starts_with(&self.custom_dir) {
            PackageSource::Custom(manifest.base_dir.clone())
        } else {
            PackageSource::Module(manifest.base_dir.clone())
        }
    }

    /// Mark every registry entry installed or not: built-ins with a
    /// provider are installed, module and custom entries when their
    /// manifest parses and the library resolves. Custom manifests absent
    /// from the index are added as project-local entries.
    async fn flag_installed(&self) -> Result<(), PackageSystemError> {
        let mut loader = self.loader.lock().await;
        loader.scan_for_manifests().await?;

        let mut registry = self.registry.lock().await;
        let summaries = registry.summaries(false);
        for summary in &summaries {
            if registry
                .get(summary.endpoint_type, &summary.identifier)
                .and_then(|entry| entry.provider.as_ref())
                .is_some()
            {
                continue;
            }
            let installed = loader
                .get_manifest(&summary.module)
                .map(|manifest| {
                    manifest.endpoints.contains(&summary.endpoint_type)
                        && loader.library_resolves(manifest)
                })
                .unwrap_or(false);
            registry.set_installed(summary.endpoint_type, &summary.identifier, installed);
        }

        // Custom packages outside the curated index
        let custom_manifests: Vec<PackageManifest> = loader
            .all_manifests()
            .filter(|manifest| manifest.base_dir.starts_with(&self.custom_dir))
            .cloned()
            .collect();
        for manifest in custom_manifests {
            let installed = loader.library_resolves(&manifest);
            for endpoint_type in &manifest.endpoints {
                if registry.get(*endpoint_type, &manifest.id).is_some() {
                    continue;
                }
                registry.insert(
                    *endpoint_type,
                    PackageEntry {
                        identifier: manifest.id.clone(),
                        module: manifest.id.clone(),
                        description: manifest.description.clone(),
                        source: PackageSource::Custom(manifest.base_dir.clone()),
                        installed,
                        provider: None,
                    },
                )?;
            }
        }
        Ok(())
    }

    /// Resolve a provider through the precedence ladder, loading and
    /// caching a dynamic package on first use.
    async fn resolve_provider(
        &self,
        endpoint_type: EndpointType,
        identifier: &str,
    ) -> Result<Arc<dyn ReviewPackage>, PackageSystemError> {
        let module = {
            let registry = self.registry.lock().await;
            match registry.get(endpoint_type, identifier) {
                Some(entry) => {
                    if let Some(provider) = &entry.provider {
                        return Ok(provider.clone());
                    }
                    if !entry.installed {
                        return Err(PackageSystemError::NotInstalled {
                            endpoint_type,
                            identifier: identifier.to_string(),
                        });
                    }
                    Some(entry.module.clone())
                }
                None => None,
            }
        };

        let mut loader = self.loader.lock().await;
        let manifest = match module {
            Some(module) => loader.get_manifest(&module).cloned(),
            None => {
                // Unlisted identifier: module manifests first, custom last
                let mut candidates: Vec<PackageManifest> = loader
                    .all_manifests()
                    .filter(|manifest| manifest.endpoints.contains(&endpoint_type))
                    .cloned()
                    .collect();
                candidates.sort_by_key(|manifest| {
                    manifest.base_dir.starts_with(&self.custom_dir)
                });
                candidates
                    .into_iter()
                    .find(|manifest| manifest.id == identifier)
            }
        };
        let Some(manifest) = manifest else {
            return Err(PackageSystemError::MissingDependency {
                endpoint_type,
                identifier: identifier.to_string(),
            });
        };

        let source = self.source_for(&manifest);
        let packages = loader.load_package(&manifest)?;
        drop(loader);

        let mut registry = self.registry.lock().await;
        let mut resolved = None;
        for package in packages {
            for provided in package.provided_endpoints() {
                if let Err(e) = registry.attach_provider(
                    provided,
                    package.id(),
                    source.clone(),
                    package.clone(),
                ) {
                    debug!("Skipping duplicate registration: {}", e);
                }
            }
            if package.id() == identifier {
                resolved = Some(package);
            }
        }

        resolved
            .filter(|package| package.provided_endpoints().contains(&endpoint_type))
            .ok_or_else(|| PackageSystemError::MissingDependency {
                endpoint_type,
                identifier: identifier.to_string(),
            })
    }

    /// Overlay the project-local configuration file for an endpoint under
    /// its selection parameters. Parameters from the settings file win.
    fn apply_package_config(
        &self,
        selection: &EndpointSelection,
    ) -> Result<EndpointSelection, PackageSystemError> {
        let Some(config_dir) = &self.config_dir else {
            return Ok(selection.clone());
        };
        let mut merged = selection.clone();
        for extension in ["json", "yaml", "yml", "toml"] {
            let path = config_dir.join(format!("{}.{}", selection.endpoint, extension));
            if !path.is_file() {
                continue;
            }
            let Some(format) = ConfigFormat::from_path(&path) else {
                continue;
            };
            let raw = std::fs::read_to_string(&path).map_err(|e| {
                PackageSystemError::OperationError {
                    package_id: selection.endpoint.clone(),
                    message: format!("cannot read {}: {}", path.display(), e),
                }
            })?;
            let config = ConfigData::deserialize(&raw, format).map_err(|e| {
                PackageSystemError::OperationError {
                    package_id: selection.endpoint.clone(),
                    message: format!("malformed configuration {}: {}", path.display(), e),
                }
            })?;
            for key in config.keys() {
                if merged.params.contains_key(&key) {
                    continue;
                }
                if let Some(value) = config.get::<serde_json::Value>(&key) {
                    merged.params.insert(key, value);
                }
            }
            debug!(
                "Applied configuration {} for endpoint '{}'",
                path.display(),
                selection.endpoint
            );
            break;
        }
        Ok(merged)
    }

    async fn instantiate(
        &self,
        endpoint_type: EndpointType,
        selection: &EndpointSelection,
        ctx: &OperationContext,
    ) -> Result<EndpointInstance, PackageSystemError> {
        let selection = self.apply_package_config(selection)?;
        let selection = &selection;
        let provider = self.resolve_provider(endpoint_type, &selection.endpoint).await?;
        if !provider.provided_endpoints().contains(&endpoint_type) {
            return Err(PackageSystemError::UndeclaredEndpoint {
                package_id: provider.id().to_string(),
                endpoint_type,
            });
        }
        let instance = provider.create_endpoint(endpoint_type, selection, ctx)?;
        if instance.endpoint_type() != endpoint_type {
            return Err(PackageSystemError::ContractViolation {
                package_id: provider.id().to_string(),
                requested: endpoint_type,
                provided: instance.endpoint_type(),
            });
        }
        if let Some(events) = &self.events {
            events
                .dispatch(&ReviewEvent::PackageLoaded {
                    identifier: selection.endpoint.clone(),
                    endpoint_type: endpoint_type.to_string(),
                })
                .await;
        }
        Ok(instance)
    }

    pub fn registry(&self) -> Arc<Mutex<PackageRegistry>> {
        self.registry.clone()
    }
}

#[async_trait]
impl KernelComponent for DefaultPackageManager {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn initialize(&self) -> KernelResult<()> {
        {
            let mut loader = self.loader.lock().await;
            loader.add_package_dir(&self.module_dir);
            loader.add_package_dir(&self.custom_dir);
        }
        self.load_index().await?;
        self.flag_installed().await?;
        let count = self.registry.lock().await.entry_count();
        debug!("Package index loaded with {} endpoint entries", count);
        Ok(())
    }

    async fn start(&self) -> KernelResult<()> {
        Ok(())
    }

    async fn stop(&self) -> KernelResult<()> {
        Ok(())
    }
}

#[async_trait]
impl PackageManager for DefaultPackageManager {
    async fn discover(
        &self,
        endpoint_type: Option<EndpointType>,
        installed_only: bool,
    ) -> Vec<PackageSummary> {
        let registry = self.registry.lock().await;
        registry
            .summaries(installed_only)
            .into_iter()
            .filter(|summary| endpoint_type.map_or(true, |t| summary.endpoint_type == t))
            .collect()
    }

    async fn endpoint_details(
        &self,
        endpoint_type: EndpointType,
        identifier: &str,
    ) -> Result<serde_json::Value, PackageSystemError> {
        // Loads an installed module or custom package on demand; only
        // entries flagged uninstalled remain unresolvable.
        let provider = self.resolve_provider(endpoint_type, identifier).await?;
        Ok(provider.settings_schema(endpoint_type))
    }

    async fn load_packages(
        &self,
        endpoint_type: EndpointType,
        selections: &[EndpointSelection],
        ctx: &OperationContext,
        ignore_not_available: bool,
    ) -> Result<Vec<LoadedEndpoint>, PackageSystemError> {
        let mut loaded = Vec::with_capacity(selections.len());
        for selection in selections {
            match self.instantiate(endpoint_type, selection, ctx).await {
                Ok(instance) => loaded.push(LoadedEndpoint {
                    selection: selection.clone(),
                    instance,
                }),
                Err(e) if ignore_not_available => {
                    warn!(
                        "Dropping endpoint '{}' for {}: {}",
                        selection.endpoint, endpoint_type, e
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(loaded)
    }
}
