use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::{Library, Symbol};
use log::warn;
use semver::Version;
use tokio::fs;

use crate::package_system::endpoint::{
    PackageDeclaration, PackageRegistrar, ReviewPackage, CORE_VERSION,
    PACKAGE_DECLARATION_SYMBOL,
};
use crate::package_system::error::{PackageSystemError, PackageSystemErrorSource};
use crate::package_system::manifest::PackageManifest;

/// Scans package directories for manifests and loads the libraries they
/// point at. Loaded libraries stay alive for the lifetime of the loader;
/// endpoint instances hold code from them.
pub struct PackageLoader {
    package_dirs: Vec<PathBuf>,
    manifests: HashMap<String, PackageManifest>,
    libraries: Vec<Library>,
}

impl std::fmt::Debug for PackageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageLoader")
            .field("package_dirs", &self.package_dirs)
            .field("manifest_count", &self.manifests.len())
            .field("loaded_libraries", &self.libraries.len())
            .finish()
    }
}

impl PackageLoader {
    pub fn new() -> Self {
        Self {
            package_dirs: Vec::new(),
            manifests: HashMap::new(),
            libraries: Vec::new(),
        }
    }

    pub fn add_package_dir<P: AsRef<Path>>(&mut self, dir: P) {
        self.package_dirs.push(dir.as_ref().to_path_buf());
    }

    /// Scan every package directory for `<id>/package.json` manifests.
    /// Broken manifests are skipped with a warning; they surface later as
    /// not-installed entries.
    pub async fn scan_for_manifests(&mut self) -> Result<Vec<PackageManifest>, PackageSystemError> {
        let mut manifests = Vec::new();

        for dir in &self.package_dirs {
            let dir_exists = fs::try_exists(dir).await.unwrap_or(false);
            if !dir_exists {
                continue;
            }

            let mut read_dir = fs::read_dir(dir).await.map_err(|e| {
                PackageSystemError::LoadingError {
                    package_id: "<scan>".to_string(),
                    path: Some(dir.clone()),
                    source: Box::new(PackageSystemErrorSource::Io(e)),
                }
            })?;

            while let Some(entry) = read_dir.next_entry().await.map_err(|e| {
                PackageSystemError::LoadingError {
                    package_id: "<scan>".to_string(),
                    path: Some(dir.clone()),
                    source: Box::new(PackageSystemErrorSource::Io(e)),
                }
            })? {
                let entry_path = entry.path();
                if !entry_path.is_dir() {
                    continue;
                }
                let manifest_path =
                    entry_path.join(crate::kernel::constants::PACKAGE_MANIFEST_FILE);
                if !fs::try_exists(&manifest_path).await.unwrap_or(false) {
                    continue;
                }
                let content = match fs::read_to_string(&manifest_path).await {
                    Ok(content) => content,
                    Err(e) => {
                        warn!(
                            "Skipping unreadable package manifest {}: {}",
                            manifest_path.display(),
                            e
                        );
                        continue;
                    }
                };
                match PackageManifest::parse(&content, &manifest_path) {
                    Ok(manifest) => manifests.push(manifest),
                    Err(e) => {
                        warn!(
                            "Skipping broken package manifest {}: {}",
                            manifest_path.display(),
                            e
                        );
                    }
                }
            }
        }

        for manifest in &manifests {
            self.manifests.insert(manifest.id.clone(), manifest.clone());
        }
        Ok(manifests)
    }

    pub fn get_manifest(&self, id: &str) -> Option<&PackageManifest> {
        self.manifests.get(id)
    }

    pub fn all_manifests(&self) -> impl Iterator<Item = &PackageManifest> {
        self.manifests.values()
    }

    /// Whether the library a manifest points at exists on disk.
    pub fn library_resolves(&self, manifest: &PackageManifest) -> bool {
        manifest.library_path().is_file()
    }

    /// Load the library behind a manifest and collect the packages it
    /// registers. Refuses libraries built against an incompatible core
    /// version.
    pub fn load_package(
        &mut self,
        manifest: &PackageManifest,
    ) -> Result<Vec<Arc<dyn ReviewPackage>>, PackageSystemError> {
        let library_path = manifest.library_path();

        // SAFETY: loading arbitrary library code is inherently unsafe; the
        // declaration symbol contract below is the boundary we rely on.
        let library = unsafe { Library::new(&library_path) }.map_err(|e| {
            PackageSystemError::LoadingError {
                package_id: manifest.id.clone(),
                path: Some(library_path.clone()),
                source: Box::new(PackageSystemErrorSource::Other(e.to_string())),
            }
        })?;

        let declaration: PackageDeclaration = unsafe {
            let symbol: Symbol<*const PackageDeclaration> = library
                .get(PACKAGE_DECLARATION_SYMBOL)
                .map_err(|e| PackageSystemError::LoadingError {
                    package_id: manifest.id.clone(),
                    path: Some(library_path.clone()),
                    source: Box::new(PackageSystemErrorSource::Symbol(e.to_string())),
                })?;
            **symbol
        };

        if !core_versions_compatible(declaration.core_version, CORE_VERSION) {
            return Err(PackageSystemError::CoreVersionMismatch {
                package_id: manifest.id.clone(),
                package_core_version: declaration.core_version.to_string(),
                host_core_version: CORE_VERSION.to_string(),
            });
        }

        let mut registrar = PackageRegistrar::new();
        (declaration.register)(&mut registrar);
        let packages = registrar.into_packages();
        if packages.is_empty() {
            return Err(PackageSystemError::LoadingError {
                package_id: manifest.id.clone(),
                path: Some(library_path),
                source: Box::new(PackageSystemErrorSource::Other(
                    "library registered no packages".to_string(),
                )),
            });
        }

        // Keep the library alive; instances reference its code.
        self.libraries.push(library);
        Ok(packages)
    }
}

impl Default for PackageLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Caret-style compatibility: same major, and same minor while pre-1.0.
pub fn core_versions_compatible(package: &str, host: &str) -> bool {
    let (Ok(package), Ok(host)) = (Version::parse(package), Version::parse(host)) else {
        return false;
    };
    if package.major != host.major {
        return false;
    }
    if host.major == 0 && package.minor != host.minor {
        return false;
    }
    true
}
