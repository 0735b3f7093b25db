use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use async_trait::async_trait;

use crate::kernel::component::KernelComponent;
use crate::kernel::constants;
use crate::kernel::error::Result;
use crate::storage::error::StorageSystemError;
use crate::storage::local::LocalStorageProvider;
use crate::storage::provider::StorageProvider;
use crate::storage::settings::ProjectSettings;

/// Storage manager component interface
#[async_trait]
pub trait StorageManager: KernelComponent {
    /// Absolute path of the project root
    fn project_root(&self) -> &Path;

    /// Load the project settings from disk
    fn load_settings(&self) -> Result<ProjectSettings>;

    /// Persist the project settings
    fn save_settings(&self, settings: &ProjectSettings) -> Result<()>;
}

/// Default implementation of StorageManager over a local project directory
#[derive(Clone)]
pub struct DefaultStorageManager {
    name: &'static str,
    project_root: PathBuf,
    provider: Arc<dyn StorageProvider>,
}

impl Debug for DefaultStorageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultStorageManager")
            .field("project_root", &self.project_root)
            .finish_non_exhaustive()
    }
}

impl DefaultStorageManager {
    /// Open an existing project by walking upward from `start_dir` until a
    /// settings file is found.
    pub fn open(start_dir: &Path) -> Result<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            if dir.join(constants::SETTINGS_FILE).is_file() {
                return Ok(Self::at(dir));
            }
            if !dir.pop() {
                return Err(StorageSystemError::ProjectNotFound(
                    constants::SETTINGS_FILE.to_string(),
                )
                .into());
            }
        }
    }

    /// Initialize a new project at `dir`: directory layout, default
    /// settings and an empty record store.
    pub fn init(dir: &Path, title: &str) -> Result<Self> {
        let settings_path = dir.join(constants::SETTINGS_FILE);
        if settings_path.is_file() {
            return Err(StorageSystemError::ResourceExists(settings_path).into());
        }
        let manager = Self::at(dir.to_path_buf());
        manager.ensure_layout()?;
        manager.save_settings(&ProjectSettings::with_defaults(title))?;
        manager
            .provider
            .write_string(Path::new(constants::RECORDS_FILE), "{}\n")?;
        log::info!("Initialized project at {}", dir.display());
        Ok(manager)
    }

    /// Use `root` as the project root without any discovery.
    pub fn at(root: PathBuf) -> Self {
        let provider = Arc::new(LocalStorageProvider::new(root.clone()));
        Self {
            name: "DefaultStorageManager",
            project_root: root,
            provider,
        }
    }

    /// Get the underlying provider
    pub fn provider(&self) -> &Arc<dyn StorageProvider> {
        &self.provider
    }

    /// Path of the record store, relative to the provider root
    pub fn records_file(&self) -> &'static Path {
        Path::new(constants::RECORDS_FILE)
    }

    /// History directory, relative to the provider root
    pub fn history_dir(&self) -> &'static Path {
        Path::new(constants::HISTORY_DIR)
    }

    /// Search directory (absolute)
    pub fn search_dir(&self) -> PathBuf {
        self.project_root.join(constants::SEARCH_DIR)
    }

    /// PDF directory (absolute)
    pub fn pdf_dir(&self) -> PathBuf {
        self.project_root.join(constants::PDF_DIR)
    }

    /// Module packages directory (absolute). Overridable via
    /// `LITREV_PACKAGE_PATH` so modules can be shared between projects.
    pub fn module_packages_dir(&self) -> PathBuf {
        match std::env::var_os("LITREV_PACKAGE_PATH") {
            Some(path) => PathBuf::from(path),
            None => self.project_root.join(constants::MODULE_PACKAGES_DIR),
        }
    }

    /// Project-local custom packages directory (absolute)
    pub fn custom_packages_dir(&self) -> PathBuf {
        self.project_root.join(constants::CUSTOM_PACKAGES_DIR)
    }

    /// Project-local per-package configuration directory (absolute)
    pub fn package_config_dir(&self) -> PathBuf {
        self.project_root.join(constants::PACKAGE_CONFIG_DIR)
    }

    fn ensure_layout(&self) -> Result<()> {
        for dir in [
            constants::SEARCH_DIR,
            constants::PDF_DIR,
            constants::HISTORY_DIR,
        ] {
            self.provider.create_dir_all(Path::new(dir))?;
        }
        Ok(())
    }
}

#[async_trait]
impl KernelComponent for DefaultStorageManager {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn initialize(&self) -> Result<()> {
        // Missing directories are recreated so older projects keep working
        self.ensure_layout()
    }

    async fn start(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl StorageManager for DefaultStorageManager {
    fn project_root(&self) -> &Path {
        &self.project_root
    }

    fn load_settings(&self) -> Result<ProjectSettings> {
        let raw = self
            .provider
            .read_to_string(Path::new(constants::SETTINGS_FILE))?;
        let settings =
            serde_json::from_str(&raw).map_err(|e| StorageSystemError::DeserializationError {
                format: "json".to_string(),
                source: Box::new(e),
            })?;
        Ok(settings)
    }

    fn save_settings(&self, settings: &ProjectSettings) -> Result<()> {
        let raw = serde_json::to_string_pretty(settings).map_err(|e| {
            StorageSystemError::SerializationError {
                format: "json".to_string(),
                source: Box::new(e),
            }
        })?;
        self.provider
            .write_string(Path::new(constants::SETTINGS_FILE), &raw)?;
        Ok(())
    }
}
