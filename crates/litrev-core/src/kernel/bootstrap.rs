use std::any::TypeId;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::event::manager::EventManager;
use crate::event::types::ReviewEvent;
use crate::event::DefaultEventManager;
use crate::kernel::component::{DependencyRegistry, KernelComponent};
use crate::kernel::constants;
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::package_system::manager::DefaultPackageManager;
use crate::stage_manager::context::{ExecutionMode, StageContext};
use crate::stage_manager::manager::DefaultStageManager;
use crate::stage_manager::review_stages::{
    EVENT_MANAGER_KEY, PACKAGE_MANAGER_KEY, STORAGE_MANAGER_KEY,
};
use crate::storage::manager::{DefaultStorageManager, StorageManager};

/// Main application struct coordinating components via dependency injection.
pub struct Application {
    initialized: bool,
    dependencies: Arc<Mutex<DependencyRegistry>>,
    /// Component lifecycle order, by concrete TypeId
    component_order: Vec<TypeId>,
    storage_manager: Arc<DefaultStorageManager>,
    event_manager: Arc<DefaultEventManager>,
    package_manager: Arc<DefaultPackageManager>,
    stage_manager: Arc<DefaultStageManager>,
}

impl Application {
    /// Assemble the application around an opened or initialized project.
    pub fn for_project(storage_manager: DefaultStorageManager) -> Self {
        log::debug!("Assembling {} v{}", constants::APP_NAME, constants::APP_VERSION);

        let mut registry = DependencyRegistry::new();
        let mut order = Vec::new();

        let storage_manager = Arc::new(storage_manager);
        registry.register_instance(storage_manager.clone());
        order.push(TypeId::of::<DefaultStorageManager>());

        let event_manager = Arc::new(DefaultEventManager::new());
        registry.register_instance(event_manager.clone());
        order.push(TypeId::of::<DefaultEventManager>());

        let package_manager = Arc::new(
            DefaultPackageManager::new(
                storage_manager.module_packages_dir(),
                storage_manager.custom_packages_dir(),
            )
            .with_config_dir(storage_manager.package_config_dir())
            .with_events(event_manager.clone()),
        );
        registry.register_instance(package_manager.clone());
        order.push(TypeId::of::<DefaultPackageManager>());

        let stage_manager = Arc::new(DefaultStageManager::new(event_manager.clone()));
        registry.register_instance(stage_manager.clone());
        order.push(TypeId::of::<DefaultStageManager>());

        Application {
            initialized: false,
            dependencies: Arc::new(Mutex::new(registry)),
            component_order: order,
            storage_manager,
            event_manager,
            package_manager,
            stage_manager,
        }
    }

    /// Get a specific component instance by its concrete type.
    pub async fn get_component<T: KernelComponent + 'static>(&self) -> Option<Arc<T>> {
        let registry = self.dependencies.lock().await;
        registry.get_concrete::<T>()
    }

    /// Initialize and start all components, in registration order.
    pub async fn start(&mut self) -> Result<()> {
        if self.initialized {
            return Err(Error::KernelLifecycleError {
                phase: KernelLifecyclePhase::RunPreCheck,
                component_name: None,
                message: "Application already initialized".to_string(),
                source: None,
            });
        }

        self.run_phase(KernelLifecyclePhase::Initialize).await?;
        self.run_phase(KernelLifecyclePhase::Start).await?;
        self.initialized = true;
        self.event_manager.dispatch(&ReviewEvent::ApplicationStart).await;
        log::debug!("Application started");
        Ok(())
    }

    /// Stop all components in reverse registration order.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.event_manager.dispatch(&ReviewEvent::ApplicationShutdown).await;
        let registry = self.dependencies.lock().await;
        for type_id in self.component_order.iter().rev() {
            if let Some(component) = registry.get_component_by_id(type_id) {
                log::debug!("Stopping component: {}", component.name());
                if let Err(e) = component.stop().await {
                    log::warn!("Component {} failed to stop: {}", component.name(), e);
                }
            }
        }
        self.initialized = false;
        Ok(())
    }

    async fn run_phase(&self, phase: KernelLifecyclePhase) -> Result<()> {
        let registry = self.dependencies.lock().await;
        for type_id in &self.component_order {
            let Some(component) = registry.get_component_by_id(type_id) else {
                return Err(Error::KernelLifecycleError {
                    phase: phase.clone(),
                    component_name: None,
                    message: format!("Instance missing from registry for {:?}", type_id),
                    source: None,
                });
            };
            log::debug!("{:?}: {}", phase, component.name());
            let result = match &phase {
                KernelLifecyclePhase::Initialize => component.initialize().await,
                KernelLifecyclePhase::Start => component.start().await,
                _ => Ok(()),
            };
            result.map_err(|e| Error::KernelLifecycleError {
                phase: phase.clone(),
                component_name: Some(component.name().to_string()),
                message: format!("component failed during {:?}", phase),
                source: Some(Box::new(e)),
            })?;
        }
        Ok(())
    }

    /// Build a stage context wired with the shared managers.
    pub fn stage_context(&self, mode: ExecutionMode) -> StageContext {
        let project_dir = self.storage_manager.project_root().to_path_buf();
        let mut context = match mode {
            ExecutionMode::Live => StageContext::new_live(project_dir),
            ExecutionMode::DryRun => StageContext::new_dry_run(project_dir),
        };
        context.set_data(STORAGE_MANAGER_KEY, self.storage_manager.clone());
        context.set_data(PACKAGE_MANAGER_KEY, self.package_manager.clone());
        context.set_data(EVENT_MANAGER_KEY, self.event_manager.clone());
        context
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn storage_manager(&self) -> Arc<DefaultStorageManager> {
        self.storage_manager.clone()
    }

    pub fn event_manager(&self) -> Arc<DefaultEventManager> {
        self.event_manager.clone()
    }

    pub fn package_manager(&self) -> Arc<DefaultPackageManager> {
        self.package_manager.clone()
    }

    pub fn stage_manager(&self) -> Arc<DefaultStageManager> {
        self.stage_manager.clone()
    }
}
