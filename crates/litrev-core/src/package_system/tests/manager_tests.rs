use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::kernel::component::KernelComponent;
use crate::package_system::endpoint::{
    EndpointInstance, EndpointSelection, EndpointType, OperationContext, PrescreenEndpoint,
    ScreenEndpoint, ReviewPackage,
};
use crate::package_system::error::PackageSystemError;
use crate::package_system::manager::{DefaultPackageManager, PackageManager};
use crate::record::dataset::Dataset;
use crate::storage::settings::ProjectSettings;

/// Minimal prescreen package used across the package system tests.
pub struct ToyPackage {
    id: String,
}

impl ToyPackage {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

struct ToyPrescreen;

#[async_trait]
impl PrescreenEndpoint for ToyPrescreen {
    async fn run_prescreen(
        &self,
        _ctx: &OperationContext,
        _dataset: &mut Dataset,
    ) -> Result<(), PackageSystemError> {
        Ok(())
    }
}

impl ReviewPackage for ToyPackage {
    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> &str {
        "0.1.0"
    }

    fn description(&self) -> &str {
        "Toy prescreen for tests"
    }

    fn provided_endpoints(&self) -> Vec<EndpointType> {
        vec![EndpointType::Prescreen]
    }

    fn create_endpoint(
        &self,
        endpoint_type: EndpointType,
        _selection: &EndpointSelection,
        _ctx: &OperationContext,
    ) -> Result<EndpointInstance, PackageSystemError> {
        match endpoint_type {
            EndpointType::Prescreen => Ok(EndpointInstance::Prescreen(Box::new(ToyPrescreen))),
            other => Err(PackageSystemError::UndeclaredEndpoint {
                package_id: self.id.clone(),
                endpoint_type: other,
            }),
        }
    }
}

/// Claims prescreen but hands back a screen instance.
struct MiscreantPackage;

struct NoopScreen;

#[async_trait]
impl ScreenEndpoint for NoopScreen {
    async fn run_screen(
        &self,
        _ctx: &OperationContext,
        _dataset: &mut Dataset,
    ) -> Result<(), PackageSystemError> {
        Ok(())
    }
}

impl ReviewPackage for MiscreantPackage {
    fn id(&self) -> &str {
        "miscreant"
    }

    fn version(&self) -> &str {
        "0.1.0"
    }

    fn description(&self) -> &str {
        "Violates its declared contract"
    }

    fn provided_endpoints(&self) -> Vec<EndpointType> {
        vec![EndpointType::Prescreen]
    }

    fn create_endpoint(
        &self,
        _endpoint_type: EndpointType,
        _selection: &EndpointSelection,
        _ctx: &OperationContext,
    ) -> Result<EndpointInstance, PackageSystemError> {
        Ok(EndpointInstance::Screen(Box::new(NoopScreen)))
    }
}

fn test_manager(root: &Path) -> DefaultPackageManager {
    DefaultPackageManager::new(root.join("packages"), root.join("custom_packages"))
}

fn test_ctx(operation: &str, root: &Path) -> OperationContext {
    OperationContext::new(operation, root, Arc::new(ProjectSettings::with_defaults("t")))
}

#[tokio::test]
async fn test_builtin_resolution_and_contract() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path());
    manager.register_builtin(Arc::new(ToyPackage::new("toy"))).await.unwrap();
    manager.initialize().await.unwrap();

    let ctx = test_ctx("prescreen", dir.path());
    let loaded = manager
        .load_packages(
            EndpointType::Prescreen,
            &[EndpointSelection::new("toy")],
            &ctx,
            false,
        )
        .await
        .unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].instance.endpoint_type(), EndpointType::Prescreen);
}

#[tokio::test]
async fn test_not_installed_index_entry() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path());
    manager.initialize().await.unwrap();

    // "crossref" is listed in the curated index but no library provides it
    let ctx = test_ctx("search", dir.path());
    let err = manager
        .load_packages(
            EndpointType::SearchSource,
            &[EndpointSelection::new("crossref")],
            &ctx,
            false,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PackageSystemError::NotInstalled { .. }));
}

#[tokio::test]
async fn test_ignore_not_available_drops_broken() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path());
    manager.register_builtin(Arc::new(ToyPackage::new("toy"))).await.unwrap();
    manager.initialize().await.unwrap();

    let ctx = test_ctx("prescreen", dir.path());
    let loaded = manager
        .load_packages(
            EndpointType::Prescreen,
            &[EndpointSelection::new("no_such_thing"), EndpointSelection::new("toy")],
            &ctx,
            true,
        )
        .await
        .unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].selection.endpoint, "toy");
}

#[tokio::test]
async fn test_contract_violation_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path());
    manager.register_builtin(Arc::new(MiscreantPackage)).await.unwrap();
    manager.initialize().await.unwrap();

    let ctx = test_ctx("prescreen", dir.path());
    let err = manager
        .load_packages(
            EndpointType::Prescreen,
            &[EndpointSelection::new("miscreant")],
            &ctx,
            false,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PackageSystemError::ContractViolation {
            requested: EndpointType::Prescreen,
            provided: EndpointType::Screen,
            ..
        }
    ));
}

#[tokio::test]
async fn test_unknown_identifier_is_missing_dependency() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path());
    manager.initialize().await.unwrap();

    let ctx = test_ctx("dedupe", dir.path());
    let err = manager
        .load_packages(
            EndpointType::Dedupe,
            &[EndpointSelection::new("never_heard_of_it")],
            &ctx,
            false,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PackageSystemError::MissingDependency { .. }));
}

#[tokio::test]
async fn test_discover_lists_curated_entries() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path());
    manager.register_builtin(Arc::new(ToyPackage::new("exact_match"))).await.unwrap();
    manager.initialize().await.unwrap();

    let all = manager.discover(Some(EndpointType::Dedupe), false).await;
    assert!(all.iter().any(|s| s.identifier == "exact_match"));

    let installed = manager.discover(None, true).await;
    assert!(installed.iter().all(|s| s.installed));
    assert!(installed.iter().any(|s| s.identifier == "exact_match"));
}

/// Prescreen package that refuses to instantiate without its "flag"
/// parameter, used to observe which parameters reach `create_endpoint`.
struct PickyPackage {
    id: String,
}

impl PickyPackage {
    fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

impl ReviewPackage for PickyPackage {
    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> &str {
        "0.1.0"
    }

    fn description(&self) -> &str {
        "Requires a flag parameter"
    }

    fn provided_endpoints(&self) -> Vec<EndpointType> {
        vec![EndpointType::Prescreen]
    }

    fn create_endpoint(
        &self,
        endpoint_type: EndpointType,
        selection: &EndpointSelection,
        _ctx: &OperationContext,
    ) -> Result<EndpointInstance, PackageSystemError> {
        if endpoint_type != EndpointType::Prescreen {
            return Err(PackageSystemError::UndeclaredEndpoint {
                package_id: self.id.clone(),
                endpoint_type,
            });
        }
        if !selection.bool_param("flag", false) {
            return Err(PackageSystemError::OperationError {
                package_id: self.id.clone(),
                message: "flag parameter is required".to_string(),
            });
        }
        Ok(EndpointInstance::Prescreen(Box::new(ToyPrescreen)))
    }
}

#[tokio::test]
async fn test_endpoint_details_resolves_through_the_loader() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path());
    manager.register_builtin(Arc::new(ToyPackage::new("toy"))).await.unwrap();
    manager.initialize().await.unwrap();

    // Built-in provider: the schema is available directly
    let schema = manager
        .endpoint_details(EndpointType::Prescreen, "toy")
        .await
        .unwrap();
    assert!(schema.is_object());

    // Listed but uninstalled entries stay unresolvable
    let err = manager
        .endpoint_details(EndpointType::SearchSource, "crossref")
        .await
        .unwrap_err();
    assert!(matches!(err, PackageSystemError::NotInstalled { .. }));

    // An installed entry without a cached provider must reach the loader
    // instead of being reported as not installed
    {
        let registry = manager.registry();
        let mut registry = registry.lock().await;
        registry
            .insert(
                EndpointType::Dedupe,
                crate::package_system::registry::PackageEntry {
                    identifier: "ghost".to_string(),
                    module: "litrev-ghost".to_string(),
                    description: "installed but never loaded".to_string(),
                    source: crate::package_system::registry::PackageSource::Module(
                        dir.path().join("packages/litrev-ghost"),
                    ),
                    installed: true,
                    provider: None,
                },
            )
            .unwrap();
    }
    let err = manager
        .endpoint_details(EndpointType::Dedupe, "ghost")
        .await
        .unwrap_err();
    assert!(
        matches!(err, PackageSystemError::MissingDependency { .. }),
        "expected a loader-side failure, got {:?}",
        err
    );
}

#[tokio::test]
async fn test_package_config_file_supplies_default_params() {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("package_config");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("picky.json"), r#"{ "flag": true }"#).unwrap();

    let manager = test_manager(dir.path()).with_config_dir(config_dir);
    manager.register_builtin(Arc::new(PickyPackage::new("picky"))).await.unwrap();
    manager.initialize().await.unwrap();

    let ctx = test_ctx("prescreen", dir.path());
    let loaded = manager
        .load_packages(
            EndpointType::Prescreen,
            &[EndpointSelection::new("picky")],
            &ctx,
            false,
        )
        .await
        .unwrap();
    assert_eq!(loaded.len(), 1);
}

#[tokio::test]
async fn test_package_config_yaml_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("package_config");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("picky.yaml"), "flag: true\n").unwrap();

    let manager = test_manager(dir.path()).with_config_dir(config_dir);
    manager.register_builtin(Arc::new(PickyPackage::new("picky"))).await.unwrap();
    manager.initialize().await.unwrap();

    let ctx = test_ctx("prescreen", dir.path());
    let loaded = manager
        .load_packages(
            EndpointType::Prescreen,
            &[EndpointSelection::new("picky")],
            &ctx,
            false,
        )
        .await
        .unwrap();
    assert_eq!(loaded.len(), 1);
}

#[tokio::test]
async fn test_selection_params_override_package_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("package_config");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("picky.json"), r#"{ "flag": true }"#).unwrap();

    let manager = test_manager(dir.path()).with_config_dir(config_dir);
    manager.register_builtin(Arc::new(PickyPackage::new("picky"))).await.unwrap();
    manager.initialize().await.unwrap();

    let ctx = test_ctx("prescreen", dir.path());
    let selection =
        EndpointSelection::new("picky").with_param("flag", serde_json::json!(false));
    let err = manager
        .load_packages(EndpointType::Prescreen, &[selection], &ctx, false)
        .await
        .unwrap_err();
    assert!(matches!(err, PackageSystemError::OperationError { .. }));
}

#[tokio::test]
async fn test_missing_config_dir_leaves_selection_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).with_config_dir(dir.path().join("package_config"));
    manager.register_builtin(Arc::new(PickyPackage::new("picky"))).await.unwrap();
    manager.initialize().await.unwrap();

    let ctx = test_ctx("prescreen", dir.path());
    let err = manager
        .load_packages(
            EndpointType::Prescreen,
            &[EndpointSelection::new("picky")],
            &ctx,
            false,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PackageSystemError::OperationError { .. }));
}
