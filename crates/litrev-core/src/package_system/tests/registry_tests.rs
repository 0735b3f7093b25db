use std::sync::Arc;

use crate::package_system::endpoint::{
    EndpointInstance, EndpointSelection, EndpointType, OperationContext, ReviewPackage,
};
use crate::package_system::error::PackageSystemError;
use crate::package_system::registry::{PackageEntry, PackageRegistry, PackageSource};

use super::manager_tests::ToyPackage;

fn index_entry(identifier: &str) -> PackageEntry {
    PackageEntry {
        identifier: identifier.to_string(),
        module: "litrev-toy".to_string(),
        description: "toy".to_string(),
        source: PackageSource::Module("/nowhere".into()),
        installed: false,
        provider: None,
    }
}

#[test]
fn test_attach_provider_upgrades_index_entry() {
    let mut registry = PackageRegistry::new();
    registry
        .insert(EndpointType::Prescreen, index_entry("toy"))
        .unwrap();

    let package: Arc<dyn ReviewPackage> = Arc::new(ToyPackage::new("toy"));
    registry
        .attach_provider(
            EndpointType::Prescreen,
            "toy",
            PackageSource::BuiltIn,
            package,
        )
        .unwrap();

    let entry = registry.get(EndpointType::Prescreen, "toy").unwrap();
    assert!(entry.installed);
    assert_eq!(entry.source, PackageSource::BuiltIn);
    assert!(entry.provider.is_some());
}

#[test]
fn test_duplicate_provider_is_rejected() {
    let mut registry = PackageRegistry::new();
    let package: Arc<dyn ReviewPackage> = Arc::new(ToyPackage::new("toy"));
    registry
        .attach_provider(
            EndpointType::Prescreen,
            "toy",
            PackageSource::BuiltIn,
            package.clone(),
        )
        .unwrap();

    let err = registry
        .attach_provider(EndpointType::Prescreen, "toy", PackageSource::BuiltIn, package)
        .unwrap_err();
    assert!(matches!(err, PackageSystemError::RegistrationError { .. }));
}

#[test]
fn test_summaries_filter_installed() {
    let mut registry = PackageRegistry::new();
    registry
        .insert(EndpointType::Prescreen, index_entry("listed_only"))
        .unwrap();
    let package: Arc<dyn ReviewPackage> = Arc::new(ToyPackage::new("toy"));
    registry
        .attach_provider(EndpointType::Prescreen, "toy", PackageSource::BuiltIn, package)
        .unwrap();

    assert_eq!(registry.summaries(false).len(), 2);
    let installed = registry.summaries(true);
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].identifier, "toy");
}

#[test]
fn test_same_identifier_across_types() {
    let mut registry = PackageRegistry::new();
    let package: Arc<dyn ReviewPackage> = Arc::new(ToyPackage::new("toy"));
    registry
        .attach_provider(
            EndpointType::Prescreen,
            "toy",
            PackageSource::BuiltIn,
            package.clone(),
        )
        .unwrap();
    // Same identifier under a different endpoint type is fine
    registry
        .attach_provider(EndpointType::Screen, "toy", PackageSource::BuiltIn, package)
        .unwrap();
    assert_eq!(registry.entry_count(), 2);
}

#[test]
fn test_toy_package_contract() {
    let package = ToyPackage::new("toy");
    let ctx = OperationContext::new(
        "prescreen",
        std::path::Path::new("/tmp/project"),
        Arc::new(crate::storage::settings::ProjectSettings::with_defaults("t")),
    );
    let instance = package
        .create_endpoint(
            EndpointType::Prescreen,
            &EndpointSelection::new("toy"),
            &ctx,
        )
        .unwrap();
    assert!(matches!(instance, EndpointInstance::Prescreen(_)));
    assert!(instance.expect_prescreen().is_ok());
    assert!(instance.expect_screen().is_err());
}
