use std::path::Path;

use crate::package_system::endpoint::EndpointType;
use crate::package_system::error::PackageSystemError;
use crate::package_system::manifest::{validate_identifier, PackageIndex, PackageManifest};

#[test]
fn test_embedded_index_parses() {
    let index = PackageIndex::parse(include_str!("../builtin_index.json")).unwrap();
    let entry = index.get(EndpointType::Dedupe, "exact_match").unwrap();
    assert_eq!(entry.module, "litrev-dedupe-exact");
    assert!(index.get(EndpointType::Dedupe, "no_such_endpoint").is_none());
}

#[test]
fn test_identifier_validation() {
    assert!(validate_identifier("exact_match").is_ok());
    assert!(validate_identifier("litrev-pdf-local").is_ok());
    assert!(matches!(
        validate_identifier("Exact_Match"),
        Err(PackageSystemError::InvalidIdentifier { .. })
    ));
    assert!(matches!(
        validate_identifier("exact match"),
        Err(PackageSystemError::InvalidIdentifier { .. })
    ));
    assert!(validate_identifier("").is_err());
}

#[test]
fn test_index_rejects_bad_identifier() {
    let data = r#"{ "dedupe": { "Bad Id": { "module": "x", "description": "y" } } }"#;
    assert!(PackageIndex::parse(data).is_err());
}

#[test]
fn test_manifest_parse_defaults() {
    let content = r#"{
        "id": "litrev-dedupe-exact",
        "version": "0.1.0",
        "endpoints": ["dedupe"]
    }"#;
    let manifest =
        PackageManifest::parse(content, Path::new("/tmp/pkgs/litrev-dedupe-exact/package.json"))
            .unwrap();
    assert_eq!(manifest.name, "litrev-dedupe-exact");
    assert_eq!(manifest.entry_point, "liblitrev_dedupe_exact.so");
    assert_eq!(manifest.endpoints, vec![EndpointType::Dedupe]);
    assert_eq!(
        manifest.library_path(),
        Path::new("/tmp/pkgs/litrev-dedupe-exact/liblitrev_dedupe_exact.so")
    );
}

#[test]
fn test_manifest_rejects_unknown_endpoint() {
    let content = r#"{
        "id": "broken",
        "version": "0.1.0",
        "endpoints": ["deduper"]
    }"#;
    let err = PackageManifest::parse(content, Path::new("/tmp/broken/package.json")).unwrap_err();
    assert!(matches!(err, PackageSystemError::ManifestError { .. }));
}
