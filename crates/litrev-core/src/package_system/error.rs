use std::path::PathBuf;

use crate::package_system::endpoint::EndpointType;

#[derive(Debug, thiserror::Error)]
pub enum PackageSystemError {
    #[error("Package loading failed for '{package_id}': {source}")]
    LoadingError {
        package_id: String,
        path: Option<PathBuf>,
        #[source]
        source: Box<PackageSystemErrorSource>,
    },

    #[error("Package manifest error for '{path}': {message}")]
    ManifestError {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid endpoint identifier '{identifier}': {reason}")]
    InvalidIdentifier {
        identifier: String,
        reason: String,
    },

    #[error("Package registration error for '{package_id}': {message}")]
    RegistrationError {
        package_id: String,
        message: String,
    },

    #[error("Endpoint '{identifier}' is not installed for {endpoint_type}")]
    NotInstalled {
        endpoint_type: EndpointType,
        identifier: String,
    },

    #[error("Missing dependency: no package provides '{identifier}' for {endpoint_type}")]
    MissingDependency {
        endpoint_type: EndpointType,
        identifier: String,
    },

    #[error(
        "Contract violation in package '{package_id}': requested {requested}, endpoint provides {provided}"
    )]
    ContractViolation {
        package_id: String,
        requested: EndpointType,
        provided: EndpointType,
    },

    #[error("Package '{package_id}' does not declare endpoint type {endpoint_type}")]
    UndeclaredEndpoint {
        package_id: String,
        endpoint_type: EndpointType,
    },

    #[error(
        "Package '{package_id}' was built against core version {package_core_version}, incompatible with {host_core_version}"
    )]
    CoreVersionMismatch {
        package_id: String,
        package_core_version: String,
        host_core_version: String,
    },

    #[error("Operation error in package '{package_id}': {message}")]
    OperationError {
        package_id: String,
        message: String,
    },

    #[error("Unknown endpoint type '{0}'")]
    UnknownEndpointType(String),

    #[error("Internal package system error: {0}")]
    InternalError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PackageSystemErrorSource {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Symbol resolution failed: {0}")]
    Symbol(String),
    #[error("Other: {0}")]
    Other(String),
}
