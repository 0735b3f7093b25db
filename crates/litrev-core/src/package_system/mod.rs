pub mod endpoint;
pub mod error;
pub mod loader;
pub mod manager;
pub mod manifest;
pub mod registry;

pub use endpoint::{
    EndpointInstance, EndpointSelection, EndpointType, OperationContext, PackageDeclaration,
    PackageRegistrar, ReviewPackage, CORE_VERSION,
};
pub use error::PackageSystemError;
pub use loader::PackageLoader;
pub use manager::{DefaultPackageManager, LoadedEndpoint, PackageManager};
pub use manifest::{PackageIndex, PackageManifest};
pub use registry::{PackageEntry, PackageRegistry, PackageSource, PackageSummary};

#[cfg(test)]
mod tests;
