pub mod event;
pub mod kernel;
pub mod package_system;
pub mod record;
pub mod stage_manager;
pub mod storage;

// Re-export key public types for the binary and for packages
pub use event::{Event, EventManager, ReviewEvent};
pub use kernel::error::Error as KernelError;
pub use kernel::Application;
pub use package_system::{
    EndpointInstance, EndpointSelection, EndpointType, OperationContext, PackageDeclaration,
    PackageManager, PackageRegistrar, ReviewPackage, CORE_VERSION,
};
pub use record::{Record, RecordState};
pub use stage_manager::StageManager;
pub use storage::{StorageManager, StorageProvider};
