//! # litrev Core Kernel Errors
//!
//! Defines [`Error`], the aggregate error type for kernel operations, with
//! `#[from]` conversions for every subsystem error so that component code
//! can use `?` freely across subsystem boundaries.
use std::result::Result as StdResult;

use crate::event::error::EventSystemError;
use crate::package_system::error::PackageSystemError;
use crate::record::error::RecordError;
use crate::stage_manager::error::StageSystemError;
use crate::storage::error::StorageSystemError;
use thiserror::Error as ThisError;

/// Top-level error type for the litrev application
#[derive(Debug, ThisError)]
pub enum Error {
    /// Typed package system error
    #[error("Package system error: {0}")]
    PackageSystem(#[from] PackageSystemError),

    /// Typed stage system error
    #[error("Stage system error: {0}")]
    StageSystem(#[from] StageSystemError),

    /// Typed storage system error
    #[error("Storage system error: {0}")]
    StorageSystem(#[from] StorageSystemError),

    /// Typed event system error
    #[error("Event system error: {0}")]
    EventSystem(#[from] EventSystemError),

    /// Typed record model error
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    /// Error occurring during a specific kernel lifecycle phase.
    #[error("Kernel lifecycle error during {phase:?}: {message}")]
    KernelLifecycleError {
        phase: KernelLifecyclePhase,
        component_name: Option<String>,
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// A phase in the kernel's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelLifecyclePhase {
    Bootstrap,
    Initialize,
    Start,
    RunPreCheck,
    Shutdown,
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<std::io::Error> for Error {
    fn from(io_err: std::io::Error) -> Self {
        Error::StorageSystem(StorageSystemError::io(io_err, "unknown", None))
    }
}
