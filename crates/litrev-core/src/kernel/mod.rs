//! # litrev Core Kernel
//!
//! The `kernel` module bootstraps the application and manages the lifecycle
//! of its core components:
//!
//! - **Application bootstrapping** via [`Application`](bootstrap::Application).
//! - **Component lifecycle** via the [`KernelComponent`](component::KernelComponent)
//!   trait and the [`DependencyRegistry`](component::DependencyRegistry).
//! - **Core constants** in the `constants` submodule.
//! - **Error handling** via [`Error`](error::Error) and the `Result` alias.
pub mod bootstrap;
pub mod component;
pub mod constants;
pub mod error;

pub use bootstrap::Application;
pub use component::{DependencyRegistry, KernelComponent};
pub use error::{Error, Result};
