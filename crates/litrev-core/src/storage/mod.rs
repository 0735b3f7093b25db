//! # litrev Core Storage System
//!
//! Project layout, settings and file persistence: a [`StorageProvider`]
//! abstraction with a local filesystem implementation, the
//! [`ProjectSettings`](settings::ProjectSettings) model, and the
//! [`DefaultStorageManager`](manager::DefaultStorageManager) component.
pub mod config;
pub mod error;
pub mod local;
pub mod manager;
pub mod provider;
pub mod settings;

pub use config::{ConfigData, ConfigFormat};
pub use local::LocalStorageProvider;
pub use manager::{DefaultStorageManager, StorageManager};
pub use provider::StorageProvider;
pub use settings::ProjectSettings;

// Test module declaration
#[cfg(test)]
mod tests;
