use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use async_trait::async_trait;
use crate::kernel::error::Result;

/// Core lifecycle trait implemented by every kernel component
#[async_trait]
pub trait KernelComponent: Any + Send + Sync + Debug {
    fn name(&self) -> &'static str;
    async fn initialize(&self) -> Result<()>;
    async fn start(&self) -> Result<()>;
    async fn stop(&self) -> Result<()>;
}

/// Registry storing components as `Arc<dyn KernelComponent>` keyed by the
/// concrete type's `TypeId`.
#[derive(Default, Debug)]
pub struct DependencyRegistry {
    instances: HashMap<TypeId, Arc<dyn KernelComponent>>,
}

impl DependencyRegistry {
    /// Create a new empty dependency registry
    pub fn new() -> Self {
        Self {
            instances: HashMap::new(),
        }
    }

    /// Register a component instance, keyed by the TypeId of the concrete type V.
    pub fn register_instance<V>(&mut self, instance: Arc<V>)
    where
        V: KernelComponent + 'static,
    {
        let type_id = TypeId::of::<V>();
        self.instances.insert(type_id, instance);
    }

    /// Get a component instance by the TypeId of its concrete type.
    pub fn get_component_by_id(&self, type_id: &TypeId) -> Option<Arc<dyn KernelComponent>> {
        self.instances.get(type_id).cloned()
    }

    /// Get a component instance by concrete type T.
    pub fn get_concrete<T: KernelComponent + 'static>(&self) -> Option<Arc<T>> {
        let type_id = TypeId::of::<T>();
        self.instances
            .get(&type_id)
            .and_then(|arc_kc| {
                // KernelComponent: Any, so the Arc can be downcast to the
                // concrete type it was registered under.
                let arc_any: Arc<dyn Any + Send + Sync> = arc_kc.clone();
                Arc::downcast::<T>(arc_any).ok()
            })
    }

    /// Get all registered component trait objects.
    pub fn get_all_components(&self) -> Vec<Arc<dyn KernelComponent>> {
        self.instances.values().cloned().collect()
    }

    /// Get TypeIds of all registered components.
    pub fn get_registered_ids(&self) -> Vec<TypeId> {
        self.instances.keys().cloned().collect()
    }

    /// Clear all instances.
    pub fn clear(&mut self) {
        self.instances.clear();
    }
}
