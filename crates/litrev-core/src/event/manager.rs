use std::sync::Arc;

use async_trait::async_trait;

use crate::event::dispatcher::{self, BoxFuture};
use crate::event::{Event, EventId, EventResult};
use crate::kernel::component::KernelComponent;
use crate::kernel::error::Result;

/// Type alias for a boxed event
pub type BoxedEvent = Box<dyn Event>;

/// Event manager interface
#[async_trait]
pub trait EventManager: KernelComponent + Send + Sync {
    /// Register a handler for events with a specific name
    async fn register_handler(
        &self,
        event_name: &'static str,
        handler: Box<dyn for<'a> Fn(&'a dyn Event) -> BoxFuture<'a> + Send + Sync>,
    ) -> EventId;

    /// Unregister a handler by its ID
    async fn unregister_handler(&self, id: EventId) -> bool;

    /// Dispatch an event to all matching handlers
    async fn dispatch(&self, event: &dyn Event) -> EventResult;

    /// Queue an event for deferred processing
    async fn queue_event(&self, event: BoxedEvent);

    /// Process all queued events
    async fn process_queue(&self) -> usize;
}

/// Default implementation of [`EventManager`]
#[derive(Clone, Debug)]
pub struct DefaultEventManager {
    name: &'static str,
    dispatcher: Arc<dispatcher::SharedEventDispatcher>,
}

impl DefaultEventManager {
    pub fn new() -> Self {
        Self {
            name: "DefaultEventManager",
            dispatcher: Arc::new(dispatcher::create_dispatcher()),
        }
    }

    /// Get a reference to the underlying dispatcher
    pub fn dispatcher(&self) -> &Arc<dispatcher::SharedEventDispatcher> {
        &self.dispatcher
    }

    /// Register a synchronous handler for events with a specific name
    pub async fn register_sync_handler<F>(&self, event_name: &'static str, handler: F) -> EventId
    where
        F: Fn(&dyn Event) -> EventResult + Send + Sync + 'static,
    {
        let async_handler = dispatcher::sync_event_handler(handler);
        self.register_handler(event_name, async_handler).await
    }

    /// Register a synchronous handler for events of a specific type
    pub async fn register_sync_type_handler<E, F>(&self, handler: F) -> EventId
    where
        E: Event + 'static,
        F: Fn(&E) -> EventResult + Send + Sync + 'static,
    {
        let async_handler = dispatcher::sync_typed_handler(handler);
        self.dispatcher.register_type_handler::<E>(async_handler).await
    }
}

#[async_trait]
impl KernelComponent for DefaultEventManager {
    fn name(&self) -> &'static str {
        self.name
    }
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }
    async fn start(&self) -> Result<()> {
        Ok(())
    }
    async fn stop(&self) -> Result<()> {
        self.process_queue().await;
        Ok(())
    }
}

#[async_trait]
impl EventManager for DefaultEventManager {
    async fn register_handler(
        &self,
        event_name: &'static str,
        handler: Box<dyn for<'a> Fn(&'a dyn Event) -> BoxFuture<'a> + Send + Sync>,
    ) -> EventId {
        self.dispatcher.register_handler(event_name, handler).await
    }

    async fn unregister_handler(&self, id: EventId) -> bool {
        self.dispatcher.unregister_handler(id).await
    }

    async fn dispatch(&self, event: &dyn Event) -> EventResult {
        self.dispatcher.dispatch(event).await
    }

    async fn queue_event(&self, event: BoxedEvent) {
        self.dispatcher.queue_event(event).await
    }

    async fn process_queue(&self) -> usize {
        self.dispatcher.process_queue().await
    }
}

impl Default for DefaultEventManager {
    fn default() -> Self {
        Self::new()
    }
}
