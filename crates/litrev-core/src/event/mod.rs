pub mod dispatcher;
pub mod error;
pub mod manager;
pub mod types;

use std::any::Any;
use std::fmt;

use async_trait::async_trait;

/// Type for event identifiers
pub type EventId = u64;

/// Event priority level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum EventPriority {
    /// Lowest priority, processed last
    Low = 0,
    /// Normal priority, processed in the middle
    #[default]
    Normal = 1,
    /// High priority, processed first
    High = 2,
    /// Critical priority, processed immediately
    Critical = 3,
}

/// Result of event processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Event was processed successfully and propagation should continue
    Continue,
    /// Event was processed and propagation should stop
    Stop,
}

/// Core event trait
pub trait Event: Any + fmt::Debug + Send + Sync {
    /// Get the name of this event
    fn name(&self) -> &'static str;

    /// Get event priority
    fn priority(&self) -> EventPriority {
        EventPriority::Normal
    }

    /// Clone this event
    fn clone_event(&self) -> Box<dyn Event>;

    /// Cast to Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Asynchronous event handler trait
#[async_trait]
pub trait AsyncEventHandler: Send + Sync {
    async fn handle(&self, event: &dyn Event) -> EventResult;
}

pub use dispatcher::{create_dispatcher, EventDispatcher, SharedEventDispatcher};
pub use error::EventSystemError;
pub use manager::{BoxedEvent, DefaultEventManager, EventManager};
pub use types::ReviewEvent;

#[cfg(test)]
mod tests;
