use crate::event::EventId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventSystemError {
    #[error("Failed to register event handler for event name '{event_name}': {reason}")]
    HandlerRegistrationFailed {
        event_name: String,
        reason: String,
    },

    #[error("Failed to unregister event handler with ID {id}: {reason}")]
    HandlerUnregistrationFailed {
        id: EventId,
        reason: String,
    },

    #[error("Event dispatch failed for event '{event_name}': {reason}")]
    DispatchError {
        event_name: String,
        reason: String,
    },

    #[error("Event queue operation '{operation}' failed: {reason}")]
    QueueOperationFailed {
        operation: String,
        reason: String,
    },

    #[error("Internal event system error: {0}")]
    InternalError(String),
}
