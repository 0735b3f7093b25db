use std::any::Any;

use crate::event::{Event, EventPriority};
use crate::record::RecordState;

/// Events emitted by the review workflow
#[derive(Debug, Clone)]
pub enum ReviewEvent {
    /// Application is starting
    ApplicationStart,
    /// Application is shutting down
    ApplicationShutdown,
    /// A review operation is beginning
    OperationBegin { operation: String },
    /// A review operation has completed
    OperationCompleted { operation: String, success: bool },
    /// A record changed state
    RecordStatusChanged {
        record_id: String,
        from: RecordState,
        to: RecordState,
    },
    /// A package endpoint was loaded and verified
    PackageLoaded {
        identifier: String,
        endpoint_type: String,
    },
}

impl Event for ReviewEvent {
    fn name(&self) -> &'static str {
        match self {
            ReviewEvent::ApplicationStart => "application.start",
            ReviewEvent::ApplicationShutdown => "application.shutdown",
            ReviewEvent::OperationBegin { .. } => "operation.begin",
            ReviewEvent::OperationCompleted { .. } => "operation.completed",
            ReviewEvent::RecordStatusChanged { .. } => "record.status_changed",
            ReviewEvent::PackageLoaded { .. } => "package.loaded",
        }
    }

    fn priority(&self) -> EventPriority {
        match self {
            ReviewEvent::ApplicationStart | ReviewEvent::ApplicationShutdown => {
                EventPriority::Critical
            }
            _ => EventPriority::Normal,
        }
    }

    fn clone_event(&self) -> Box<dyn Event> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
#[derive(Debug, Clone)]
pub struct TestEvent {
    name: String,
}

#[cfg(test)]
impl TestEvent {
    pub fn new(name: &str) -> Self {
        TestEvent { name: name.to_string() }
    }
}

#[cfg(test)]
impl Event for TestEvent {
    fn name(&self) -> &'static str {
        Box::leak(self.name.clone().into_boxed_str())
    }

    fn clone_event(&self) -> Box<dyn Event> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
