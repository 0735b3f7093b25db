use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::event::manager::{DefaultEventManager, EventManager};
use crate::event::types::ReviewEvent;
use crate::event::{Event, EventResult};
use crate::kernel::component::KernelComponent;
use crate::record::RecordState;

#[tokio::test]
async fn test_manager_dispatch_by_name() {
    let manager = DefaultEventManager::new();
    let counter = Arc::new(AtomicU32::new(0));

    let counter_clone = Arc::clone(&counter);
    manager
        .register_sync_handler("operation.begin", move |_event: &dyn Event| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            EventResult::Continue
        })
        .await;

    let event = ReviewEvent::OperationBegin { operation: "load".to_string() };
    manager.dispatch(&event).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_manager_typed_handler_sees_payload() {
    let manager = DefaultEventManager::new();
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));

    let seen_clone = Arc::clone(&seen);
    manager
        .register_sync_type_handler::<ReviewEvent, _>(move |event: &ReviewEvent| {
            if let ReviewEvent::RecordStatusChanged { record_id, .. } = event {
                seen_clone.lock().unwrap().push(record_id.clone());
            }
            EventResult::Continue
        })
        .await;

    let event = ReviewEvent::RecordStatusChanged {
        record_id: "Smith2020".to_string(),
        from: RecordState::MdRetrieved,
        to: RecordState::MdImported,
    };
    manager.dispatch(&event).await;
    assert_eq!(seen.lock().unwrap().as_slice(), ["Smith2020"]);
}

#[tokio::test]
async fn test_stop_drains_queue() {
    let manager = DefaultEventManager::new();
    let counter = Arc::new(AtomicU32::new(0));

    let counter_clone = Arc::clone(&counter);
    manager
        .register_sync_handler("package.loaded", move |_event: &dyn Event| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            EventResult::Continue
        })
        .await;

    manager
        .queue_event(Box::new(ReviewEvent::PackageLoaded {
            identifier: "json_import".to_string(),
            endpoint_type: "load_conversion".to_string(),
        }))
        .await;

    // Component stop flushes queued events
    KernelComponent::stop(&manager).await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}
