use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::event::dispatcher::{create_dispatcher, sync_event_handler, sync_typed_handler, EventDispatcher};
use crate::event::types::TestEvent;
use crate::event::{Event, EventResult};

#[tokio::test]
async fn test_handler_registration_and_dispatch() {
    let mut dispatcher = EventDispatcher::new();
    let counter = Arc::new(AtomicU32::new(0));

    let counter_clone = Arc::clone(&counter);
    let handler_fn = sync_event_handler(move |event: &dyn Event| {
        assert_eq!(event.name(), "test.event");
        counter_clone.fetch_add(1, Ordering::SeqCst);
        EventResult::Continue
    });

    let handler_id = dispatcher.register_handler("test.event", handler_fn);
    assert!(handler_id > 0, "Handler ID should be positive");

    let event = TestEvent::new("test.event");
    let result = dispatcher.dispatch_internal(&event).await;
    assert_eq!(result, EventResult::Continue);
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    // A different event name should not trigger the handler
    let other = TestEvent::new("other.event");
    dispatcher.dispatch_internal(&other).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_handler_unregistration() {
    let mut dispatcher = EventDispatcher::new();
    let counter = Arc::new(AtomicU32::new(0));

    let counter_clone = Arc::clone(&counter);
    let handler_fn = sync_event_handler(move |_event: &dyn Event| {
        counter_clone.fetch_add(1, Ordering::SeqCst);
        EventResult::Continue
    });

    let handler_id = dispatcher.register_handler("test.event", handler_fn);
    assert!(dispatcher.unregister_handler(handler_id));
    assert!(!dispatcher.unregister_handler(handler_id));

    let event = TestEvent::new("test.event");
    dispatcher.dispatch_internal(&event).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_typed_handler_dispatch() {
    let mut dispatcher = EventDispatcher::new();
    let counter = Arc::new(AtomicU32::new(0));

    let counter_clone = Arc::clone(&counter);
    let handler_fn = sync_typed_handler(move |_event: &TestEvent| {
        counter_clone.fetch_add(1, Ordering::SeqCst);
        EventResult::Continue
    });
    dispatcher.register_type_handler::<TestEvent>(handler_fn);

    let event = TestEvent::new("anything.goes");
    dispatcher.dispatch_internal(&event).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stop_halts_propagation() {
    let mut dispatcher = EventDispatcher::new();
    let counter = Arc::new(AtomicU32::new(0));

    let first = sync_event_handler(|_event: &dyn Event| EventResult::Stop);
    dispatcher.register_handler("test.event", first);

    let counter_clone = Arc::clone(&counter);
    let second = sync_event_handler(move |_event: &dyn Event| {
        counter_clone.fetch_add(1, Ordering::SeqCst);
        EventResult::Continue
    });
    dispatcher.register_handler("test.event", second);

    let event = TestEvent::new("test.event");
    let result = dispatcher.dispatch_internal(&event).await;
    assert_eq!(result, EventResult::Stop);
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_queue_and_process() {
    let dispatcher = create_dispatcher();
    let counter = Arc::new(AtomicU32::new(0));

    let counter_clone = Arc::clone(&counter);
    let handler_fn = sync_event_handler(move |_event: &dyn Event| {
        counter_clone.fetch_add(1, Ordering::SeqCst);
        EventResult::Continue
    });
    dispatcher.register_handler("queued.event", handler_fn).await;

    dispatcher.queue_event(Box::new(TestEvent::new("queued.event"))).await;
    dispatcher.queue_event(Box::new(TestEvent::new("queued.event"))).await;
    assert_eq!(dispatcher.queue_size().await, 2);

    let processed = dispatcher.process_queue().await;
    assert_eq!(processed, 2);
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(dispatcher.queue_size().await, 0);
}
