use std::sync::Arc;

use parking_lot::Mutex;

use super::*;
use crate::test_utils::snapshot;
use crate::CacheEvent;
use crate::CacheEventType;

fn recorder() -> (
    Arc<Mutex<Vec<CacheEventType>>>,
    impl Fn(&CacheEvent<u32>) + Send + Sync,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |event: &CacheEvent<u32>| {
        sink.lock().push(event.event_type())
    })
}

#[test]
fn closures_are_cache_listeners() {
    let (seen, listener) = recorder();
    listener.event(&CacheEvent::new(CacheEventType::NodeAdded, Some(snapshot("/p/1", Some(1)))));
    assert_eq!(*seen.lock(), vec![CacheEventType::NodeAdded]);
}

#[test]
fn filtered_forwards_matching_events_only() {
    let (seen, listener) = recorder();
    let listener = listener.filtered(node_events::<u32>);

    listener.event(&CacheEvent::new(CacheEventType::ConnectionSuspended, None));
    listener.event(&CacheEvent::new(CacheEventType::NodeRemoved, Some(snapshot("/p/1", Some(1)))));

    assert_eq!(*seen.lock(), vec![CacheEventType::NodeRemoved]);
}

#[test]
fn has_payload_skips_undecodable_nodes() {
    let (seen, listener) = recorder();
    let listener = listener.filtered(has_payload::<u32>);

    listener.event(&CacheEvent::new(CacheEventType::NodeAdded, Some(snapshot("/p/1", None))));
    listener.event(&CacheEvent::new(CacheEventType::NodeUpdated, Some(snapshot("/p/1", Some(2)))));

    assert_eq!(*seen.lock(), vec![CacheEventType::NodeUpdated]);
}

#[test]
fn post_initialized_only_waits_for_initialized() {
    let (seen, listener) = recorder();
    let listener = listener.post_initialized_only();

    listener.event(&CacheEvent::new(CacheEventType::NodeAdded, Some(snapshot("/p/1", Some(1)))));
    listener.event(&CacheEvent::new(CacheEventType::Initialized, None));
    listener.event(&CacheEvent::new(CacheEventType::NodeAdded, Some(snapshot("/p/2", Some(2)))));

    assert_eq!(*seen.lock(), vec![CacheEventType::NodeAdded]);
}
