//! Children cache over a live store.
//!
//! 1. Start a typed children cache on `/test/path` with `BuildInitialCache`.
//! 2. Create model A at child "1" and model B at child "2".
//! 3. Delete "1", then update "2" to model C.
//! 4. Remove the listener and delete "2".
//!
//! Expected Result:
//!
//! - ADDED(1, A), ADDED(2, B), REMOVED(1, A), UPDATED(2, C) in that order.
//! - Nothing is delivered to the removed listener; a listener that stays
//!   registered still sees REMOVED(2).

use std::sync::Arc;

use modeled_cache::CacheEvent;
use modeled_cache::CacheEventType;
use modeled_cache::ModeledPathChildrenCache;
use modeled_cache::PathChildrenCache;
use modeled_cache::StartMode;
use modeled_cache::ZPath;
use parking_lot::Mutex;

use crate::common::json_codec;
use crate::common::wait_until;
use crate::common::modeled_store;
use crate::common::TestModel;
use crate::common::EVENT_TIMEOUT;
use crate::common::QUIET_PERIOD;
use crate::enable_logger;

#[test]
fn test_modeled_children_cache() {
    enable_logger();
    let (store, client) = modeled_store("/test/path");

    let cache = ModeledPathChildrenCache::wrap(
        PathChildrenCache::new(store.clone(), client.path().clone()),
        json_codec(),
    );
    let (tx, rx) = crossbeam_channel::unbounded();
    // Kept here so the channel outlives the listener's removal
    let sender = tx.clone();
    let handle = cache
        .add_listener(move |event: &CacheEvent<TestModel>| {
            let _ = sender.send(event.clone());
        })
        .unwrap();
    let watcher_seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&watcher_seen);
    cache
        .add_listener(move |event: &CacheEvent<TestModel>| sink.lock().push(event.event_type()))
        .unwrap();
    cache.start(StartMode::BuildInitialCache).unwrap();

    let a = TestModel::new("a", "b", "c", 1, 10);
    let b = TestModel::new("d", "e", "f", 10, 1);
    let c = TestModel::new("g", "h", "i", 100, 100);

    client.at("1").unwrap().create(&a).unwrap();
    client.at("2").unwrap().create(&b).unwrap();
    client.at("1").unwrap().delete().unwrap();
    client.at("2").unwrap().update(&c).unwrap();

    let expected = [
        (CacheEventType::NodeAdded, "1", &a),
        (CacheEventType::NodeAdded, "2", &b),
        (CacheEventType::NodeRemoved, "1", &a),
        (CacheEventType::NodeUpdated, "2", &c),
    ];
    for (event_type, name, model) in expected {
        let event = rx.recv_timeout(EVENT_TIMEOUT).unwrap();
        let node = event.node().unwrap();
        assert_eq!(event.event_type(), event_type);
        assert_eq!(node.path(), &client.path().at(name).unwrap());
        assert_eq!(node.data(), Some(model));
    }

    assert!(cache.remove_listener(&handle).unwrap());
    client.at("2").unwrap().delete().unwrap();

    assert!(wait_until(EVENT_TIMEOUT, || watcher_seen.lock().len() == 5));
    assert_eq!(watcher_seen.lock()[4], CacheEventType::NodeRemoved);
    assert!(cache.current_data().is_empty());
    assert!(matches!(
        rx.recv_timeout(QUIET_PERIOD),
        Err(crossbeam_channel::RecvTimeoutError::Timeout)
    ));
    drop(tx);
    cache.close().unwrap();
}

#[test]
fn test_listener_reads_reflect_the_triggering_event() {
    let (store, client) = modeled_store("/orders");
    let cache = Arc::new(ModeledPathChildrenCache::wrap(
        PathChildrenCache::new(store.clone(), client.path().clone()),
        json_codec(),
    ));

    let counts = Arc::new(Mutex::new(Vec::new()));
    let weak = Arc::downgrade(&cache);
    let sink = Arc::clone(&counts);
    cache
        .add_listener(move |_: &CacheEvent<TestModel>| {
            if let Some(cache) = weak.upgrade() {
                sink.lock().push(cache.current_data().len());
            }
        })
        .unwrap();
    // Writes must not race the initial load
    cache.start(StartMode::BuildInitialCache).unwrap();

    for name in ["1", "2", "3"] {
        client.at(name).unwrap().create(&TestModel::new(name, "x", "y", 1, 1)).unwrap();
    }
    client.at("2").unwrap().delete().unwrap();

    assert!(wait_until(EVENT_TIMEOUT, || counts.lock().len() == 4));
    assert_eq!(*counts.lock(), vec![1, 2, 3, 2]);
    assert_eq!(
        cache.current_data_at(&ZPath::parse("/orders/3").unwrap()).unwrap().data().map(|m| m.first_name.as_str()),
        Some("3")
    );
    cache.close().unwrap();
}
