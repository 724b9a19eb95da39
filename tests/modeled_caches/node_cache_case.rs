//! Single-node cache over a live store.
//!
//! 1. Start a typed node cache on `/test/path` before the node exists.
//! 2. Create, update, then delete the node through the typed store.
//!
//! Expected Result:
//!
//! - Exactly one signal per mutation, three in total.
//! - After creation the snapshot carries the created model and stat.
//! - After deletion the cache reports no node.

use modeled_cache::CacheState;
use modeled_cache::ModeledNodeCache;
use modeled_cache::NodeCache;

use crate::common::json_codec;
use crate::common::modeled_store;
use crate::common::TestModel;
use crate::common::EVENT_TIMEOUT;
use crate::common::QUIET_PERIOD;
use crate::enable_logger;

#[test]
fn test_modeled_node_cache() {
    enable_logger();
    let (store, client) = modeled_store("/test/path");

    let cache = ModeledNodeCache::wrap(NodeCache::new(store.clone(), client.path().clone()), json_codec());
    let signals = cache.subscribe().unwrap();
    cache.start(true).unwrap();
    assert!(cache.current_data().unwrap().is_none());

    let model = TestModel::new("a", "b", "c", 20, 100);
    let stat = client.create(&model).unwrap();
    assert!(signals.recv_timeout(EVENT_TIMEOUT).is_some());

    let snapshot = cache.current_data().unwrap().unwrap();
    assert_eq!(snapshot.path(), client.path());
    assert_eq!(snapshot.data(), Some(&model));
    assert_eq!(snapshot.stat(), &stat);

    let updated = TestModel::new("a", "b", "c", 21, 150);
    client.update_with_version(&updated, Some(stat.version)).unwrap();
    assert!(signals.recv_timeout(EVENT_TIMEOUT).is_some());
    assert_eq!(cache.current_data().unwrap().unwrap().data(), Some(&updated));

    client.delete().unwrap();
    assert!(signals.recv_timeout(EVENT_TIMEOUT).is_some());
    assert!(signals.recv_timeout(QUIET_PERIOD).is_none());
    assert!(cache.current_data().unwrap().is_none());

    cache.close().unwrap();
    assert_eq!(cache.state(), CacheState::Closed);
    assert_eq!(store.subscriber_count(), 0);
}

#[test]
fn test_stale_version_update_is_rejected_and_not_signalled() {
    let (store, client) = modeled_store("/test/path");
    let stat = client.create(&TestModel::new("a", "b", "c", 1, 1)).unwrap();

    let cache = ModeledNodeCache::wrap(NodeCache::new(store.clone(), client.path().clone()), json_codec());
    let signals = cache.subscribe().unwrap();
    cache.start(true).unwrap();

    client.update(&TestModel::new("a", "b", "c", 2, 1)).unwrap();
    assert!(signals.recv_timeout(EVENT_TIMEOUT).is_some());

    assert!(client
        .update_with_version(&TestModel::new("a", "b", "c", 3, 1), Some(stat.version))
        .is_err());
    assert!(signals.recv_timeout(QUIET_PERIOD).is_none());
    assert_eq!(cache.current_data().unwrap().unwrap().stat().version, 1);
    cache.close().unwrap();
}
