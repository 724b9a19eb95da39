use bytes::Bytes;
use crossbeam_channel::unbounded;
use crossbeam_channel::Receiver;

use super::*;
use crate::test_utils::zpath;
use crate::test_utils::EVENT_TIMEOUT;
use crate::test_utils::QUIET_PERIOD;
use crate::CacheConfig;
use crate::CacheState;
use crate::ConnectionState;
use crate::MemoryStore;

fn events(cache: &PathChildrenCache) -> Receiver<RawChildrenEvent> {
    let (tx, rx) = unbounded();
    cache.register_raw_listener(Box::new(move |event: &RawChildrenEvent| {
        let _ = tx.send(event.clone());
    }));
    rx
}

fn next(rx: &Receiver<RawChildrenEvent>) -> (RawChildrenEventType, Option<String>) {
    let event = rx.recv_timeout(EVENT_TIMEOUT).unwrap();
    (
        event.event_type,
        event.data.map(|node| node.path.name().to_string()),
    )
}

fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.create_with_parents(&zpath("/parent/1"), Bytes::from_static(b"a")).unwrap();
    store.create(&zpath("/parent/2"), Bytes::from_static(b"b")).unwrap();
    store
}

#[test]
fn build_initial_cache_loads_children_without_events() {
    let store = seeded_store();
    let cache = PathChildrenCache::new(store.clone(), zpath("/parent"));
    let rx = events(&cache);
    cache.start(StartMode::BuildInitialCache).unwrap();

    let children = cache.current_raw_children();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].path, zpath("/parent/1"));
    assert_eq!(children[1].data.as_deref(), Some(&b"b"[..]));
    assert!(rx.recv_timeout(QUIET_PERIOD).is_err());
}

#[test]
fn normal_mode_reports_existing_children_as_added() {
    let store = seeded_store();
    let cache = PathChildrenCache::new(store.clone(), zpath("/parent"));
    let rx = events(&cache);
    cache.start(StartMode::Normal).unwrap();

    assert_eq!(next(&rx), (RawChildrenEventType::ChildAdded, Some("1".into())));
    assert_eq!(next(&rx), (RawChildrenEventType::ChildAdded, Some("2".into())));
    assert!(rx.recv_timeout(QUIET_PERIOD).is_err());
}

#[test]
fn post_initialized_event_follows_initial_children() {
    let store = seeded_store();
    let cache = PathChildrenCache::new(store.clone(), zpath("/parent"));
    let rx = events(&cache);
    cache.start(StartMode::PostInitializedEvent).unwrap();

    assert_eq!(next(&rx).0, RawChildrenEventType::ChildAdded);
    assert_eq!(next(&rx).0, RawChildrenEventType::ChildAdded);
    assert_eq!(next(&rx), (RawChildrenEventType::Initialized, None));
}

#[test]
fn post_initialized_event_fires_for_empty_parent() {
    let store = MemoryStore::new();
    let cache = PathChildrenCache::new(store, zpath("/missing"));
    let rx = events(&cache);
    cache.start(StartMode::PostInitializedEvent).unwrap();

    assert_eq!(next(&rx), (RawChildrenEventType::Initialized, None));
}

#[test]
fn mutations_map_to_child_events() {
    let store = MemoryStore::new();
    let cache = PathChildrenCache::new(store.clone(), zpath("/parent"));
    let rx = events(&cache);
    cache.start(StartMode::BuildInitialCache).unwrap();

    store.create_with_parents(&zpath("/parent/1"), Bytes::from_static(b"a")).unwrap();
    assert_eq!(next(&rx), (RawChildrenEventType::ChildAdded, Some("1".into())));

    store.set_data(&zpath("/parent/1"), Bytes::from_static(b"b"), None).unwrap();
    let updated = rx.recv_timeout(EVENT_TIMEOUT).unwrap();
    assert_eq!(updated.event_type, RawChildrenEventType::ChildUpdated);
    assert_eq!(updated.data.unwrap().data.as_deref(), Some(&b"b"[..]));

    store.delete(&zpath("/parent/1"), None).unwrap();
    let removed = rx.recv_timeout(EVENT_TIMEOUT).unwrap();
    assert_eq!(removed.event_type, RawChildrenEventType::ChildRemoved);
    // Removal carries the last known state
    assert_eq!(removed.data.unwrap().data.as_deref(), Some(&b"b"[..]));

    assert!(cache.current_raw_children().is_empty());
}

#[test]
fn grandchildren_and_parent_are_not_children() {
    let store = MemoryStore::new();
    let cache = PathChildrenCache::new(store.clone(), zpath("/parent"));
    let rx = events(&cache);
    cache.start(StartMode::BuildInitialCache).unwrap();

    store.create(&zpath("/parent"), Bytes::new()).unwrap();
    store.create(&zpath("/parent/1"), Bytes::new()).unwrap();
    store.create(&zpath("/parent/1/deep"), Bytes::new()).unwrap();

    assert_eq!(next(&rx), (RawChildrenEventType::ChildAdded, Some("1".into())));
    assert!(rx.recv_timeout(QUIET_PERIOD).is_err());
    assert_eq!(cache.current_raw_children().len(), 1);
}

#[test]
fn without_cache_data_only_stats_are_retained() {
    let store = seeded_store();
    let mut config = CacheConfig::default();
    config.children.cache_data = false;
    let cache = PathChildrenCache::with_config(store.clone(), zpath("/parent"), config);
    let rx = events(&cache);
    cache.start(StartMode::BuildInitialCache).unwrap();

    let child = cache.current_raw_child(&zpath("/parent/1")).unwrap();
    assert!(child.data.is_none());
    assert_eq!(child.stat.data_length, 1);

    store.set_data(&zpath("/parent/1"), Bytes::from_static(b"zz"), None).unwrap();
    let updated = rx.recv_timeout(EVENT_TIMEOUT).unwrap();
    assert_eq!(updated.data.unwrap().data.as_deref(), Some(&b"zz"[..]));
    assert!(cache.current_raw_child(&zpath("/parent/1")).unwrap().data.is_none());

    store.delete(&zpath("/parent/1"), None).unwrap();
    let removed = rx.recv_timeout(EVENT_TIMEOUT).unwrap();
    assert_eq!(removed.data.unwrap().data.as_deref(), Some(&b"zz"[..]));
}

#[test]
fn connection_events_pass_through() {
    let store = seeded_store();
    let cache = PathChildrenCache::new(store.clone(), zpath("/parent"));
    let rx = events(&cache);
    cache.start(StartMode::BuildInitialCache).unwrap();

    store.set_connection_state(ConnectionState::Suspended);
    assert_eq!(next(&rx), (RawChildrenEventType::ConnectionSuspended, None));

    store.set_connection_state(ConnectionState::Reconnected);
    assert_eq!(next(&rx), (RawChildrenEventType::ConnectionReconnected, None));

    store.set_connection_state(ConnectionState::Lost);
    assert_eq!(next(&rx), (RawChildrenEventType::ConnectionLost, None));
    assert!(rx.recv_timeout(QUIET_PERIOD).is_err());
}

#[test]
fn close_freezes_children_and_stops_events() {
    let store = seeded_store();
    let cache = PathChildrenCache::new(store.clone(), zpath("/parent"));
    let rx = events(&cache);
    cache.start(StartMode::BuildInitialCache).unwrap();

    cache.close().unwrap();
    cache.close().unwrap();
    assert_eq!(cache.state(), CacheState::Closed);
    assert_eq!(store.subscriber_count(), 0);

    store.delete(&zpath("/parent/1"), None).unwrap();
    assert!(rx.recv_timeout(QUIET_PERIOD).is_err());
    assert_eq!(cache.current_raw_children().len(), 2);
    assert!(cache.start(StartMode::Normal).is_err());
}
