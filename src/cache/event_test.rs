use super::*;
use crate::RawChildrenEventType;

#[test]
fn raw_event_types_map_one_to_one() {
    let cases = [
        (RawChildrenEventType::ChildAdded, CacheEventType::NodeAdded),
        (RawChildrenEventType::ChildUpdated, CacheEventType::NodeUpdated),
        (RawChildrenEventType::ChildRemoved, CacheEventType::NodeRemoved),
        (RawChildrenEventType::Initialized, CacheEventType::Initialized),
        (RawChildrenEventType::ConnectionSuspended, CacheEventType::ConnectionSuspended),
        (RawChildrenEventType::ConnectionReconnected, CacheEventType::ConnectionReconnected),
        (RawChildrenEventType::ConnectionLost, CacheEventType::ConnectionLost),
    ];
    for (raw, expected) in cases {
        assert_eq!(CacheEventType::from(raw), expected);
    }
}

#[test]
fn only_node_events_are_node_events() {
    assert!(CacheEventType::NodeRemoved.is_node_event());
    assert!(!CacheEventType::Initialized.is_node_event());
    assert!(!CacheEventType::ConnectionLost.is_node_event());
    assert!(CacheEventType::ConnectionLost.is_connection_event());
    assert!(!CacheEventType::NodeAdded.is_connection_event());
}
