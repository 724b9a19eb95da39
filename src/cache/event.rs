use crate::NodeSnapshot;
use crate::RawChildrenEventType;

/// Classification of a children cache event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheEventType {
    NodeAdded,
    NodeUpdated,
    /// The event's node is the last known state before removal
    NodeRemoved,
    /// Initial children have all been reported (`PostInitializedEvent` only)
    Initialized,
    ConnectionSuspended,
    ConnectionReconnected,
    ConnectionLost,
}

impl CacheEventType {
    /// Whether events of this type carry a node
    pub fn is_node_event(&self) -> bool {
        matches!(
            self,
            CacheEventType::NodeAdded | CacheEventType::NodeUpdated | CacheEventType::NodeRemoved
        )
    }

    pub fn is_connection_event(&self) -> bool {
        matches!(
            self,
            CacheEventType::ConnectionSuspended
                | CacheEventType::ConnectionReconnected
                | CacheEventType::ConnectionLost
        )
    }
}

impl From<RawChildrenEventType> for CacheEventType {
    fn from(raw: RawChildrenEventType) -> Self {
        match raw {
            RawChildrenEventType::ChildAdded => CacheEventType::NodeAdded,
            RawChildrenEventType::ChildUpdated => CacheEventType::NodeUpdated,
            RawChildrenEventType::ChildRemoved => CacheEventType::NodeRemoved,
            RawChildrenEventType::Initialized => CacheEventType::Initialized,
            RawChildrenEventType::ConnectionSuspended => CacheEventType::ConnectionSuspended,
            RawChildrenEventType::ConnectionReconnected => CacheEventType::ConnectionReconnected,
            RawChildrenEventType::ConnectionLost => CacheEventType::ConnectionLost,
        }
    }
}

/// One typed children notification
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEvent<T> {
    event_type: CacheEventType,
    node: Option<NodeSnapshot<T>>,
}

impl<T> CacheEvent<T> {
    pub fn new(
        event_type: CacheEventType,
        node: Option<NodeSnapshot<T>>,
    ) -> Self {
        Self { event_type, node }
    }

    pub fn event_type(&self) -> CacheEventType {
        self.event_type
    }

    /// Affected node; `None` for `Initialized` and connection events
    pub fn node(&self) -> Option<&NodeSnapshot<T>> {
        self.node.as_ref()
    }

    pub fn into_node(self) -> Option<NodeSnapshot<T>> {
        self.node
    }
}
