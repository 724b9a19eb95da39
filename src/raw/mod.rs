//! Raw cache adapters
//!
//! A raw adapter keeps the byte-level state of one node, or of one node's
//! children, in sync with the store and tells its listeners about changes.
//! The typed caches consume adapters only through [`RawNodeCache`] and
//! [`RawChildrenCache`]:
//!
//! ```text
//! MemoryStore ──events──▶ dispatch thread ──apply──▶ raw state (ArcSwap)
//!                               │
//!                               └──notify──▶ raw listeners (typed caches)
//! ```
//!
//! Adapter guarantees relied upon by the typed layer:
//! - one dispatch thread per adapter, notifications in store order
//! - raw state is applied before listeners are notified
//! - state accessors are lock-free and callable from any thread
//! - after `close()` the state is frozen and no listener fires

mod children_cache;
mod dispatcher;
mod node_cache;

pub use children_cache::*;
pub use node_cache::*;

#[cfg(test)]
mod children_cache_test;

use bytes::Bytes;
#[cfg(test)]
use mockall::automock;

use crate::ConnectionState;
use crate::ListenerHandle;
use crate::Result;
use crate::Stat;
use crate::ZPath;

/// Byte-level view of one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNode {
    pub path: ZPath,
    /// `None` when the adapter does not retain payloads
    pub data: Option<Bytes>,
    pub stat: Stat,
}

/// How a children cache loads its initial state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StartMode {
    /// Return immediately; pre-existing children arrive as `ChildAdded` events
    Normal,
    /// Load children before `start` returns; no events for them
    BuildInitialCache,
    /// Like `Normal`, followed by one `Initialized` event
    PostInitializedEvent,
}

/// Classification of a raw children notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawChildrenEventType {
    ChildAdded,
    ChildUpdated,
    ChildRemoved,
    Initialized,
    ConnectionSuspended,
    ConnectionReconnected,
    ConnectionLost,
}

impl RawChildrenEventType {
    pub(crate) fn from_connection(state: ConnectionState) -> Option<Self> {
        match state {
            ConnectionState::Connected => None,
            ConnectionState::Suspended => Some(Self::ConnectionSuspended),
            ConnectionState::Reconnected => Some(Self::ConnectionReconnected),
            ConnectionState::Lost => Some(Self::ConnectionLost),
        }
    }
}

/// Raw children notification
///
/// `data` is the child after the change, or right before removal for
/// `ChildRemoved`; absent for `Initialized` and connection events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChildrenEvent {
    pub event_type: RawChildrenEventType,
    pub data: Option<RawNode>,
}

/// Content-free "node changed" callback
pub type RawNodeListener = Box<dyn Fn() + Send + Sync>;

/// Children change callback
pub type RawChildrenListener = Box<dyn Fn(&RawChildrenEvent) + Send + Sync>;

/// Raw adapter for a single node
#[cfg_attr(test, automock)]
pub trait RawNodeCache: Send + Sync + 'static {
    /// Begin watching; with `build_initial`, block until the node is read.
    fn start(
        &self,
        build_initial: bool,
    ) -> Result<()>;

    /// Stop watching and release the dispatch thread. Idempotent.
    fn close(&self) -> Result<()>;

    /// Node as currently known, `None` if it does not exist (or is not yet read)
    fn current_raw(&self) -> Option<RawNode>;

    /// Listener invoked on the dispatch thread after each applied change
    fn register_raw_listener(
        &self,
        listener: RawNodeListener,
    ) -> ListenerHandle;

    fn unregister_raw_listener(
        &self,
        handle: &ListenerHandle,
    ) -> bool;
}

/// Raw adapter for the children of a node
#[cfg_attr(test, automock)]
pub trait RawChildrenCache: Send + Sync + 'static {
    fn start(
        &self,
        mode: StartMode,
    ) -> Result<()>;

    fn close(&self) -> Result<()>;

    /// Children as currently known, path-sorted
    fn current_raw_children(&self) -> Vec<RawNode>;

    fn current_raw_child(
        &self,
        path: &ZPath,
    ) -> Option<RawNode>;

    fn register_raw_listener(
        &self,
        listener: RawChildrenListener,
    ) -> ListenerHandle;

    fn unregister_raw_listener(
        &self,
        handle: &ListenerHandle,
    ) -> bool;
}
