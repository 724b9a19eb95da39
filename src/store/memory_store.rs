use std::collections::BTreeMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use bytes::Bytes;
use crossbeam_channel::unbounded;
use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::debug;
use tracing::trace;

use super::Stat;
use crate::RawNode;
use crate::Result;
use crate::StoreError;
use crate::ZPath;

/// Session state between a client and the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Connected,
    /// Connection interrupted; the session may still be recovered
    Suspended,
    /// Connection re-established after a suspension
    Reconnected,
    /// Session expired
    Lost,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Reconnected)
    }
}

/// Change notification broadcast to store subscribers, in zxid order
#[derive(Debug, Clone)]
pub enum StoreEvent {
    NodeCreated { zxid: u64, node: RawNode },
    NodeDataChanged { zxid: u64, node: RawNode },
    /// Carries the node as it was right before deletion
    NodeDeleted { zxid: u64, node: RawNode },
    ConnectionStateChanged { state: ConnectionState },
}

impl StoreEvent {
    pub fn zxid(&self) -> Option<u64> {
        match self {
            StoreEvent::NodeCreated { zxid, .. }
            | StoreEvent::NodeDataChanged { zxid, .. }
            | StoreEvent::NodeDeleted { zxid, .. } => Some(*zxid),
            StoreEvent::ConnectionStateChanged { .. } => None,
        }
    }

    pub fn node(&self) -> Option<&RawNode> {
        match self {
            StoreEvent::NodeCreated { node, .. }
            | StoreEvent::NodeDataChanged { node, .. }
            | StoreEvent::NodeDeleted { node, .. } => Some(node),
            StoreEvent::ConnectionStateChanged { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredNode {
    data: Bytes,
    stat: Stat,
}

#[derive(Debug)]
struct Subscriber {
    id: u64,
    sender: Sender<StoreEvent>,
}

#[derive(Debug)]
struct StoreState {
    nodes: BTreeMap<ZPath, StoredNode>,
    last_zxid: u64,
    connection: ConnectionState,
    subscribers: Vec<Subscriber>,
}

impl StoreState {
    fn ensure_connected(&self) -> Result<()> {
        if self.connection.is_connected() {
            Ok(())
        } else {
            Err(StoreError::ConnectionLoss.into())
        }
    }

    fn next_zxid(&mut self) -> u64 {
        self.last_zxid += 1;
        self.last_zxid
    }

    fn raw(
        &self,
        path: &ZPath,
    ) -> Option<RawNode> {
        self.nodes.get(path).map(|node| RawNode {
            path: path.clone(),
            data: Some(node.data.clone()),
            stat: node.stat,
        })
    }

    /// Deliver an event to every live subscriber, pruning dropped receivers.
    ///
    /// Called with the state lock held so subscribers observe zxid order.
    fn broadcast(
        &mut self,
        event: StoreEvent,
    ) {
        self.subscribers
            .retain(|subscriber| subscriber.sender.send(event.clone()).is_ok());
        trace!(
            zxid = ?event.zxid(),
            subscribers = self.subscribers.len(),
            "Store event broadcast"
        );
    }
}

/// In-process hierarchical coordination store
///
/// Cloning yields another handle to the same store. Every successful mutation
/// is assigned the next zxid and broadcast to subscribers while the store
/// lock is held, so all subscribers see mutations in the same order.
///
/// # Example
///
/// ```ignore
/// let store = MemoryStore::new();
/// let path = ZPath::parse("/app/config")?;
/// store.create_with_parents(&path, Bytes::from_static(b"v1"))?;
/// let (data, stat) = store.get_data(&path)?;
/// store.set_data(&path, Bytes::from_static(b"v2"), Some(stat.version))?;
/// ```
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
    next_subscriber_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryStore")
            .field("nodes", &state.nodes.len())
            .field("last_zxid", &state.last_zxid)
            .field("connection", &state.connection)
            .finish_non_exhaustive()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store containing only the root node
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            ZPath::root(),
            StoredNode {
                data: Bytes::new(),
                stat: Stat::default(),
            },
        );
        Self {
            state: Arc::new(Mutex::new(StoreState {
                nodes,
                last_zxid: 0,
                connection: ConnectionState::Connected,
                subscribers: Vec::new(),
            })),
            next_subscriber_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Create a node; its parent must exist.
    pub fn create(
        &self,
        path: &ZPath,
        data: Bytes,
    ) -> Result<Stat> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        Self::create_locked(&mut state, path, data)
    }

    /// Create a node, creating missing ancestors with empty payloads first.
    pub fn create_with_parents(
        &self,
        path: &ZPath,
        data: Bytes,
    ) -> Result<Stat> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        for ancestor in path.ancestors() {
            if !state.nodes.contains_key(&ancestor) {
                Self::create_locked(&mut state, &ancestor, Bytes::new())?;
            }
        }
        Self::create_locked(&mut state, path, data)
    }

    fn create_locked(
        state: &mut StoreState,
        path: &ZPath,
        data: Bytes,
    ) -> Result<Stat> {
        if path.is_root() || state.nodes.contains_key(path) {
            return Err(StoreError::NodeExists(path.clone()).into());
        }
        let parent_path = path
            .parent()
            .ok_or_else(|| StoreError::NodeExists(path.clone()))?;
        if !state.nodes.contains_key(&parent_path) {
            return Err(StoreError::NoNode(parent_path).into());
        }

        let zxid = state.next_zxid();
        let now = now_millis();
        let stat = Stat {
            czxid: zxid,
            mzxid: zxid,
            pzxid: zxid,
            ctime: now,
            mtime: now,
            version: 0,
            cversion: 0,
            data_length: data.len() as u32,
            num_children: 0,
        };
        state.nodes.insert(path.clone(), StoredNode { data, stat });

        if let Some(parent) = state.nodes.get_mut(&parent_path) {
            parent.stat.cversion += 1;
            parent.stat.num_children += 1;
            parent.stat.pzxid = zxid;
        }

        if let Some(node) = state.raw(path) {
            state.broadcast(StoreEvent::NodeCreated { zxid, node });
        }
        debug!(path = %path, zxid, "Node created");
        Ok(stat)
    }

    /// Replace a node's payload.
    ///
    /// With `expected_version`, fails with `BadVersion` unless it matches the
    /// node's current data version.
    pub fn set_data(
        &self,
        path: &ZPath,
        data: Bytes,
        expected_version: Option<i32>,
    ) -> Result<Stat> {
        let mut state = self.state.lock();
        state.ensure_connected()?;

        let current = state
            .nodes
            .get(path)
            .ok_or_else(|| StoreError::NoNode(path.clone()))?
            .stat;
        check_version(path, expected_version, current.version)?;

        let zxid = state.next_zxid();
        let stat = Stat {
            mzxid: zxid,
            mtime: now_millis(),
            version: current.version + 1,
            data_length: data.len() as u32,
            ..current
        };
        state.nodes.insert(path.clone(), StoredNode { data, stat });

        if let Some(node) = state.raw(path) {
            state.broadcast(StoreEvent::NodeDataChanged { zxid, node });
        }
        debug!(path = %path, zxid, version = stat.version, "Node data changed");
        Ok(stat)
    }

    /// Delete a childless node.
    pub fn delete(
        &self,
        path: &ZPath,
        expected_version: Option<i32>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_connected()?;

        if path.is_root() {
            return Err(StoreError::InvalidOperation("the root node cannot be deleted".into()).into());
        }
        let current = state
            .nodes
            .get(path)
            .ok_or_else(|| StoreError::NoNode(path.clone()))?
            .stat;
        check_version(path, expected_version, current.version)?;
        if current.num_children > 0 {
            return Err(StoreError::NotEmpty(path.clone()).into());
        }

        let last = state.raw(path);
        state.nodes.remove(path);
        let zxid = state.next_zxid();
        if let Some(parent) = path.parent().and_then(|p| state.nodes.get_mut(&p)) {
            parent.stat.cversion += 1;
            parent.stat.num_children = parent.stat.num_children.saturating_sub(1);
            parent.stat.pzxid = zxid;
        }

        if let Some(node) = last {
            state.broadcast(StoreEvent::NodeDeleted { zxid, node });
        }
        debug!(path = %path, zxid, "Node deleted");
        Ok(())
    }

    pub fn get_data(
        &self,
        path: &ZPath,
    ) -> Result<(Bytes, Stat)> {
        let state = self.state.lock();
        state.ensure_connected()?;
        state
            .nodes
            .get(path)
            .map(|node| (node.data.clone(), node.stat))
            .ok_or_else(|| StoreError::NoNode(path.clone()).into())
    }

    pub fn exists(
        &self,
        path: &ZPath,
    ) -> Result<Option<Stat>> {
        let state = self.state.lock();
        state.ensure_connected()?;
        Ok(state.nodes.get(path).map(|node| node.stat))
    }

    /// Names of the node's children, sorted
    pub fn get_children(
        &self,
        path: &ZPath,
    ) -> Result<Vec<String>> {
        let state = self.state.lock();
        state.ensure_connected()?;
        if !state.nodes.contains_key(path) {
            return Err(StoreError::NoNode(path.clone()).into());
        }
        Ok(state
            .nodes
            .keys()
            .filter(|candidate| candidate.is_child_of(path))
            .map(|child| child.name().to_string())
            .collect())
    }

    /// Current raw node together with the zxid it is consistent with
    pub fn read_node(
        &self,
        path: &ZPath,
    ) -> Result<(Option<RawNode>, u64)> {
        let state = self.state.lock();
        state.ensure_connected()?;
        Ok((state.raw(path), state.last_zxid))
    }

    /// Current raw children (path-sorted) together with the zxid they are
    /// consistent with
    pub fn read_children(
        &self,
        path: &ZPath,
    ) -> Result<(Vec<RawNode>, u64)> {
        let state = self.state.lock();
        state.ensure_connected()?;
        let children = state
            .nodes
            .keys()
            .filter(|candidate| candidate.is_child_of(path))
            .filter_map(|child| state.raw(child))
            .collect();
        Ok((children, state.last_zxid))
    }

    /// Register for every future store event.
    ///
    /// Returns the subscription id (for [`MemoryStore::unsubscribe`]) and the
    /// receiving end of an unbounded channel.
    pub fn subscribe(&self) -> (u64, Receiver<StoreEvent>) {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = unbounded();
        self.state.lock().subscribers.push(Subscriber { id, sender });
        trace!(subscriber_id = id, "Store subscriber registered");
        (id, receiver)
    }

    pub fn unsubscribe(
        &self,
        id: u64,
    ) {
        self.state.lock().subscribers.retain(|subscriber| subscriber.id != id);
        trace!(subscriber_id = id, "Store subscriber removed");
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.lock().connection
    }

    /// Simulate a session transition and notify subscribers.
    ///
    /// While suspended or lost, every operation fails with `ConnectionLoss`.
    pub fn set_connection_state(
        &self,
        connection: ConnectionState,
    ) {
        let mut state = self.state.lock();
        if state.connection == connection {
            return;
        }
        state.connection = connection;
        state.broadcast(StoreEvent::ConnectionStateChanged { state: connection });
        debug!(state = ?connection, "Connection state changed");
    }

    pub fn last_zxid(&self) -> u64 {
        self.state.lock().last_zxid
    }
}

fn check_version(
    path: &ZPath,
    expected: Option<i32>,
    actual: i32,
) -> Result<()> {
    match expected {
        Some(expected) if expected != actual => Err(StoreError::BadVersion {
            path: path.clone(),
            expected,
            actual,
        }
        .into()),
        _ => Ok(()),
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
