use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::dispatcher::Dispatcher;
use super::RawNode;
use super::RawNodeCache;
use super::RawNodeListener;
use crate::CacheConfig;
use crate::CacheError;
use crate::CacheState;
use crate::ConnectionState;
use crate::ListenerHandle;
use crate::ListenerRegistry;
use crate::MemoryStore;
use crate::Result;
use crate::StoreEvent;
use crate::ZPath;

static NEXT_NODE_CACHE_ID: AtomicU64 = AtomicU64::new(1);

type NodeSignal = dyn Fn() + Send + Sync;

struct NodeCacheInner {
    id: u64,
    store: MemoryStore,
    path: ZPath,

    /// Latest known node, swapped atomically by the dispatch thread
    state: ArcSwapOption<RawNode>,

    /// Highest zxid reflected in `state`
    applied_zxid: AtomicU64,

    closed: AtomicBool,
    listeners: ListenerRegistry<NodeSignal>,
}

impl NodeCacheInner {
    /// Apply one store event; returns true when the node changed
    fn apply(
        &self,
        event: StoreEvent,
    ) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        match event {
            StoreEvent::ConnectionStateChanged {
                state: ConnectionState::Reconnected,
            } => self.resync(),
            StoreEvent::ConnectionStateChanged { state } => {
                trace!(cache = self.id, ?state, "Connection state ignored by node cache");
                false
            }
            StoreEvent::NodeCreated { zxid, node } | StoreEvent::NodeDataChanged { zxid, node } => {
                if !self.accept(zxid, &node.path) {
                    return false;
                }
                self.state.store(Some(Arc::new(node)));
                true
            }
            StoreEvent::NodeDeleted { zxid, node } => {
                if !self.accept(zxid, &node.path) {
                    return false;
                }
                self.state.store(None);
                true
            }
        }
    }

    fn accept(
        &self,
        zxid: u64,
        path: &ZPath,
    ) -> bool {
        if *path != self.path || zxid <= self.applied_zxid.load(Ordering::Acquire) {
            return false;
        }
        self.applied_zxid.store(zxid, Ordering::Release);
        true
    }

    /// Read the node from the store; returns true when it differs from state
    fn resync(&self) -> bool {
        match self.store.read_node(&self.path) {
            Ok((node, zxid)) => {
                self.applied_zxid.fetch_max(zxid, Ordering::AcqRel);
                let current = self.state.load_full();
                if current.as_deref() == node.as_ref() {
                    return false;
                }
                self.state.store(node.map(Arc::new));
                true
            }
            Err(e) => {
                warn!(cache = self.id, path = %self.path, "Failed to read node: {}", e);
                false
            }
        }
    }

    fn notify(&self) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let invoked = self.listeners.dispatch(|listener| listener());
        trace!(cache = self.id, path = %self.path, listeners = invoked, "Node change dispatched");
    }
}

/// Raw adapter watching a single node of a [`MemoryStore`]
///
/// # Example
///
/// ```ignore
/// let cache = NodeCache::new(store.clone(), ZPath::parse("/app/config")?);
/// cache.register_raw_listener(Box::new(|| println!("changed")));
/// cache.start(true)?;
/// let current = cache.current_raw();
/// cache.close()?;
/// ```
pub struct NodeCache {
    inner: Arc<NodeCacheInner>,
    lifecycle: Mutex<CacheState>,
    subscription: Mutex<Option<u64>>,
    dispatcher: Dispatcher,
    config: CacheConfig,
}

impl std::fmt::Debug for NodeCache {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("NodeCache")
            .field("id", &self.inner.id)
            .field("path", &self.inner.path)
            .field("state", &*self.lifecycle.lock())
            .finish_non_exhaustive()
    }
}

impl NodeCache {
    pub fn new(
        store: MemoryStore,
        path: ZPath,
    ) -> Self {
        Self::with_config(store, path, CacheConfig::default())
    }

    pub fn with_config(
        store: MemoryStore,
        path: ZPath,
        config: CacheConfig,
    ) -> Self {
        let inner = Arc::new(NodeCacheInner {
            id: NEXT_NODE_CACHE_ID.fetch_add(1, Ordering::Relaxed),
            store,
            path,
            state: ArcSwapOption::empty(),
            applied_zxid: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            listeners: ListenerRegistry::new(config.listener.clone()),
        });
        Self {
            inner,
            lifecycle: Mutex::new(CacheState::Latent),
            subscription: Mutex::new(None),
            dispatcher: Dispatcher::default(),
            config,
        }
    }

    pub fn path(&self) -> &ZPath {
        &self.inner.path
    }

    pub fn state(&self) -> CacheState {
        *self.lifecycle.lock()
    }
}

impl RawNodeCache for NodeCache {
    fn start(
        &self,
        build_initial: bool,
    ) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        if *lifecycle != CacheState::Latent {
            return Err(CacheError::IllegalState {
                operation: "start",
                state: *lifecycle,
            }
            .into());
        }

        // Subscribe before the initial read; events already covered by the
        // read are discarded by zxid.
        let (subscription, events) = self.inner.store.subscribe();

        if build_initial {
            match self.inner.store.read_node(&self.inner.path) {
                Ok((node, zxid)) => {
                    self.inner.state.store(node.map(Arc::new));
                    self.inner.applied_zxid.store(zxid, Ordering::Release);
                }
                Err(e) => {
                    self.inner.store.unsubscribe(subscription);
                    return Err(e);
                }
            }
        }

        let init_inner = Arc::clone(&self.inner);
        let event_inner = Arc::clone(&self.inner);
        let spawned = self.dispatcher.spawn(
            self.config.dispatch.thread_builder("node", self.inner.id),
            events,
            move || {
                if !build_initial && init_inner.resync() {
                    init_inner.notify();
                }
            },
            move |event| {
                if event_inner.apply(event) {
                    event_inner.notify();
                }
            },
        );
        if let Err(e) = spawned {
            self.inner.store.unsubscribe(subscription);
            return Err(e);
        }

        *self.subscription.lock() = Some(subscription);
        *lifecycle = CacheState::Started;
        debug!(cache = self.inner.id, path = %self.inner.path, build_initial, "Node cache started");
        Ok(())
    }

    fn close(&self) -> Result<()> {
        {
            let mut lifecycle = self.lifecycle.lock();
            if *lifecycle == CacheState::Closed {
                return Ok(());
            }
            *lifecycle = CacheState::Closed;
        }
        self.inner.closed.store(true, Ordering::Release);

        self.dispatcher.stop();
        if let Some(subscription) = self.subscription.lock().take() {
            self.inner.store.unsubscribe(subscription);
        }
        self.inner.listeners.clear();

        debug!(cache = self.inner.id, path = %self.inner.path, "Node cache closed");
        Ok(())
    }

    fn current_raw(&self) -> Option<RawNode> {
        self.inner.state.load_full().map(|node| (*node).clone())
    }

    fn register_raw_listener(
        &self,
        listener: RawNodeListener,
    ) -> ListenerHandle {
        self.inner.listeners.add(Arc::from(listener))
    }

    fn unregister_raw_listener(
        &self,
        handle: &ListenerHandle,
    ) -> bool {
        self.inner.listeners.remove(handle)
    }
}

impl Drop for NodeCache {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
