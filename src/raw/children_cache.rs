use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::dispatcher::Dispatcher;
use super::RawChildrenCache;
use super::RawChildrenEvent;
use super::RawChildrenEventType;
use super::RawChildrenListener;
use super::RawNode;
use super::StartMode;
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

static NEXT_CHILDREN_CACHE_ID: AtomicU64 = AtomicU64::new(1);

type ChildrenSignal = dyn Fn(&RawChildrenEvent) + Send + Sync;

type Children = BTreeMap<ZPath, RawNode>;

struct ChildrenCacheInner {
    id: u64,
    store: MemoryStore,
    path: ZPath,
    cache_data: bool,

    /// Known children keyed by path; replaced wholesale on every change
    state: ArcSwap<Children>,

    applied_zxid: AtomicU64,

    closed: AtomicBool,
    listeners: ListenerRegistry<ChildrenSignal>,
}

impl ChildrenCacheInner {
    fn retained(
        &self,
        node: &RawNode,
    ) -> RawNode {
        if self.cache_data {
            node.clone()
        } else {
            RawNode {
                data: None,
                ..node.clone()
            }
        }
    }

    /// Load the children synchronously, without events
    fn load(&self) -> Result<()> {
        let (children, zxid) = self.store.read_children(&self.path)?;
        let loaded: Children = children
            .iter()
            .map(|child| (child.path.clone(), self.retained(child)))
            .collect();
        self.state.store(Arc::new(loaded));
        self.applied_zxid.fetch_max(zxid, Ordering::AcqRel);
        Ok(())
    }

    /// Re-read the children and describe how they differ from the state
    fn resync(&self) -> Vec<RawChildrenEvent> {
        let (children, zxid) = match self.store.read_children(&self.path) {
            Ok(read) => read,
            Err(e) => {
                warn!(cache = self.id, path = %self.path, "Failed to read children: {}", e);
                return Vec::new();
            }
        };
        self.applied_zxid.fetch_max(zxid, Ordering::AcqRel);

        let previous = self.state.load_full();
        let mut next = Children::new();
        let mut events = Vec::new();

        for child in children {
            let event_type = match previous.get(&child.path) {
                None => Some(RawChildrenEventType::ChildAdded),
                Some(known) if known.stat != child.stat => Some(RawChildrenEventType::ChildUpdated),
                Some(_) => None,
            };
            next.insert(child.path.clone(), self.retained(&child));
            if let Some(event_type) = event_type {
                events.push(RawChildrenEvent {
                    event_type,
                    data: Some(child),
                });
            }
        }
        for (path, known) in previous.iter() {
            if !next.contains_key(path) {
                events.push(RawChildrenEvent {
                    event_type: RawChildrenEventType::ChildRemoved,
                    data: Some(known.clone()),
                });
            }
        }

        self.state.store(Arc::new(next));
        events
    }

    /// Apply one store event and return the notifications it produces
    fn apply(
        &self,
        event: StoreEvent,
    ) -> Vec<RawChildrenEvent> {
        if self.closed.load(Ordering::Acquire) {
            return Vec::new();
        }
        match event {
            StoreEvent::ConnectionStateChanged { state } => {
                let Some(event_type) = RawChildrenEventType::from_connection(state) else {
                    return Vec::new();
                };
                let mut events = vec![RawChildrenEvent {
                    event_type,
                    data: None,
                }];
                if state == ConnectionState::Reconnected {
                    events.extend(self.resync());
                }
                events
            }
            StoreEvent::NodeCreated { zxid, node } => {
                if !self.accept(zxid, &node.path) {
                    return Vec::new();
                }
                self.update(|children| {
                    children.insert(node.path.clone(), self.retained(&node));
                });
                vec![RawChildrenEvent {
                    event_type: RawChildrenEventType::ChildAdded,
                    data: Some(node),
                }]
            }
            StoreEvent::NodeDataChanged { zxid, node } => {
                if !self.accept(zxid, &node.path) {
                    return Vec::new();
                }
                let mut existed = false;
                self.update(|children| {
                    existed = children.insert(node.path.clone(), self.retained(&node)).is_some();
                });
                let event_type = if existed {
                    RawChildrenEventType::ChildUpdated
                } else {
                    RawChildrenEventType::ChildAdded
                };
                vec![RawChildrenEvent {
                    event_type,
                    data: Some(node),
                }]
            }
            StoreEvent::NodeDeleted { zxid, node } => {
                if !self.accept(zxid, &node.path) {
                    return Vec::new();
                }
                let mut previous = None;
                self.update(|children| {
                    previous = children.remove(&node.path);
                });
                let last = match previous {
                    Some(known) if self.cache_data => known,
                    _ => node,
                };
                vec![RawChildrenEvent {
                    event_type: RawChildrenEventType::ChildRemoved,
                    data: Some(last),
                }]
            }
        }
    }

    fn accept(
        &self,
        zxid: u64,
        path: &ZPath,
    ) -> bool {
        if !path.is_child_of(&self.path) || zxid <= self.applied_zxid.load(Ordering::Acquire) {
            return false;
        }
        self.applied_zxid.store(zxid, Ordering::Release);
        true
    }

    fn update<F>(
        &self,
        mutate: F,
    ) where
        F: FnOnce(&mut Children),
    {
        let mut next = Children::clone(&self.state.load());
        mutate(&mut next);
        self.state.store(Arc::new(next));
    }

    fn notify(
        &self,
        event: &RawChildrenEvent,
    ) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let invoked = self.listeners.dispatch(|listener| listener(event));
        trace!(
            cache = self.id,
            path = %self.path,
            event_type = ?event.event_type,
            listeners = invoked,
            "Children event dispatched"
        );
    }
}

/// Raw adapter watching the direct children of a [`MemoryStore`] node
///
/// The watched node itself does not need to exist; children appear as soon
/// as they are created.
pub struct PathChildrenCache {
    inner: Arc<ChildrenCacheInner>,
    lifecycle: Mutex<CacheState>,
    subscription: Mutex<Option<u64>>,
    dispatcher: Dispatcher,
    config: CacheConfig,
}

impl std::fmt::Debug for PathChildrenCache {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("PathChildrenCache")
            .field("id", &self.inner.id)
            .field("path", &self.inner.path)
            .field("children", &self.inner.state.load().len())
            .field("state", &*self.lifecycle.lock())
            .finish_non_exhaustive()
    }
}

impl PathChildrenCache {
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
        let inner = Arc::new(ChildrenCacheInner {
            id: NEXT_CHILDREN_CACHE_ID.fetch_add(1, Ordering::Relaxed),
            store,
            path,
            cache_data: config.children.cache_data,
            state: ArcSwap::from_pointee(Children::new()),
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

impl RawChildrenCache for PathChildrenCache {
    fn start(
        &self,
        mode: StartMode,
    ) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        if *lifecycle != CacheState::Latent {
            return Err(CacheError::IllegalState {
                operation: "start",
                state: *lifecycle,
            }
            .into());
        }

        let (subscription, events) = self.inner.store.subscribe();

        if mode == StartMode::BuildInitialCache {
            if let Err(e) = self.inner.load() {
                self.inner.store.unsubscribe(subscription);
                return Err(e);
            }
        }

        let init_inner = Arc::clone(&self.inner);
        let event_inner = Arc::clone(&self.inner);
        let spawned = self.dispatcher.spawn(
            self.config.dispatch.thread_builder("children", self.inner.id),
            events,
            move || {
                if mode == StartMode::BuildInitialCache {
                    return;
                }
                for event in init_inner.resync() {
                    init_inner.notify(&event);
                }
                if mode == StartMode::PostInitializedEvent {
                    init_inner.notify(&RawChildrenEvent {
                        event_type: RawChildrenEventType::Initialized,
                        data: None,
                    });
                }
            },
            move |event| {
                for raw in event_inner.apply(event) {
                    event_inner.notify(&raw);
                }
            },
        );
        if let Err(e) = spawned {
            self.inner.store.unsubscribe(subscription);
            return Err(e);
        }

        *self.subscription.lock() = Some(subscription);
        *lifecycle = CacheState::Started;
        debug!(cache = self.inner.id, path = %self.inner.path, ?mode, "Children cache started");
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

        debug!(cache = self.inner.id, path = %self.inner.path, "Children cache closed");
        Ok(())
    }

    fn current_raw_children(&self) -> Vec<RawNode> {
        self.inner.state.load().values().cloned().collect()
    }

    fn current_raw_child(
        &self,
        path: &ZPath,
    ) -> Option<RawNode> {
        self.inner.state.load().get(path).cloned()
    }

    fn register_raw_listener(
        &self,
        listener: RawChildrenListener,
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

impl Drop for PathChildrenCache {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
