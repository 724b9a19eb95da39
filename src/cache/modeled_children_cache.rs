use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crossbeam_channel::unbounded;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::CacheError;
use crate::CacheEvent;
use crate::CacheEventType;
use crate::CacheListener;
use crate::CacheState;
use crate::EventSubscription;
use crate::ListenerConfig;
use crate::ListenerError;
use crate::ListenerHandle;
use crate::ListenerRegistry;
use crate::ModelCodec;
use crate::NodeSnapshot;
use crate::RawChildrenCache;
use crate::RawChildrenEvent;
use crate::RawChildrenEventType;
use crate::RawNode;
use crate::Result;
use crate::StartMode;
use crate::ZPath;

/// Decoding shared by reads and the raw listener
///
/// A payload that fails to decode is reported once: `failed` remembers the
/// `mzxid` of the last bad payload seen per child, so re-reading it neither
/// logs nor counts again.
struct ChildDecoder<T> {
    codec: Arc<dyn ModelCodec<T>>,
    failed: DashMap<ZPath, u64>,
    failures: AtomicU64,
}

impl<T: 'static> ChildDecoder<T> {
    fn new(codec: Arc<dyn ModelCodec<T>>) -> Self {
        Self {
            codec,
            failed: DashMap::new(),
            failures: AtomicU64::new(0),
        }
    }

    fn snapshot(
        &self,
        raw: &RawNode,
    ) -> NodeSnapshot<T> {
        let (snapshot, error) = NodeSnapshot::decode_lenient(self.codec.as_ref(), raw);
        match error {
            Some(e) => {
                let mzxid = raw.stat.mzxid;
                if self.failed.insert(raw.path.clone(), mzxid) != Some(mzxid) {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(path = %e.path, version = e.version, "{}", e);
                }
            }
            None => {
                self.failed.remove(&raw.path);
            }
        }
        snapshot
    }

    fn event(
        &self,
        raw: &RawChildrenEvent,
    ) -> CacheEvent<T> {
        let node = raw.data.as_ref().map(|node| self.snapshot(node));
        if raw.event_type == RawChildrenEventType::ChildRemoved {
            if let Some(node) = raw.data.as_ref() {
                self.failed.remove(&node.path);
            }
        }
        CacheEvent::new(CacheEventType::from(raw.event_type), node)
    }
}

/// Typed view of the direct children of a node
///
/// Every raw children notification becomes exactly one [`CacheEvent`].
/// A child whose payload cannot be decoded is still reported, with
/// `data: None`; the failure is logged and counted in
/// [`ModeledPathChildrenCache::decode_failures`].
pub struct ModeledPathChildrenCache<T, R: RawChildrenCache> {
    raw: R,
    decoder: Arc<ChildDecoder<T>>,
    listeners: ListenerRegistry<dyn CacheListener<T>>,
    raw_handle: ListenerHandle,
    state: Mutex<CacheState>,
}

impl<T, R: RawChildrenCache> std::fmt::Debug for ModeledPathChildrenCache<T, R> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ModeledPathChildrenCache")
            .field("state", &*self.state.lock())
            .field("decode_failures", &self.decoder.failures.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<T, R> ModeledPathChildrenCache<T, R>
where
    T: Send + Sync + 'static,
    R: RawChildrenCache,
{
    pub fn wrap(
        raw: R,
        codec: Arc<dyn ModelCodec<T>>,
    ) -> Self {
        Self::wrap_with_config(raw, codec, &ListenerConfig::default())
    }

    pub fn wrap_with_config(
        raw: R,
        codec: Arc<dyn ModelCodec<T>>,
        config: &ListenerConfig,
    ) -> Self {
        let decoder = Arc::new(ChildDecoder::new(codec));
        let listeners: ListenerRegistry<dyn CacheListener<T>> =
            ListenerRegistry::new(config.clone());

        let forward = listeners.clone();
        let forward_decoder = Arc::clone(&decoder);
        let raw_handle = raw.register_raw_listener(Box::new(move |raw: &RawChildrenEvent| {
            let event = forward_decoder.event(raw);
            let invoked = forward.dispatch(|listener| listener.event(&event));
            trace!(
                event_type = ?event.event_type(),
                listeners = invoked,
                "Children event forwarded"
            );
        }));

        Self {
            raw,
            decoder,
            listeners,
            raw_handle,
            state: Mutex::new(CacheState::Latent),
        }
    }

    /// Begin watching the children; see [`StartMode`] for initial loading.
    pub fn start(
        &self,
        mode: StartMode,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if *state != CacheState::Latent {
            return Err(CacheError::IllegalState {
                operation: "start",
                state: *state,
            }
            .into());
        }
        self.raw.start(mode)?;
        *state = CacheState::Started;
        debug!(?mode, "Modeled children cache started");
        Ok(())
    }

    /// All known children, path-sorted
    pub fn current_data(&self) -> Vec<NodeSnapshot<T>> {
        self.raw
            .current_raw_children()
            .iter()
            .map(|raw| self.decoder.snapshot(raw))
            .collect()
    }

    pub fn current_data_at(
        &self,
        path: &ZPath,
    ) -> Option<NodeSnapshot<T>> {
        self.raw
            .current_raw_child(path)
            .map(|raw| self.decoder.snapshot(&raw))
    }

    /// Register an event listener; it runs on the adapter's dispatch thread.
    pub fn add_listener<L>(
        &self,
        listener: L,
    ) -> Result<ListenerHandle>
    where
        L: CacheListener<T> + 'static,
    {
        self.ensure_open("add a listener")?;
        Ok(self.listeners.add(Arc::new(listener)))
    }

    pub fn remove_listener(
        &self,
        handle: &ListenerHandle,
    ) -> Result<bool> {
        self.ensure_open("remove a listener")?;
        Ok(self.listeners.remove(handle))
    }

    pub fn set_unhandled_error_listener<F>(
        &self,
        listener: F,
    ) where
        F: Fn(&ListenerError) + Send + Sync + 'static,
    {
        self.listeners.set_error_sink(Some(Arc::new(listener)));
    }

    pub fn listener_errors(&self) -> u64 {
        self.listeners.error_count()
    }

    /// Distinct child payloads that failed to decode, across reads and events.
    ///
    /// Reading the same bad payload again does not count twice.
    pub fn decode_failures(&self) -> u64 {
        self.decoder.failures.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> CacheState {
        *self.state.lock()
    }

    pub fn close(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.is_closed() {
                return Ok(());
            }
            *state = CacheState::Closed;
        }

        self.raw.unregister_raw_listener(&self.raw_handle);
        let closed = self.raw.close();
        self.listeners.clear();
        debug!("Modeled children cache closed");
        closed
    }

    fn ensure_open(
        &self,
        operation: &'static str,
    ) -> Result<()> {
        let state = *self.state.lock();
        if state.is_closed() {
            return Err(CacheError::IllegalState { operation, state }.into());
        }
        Ok(())
    }
}

impl<T, R> ModeledPathChildrenCache<T, R>
where
    T: Clone + Send + Sync + 'static,
    R: RawChildrenCache,
{
    /// Events as a channel; dropping the subscription unregisters it
    pub fn subscribe(&self) -> Result<EventSubscription<CacheEvent<T>>> {
        let (tx, rx) = unbounded();
        let handle = self.add_listener(move |event: &CacheEvent<T>| {
            let _ = tx.send(event.clone());
        })?;
        Ok(EventSubscription::new(rx, self.listeners.guard(handle)))
    }
}
