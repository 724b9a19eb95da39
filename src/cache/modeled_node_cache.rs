use std::sync::Arc;

use crossbeam_channel::unbounded;
use parking_lot::Mutex;
use tracing::debug;
use tracing::trace;

use crate::CacheError;
use crate::CacheState;
use crate::EventSubscription;
use crate::ListenerConfig;
use crate::ListenerError;
use crate::ListenerHandle;
use crate::ListenerRegistry;
use crate::ModelCodec;
use crate::NodeSnapshot;
use crate::RawNodeCache;
use crate::Result;

type NodeSignal = dyn Fn() + Send + Sync;

/// Typed view of a single node
///
/// Listeners get a content-free signal; the change that triggered it is
/// already visible through [`ModeledNodeCache::current_data`] when the
/// listener runs.
///
/// # Example
///
/// ```ignore
/// let raw = NodeCache::new(store.clone(), ZPath::parse("/app/config")?);
/// let cache = ModeledNodeCache::wrap(raw, Arc::new(JsonCodec::<AppConfig>::new()));
/// cache.add_listener(|| println!("config changed"))?;
/// cache.start(true)?;
/// if let Some(snapshot) = cache.current_data()? {
///     println!("{:?} at version {}", snapshot.data(), snapshot.stat().version);
/// }
/// cache.close()?;
/// ```
pub struct ModeledNodeCache<T, R: RawNodeCache> {
    raw: R,
    codec: Arc<dyn ModelCodec<T>>,
    listeners: ListenerRegistry<NodeSignal>,
    raw_handle: ListenerHandle,
    state: Mutex<CacheState>,
}

impl<T, R: RawNodeCache> std::fmt::Debug for ModeledNodeCache<T, R> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ModeledNodeCache")
            .field("state", &*self.state.lock())
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

impl<T, R> ModeledNodeCache<T, R>
where
    T: Send + Sync + 'static,
    R: RawNodeCache,
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
        let listeners: ListenerRegistry<NodeSignal> = ListenerRegistry::new(config.clone());
        let forward = listeners.clone();
        let raw_handle = raw.register_raw_listener(Box::new(move || {
            let invoked = forward.dispatch(|listener| listener());
            trace!(listeners = invoked, "Node change forwarded");
        }));

        Self {
            raw,
            codec,
            listeners,
            raw_handle,
            state: Mutex::new(CacheState::Latent),
        }
    }

    /// Begin watching the node.
    ///
    /// With `build_initial`, returns once the node's current state is loaded;
    /// otherwise listeners are signalled when the first read completes.
    pub fn start(
        &self,
        build_initial: bool,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if *state != CacheState::Latent {
            return Err(CacheError::IllegalState {
                operation: "start",
                state: *state,
            }
            .into());
        }
        self.raw.start(build_initial)?;
        *state = CacheState::Started;
        debug!(build_initial, "Modeled node cache started");
        Ok(())
    }

    /// Last known state of the node, decoded.
    ///
    /// `Ok(None)` when the node does not exist or has not been read yet.
    /// Never blocks; after close it keeps returning the final state.
    pub fn current_data(&self) -> Result<Option<NodeSnapshot<T>>> {
        let Some(raw) = self.raw.current_raw() else {
            return Ok(None);
        };
        Ok(Some(NodeSnapshot::decode(self.codec.as_ref(), &raw)?))
    }

    /// Register a change listener; it runs on the adapter's dispatch thread.
    pub fn add_listener<F>(
        &self,
        listener: F,
    ) -> Result<ListenerHandle>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.ensure_open("add a listener")?;
        Ok(self.listeners.add(Arc::new(listener)))
    }

    /// Returns false when the handle was not registered with this cache
    pub fn remove_listener(
        &self,
        handle: &ListenerHandle,
    ) -> Result<bool> {
        self.ensure_open("remove a listener")?;
        Ok(self.listeners.remove(handle))
    }

    /// Change signals as a channel; dropping the subscription unregisters it
    pub fn subscribe(&self) -> Result<EventSubscription<()>> {
        let (tx, rx) = unbounded();
        let handle = self.add_listener(move || {
            let _ = tx.send(());
        })?;
        Ok(EventSubscription::new(rx, self.listeners.guard(handle)))
    }

    /// Receive failures of listeners registered with this cache
    pub fn set_unhandled_error_listener<F>(
        &self,
        listener: F,
    ) where
        F: Fn(&ListenerError) + Send + Sync + 'static,
    {
        self.listeners.set_error_sink(Some(Arc::new(listener)));
    }

    /// Listener failures isolated so far
    pub fn listener_errors(&self) -> u64 {
        self.listeners.error_count()
    }

    pub fn state(&self) -> CacheState {
        *self.state.lock()
    }

    /// Stop watching. Idempotent.
    ///
    /// Blocks until the adapter released its watch, unless called from one
    /// of this cache's listeners.
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
        debug!("Modeled node cache closed");
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
