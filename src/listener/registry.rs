use std::any::Any;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::error;
use tracing::trace;
use tracing::warn;

use crate::ListenerConfig;
use crate::ListenerError;

/// Source of registry ids so handles cannot be used across registries
static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Callback receiving listener failures that were isolated during dispatch
pub type UnhandledErrorListener = Arc<dyn Fn(&ListenerError) + Send + Sync>;

/// Opaque token identifying one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerHandle {
    registry: u64,
    id: u64,
}

impl ListenerHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Handle not issued by any registry, for stubbing adapters
    #[cfg(test)]
    pub(crate) fn detached(id: u64) -> Self {
        Self { registry: 0, id }
    }
}

/// Removal hook used by [`ListenerGuard`] without knowing the listener type
trait Unregister: Send + Sync {
    fn unregister(
        &self,
        handle: &ListenerHandle,
    ) -> bool;
}

struct RegistryInner<L: ?Sized> {
    id: u64,

    listeners: DashMap<u64, Arc<L>>,

    /// Next listener id (monotonically increasing)
    next_id: AtomicU64,

    /// Listener failures observed so far
    error_count: AtomicU64,

    error_sink: RwLock<Option<UnhandledErrorListener>>,

    config: ListenerConfig,
}

impl<L: ?Sized + Send + Sync> Unregister for RegistryInner<L> {
    fn unregister(
        &self,
        handle: &ListenerHandle,
    ) -> bool {
        if handle.registry != self.id {
            return false;
        }
        self.listeners.remove(&handle.id).is_some()
    }
}

/// Thread-safe handle → listener map with panic-isolating fan-out
///
/// Cloning yields another handle to the same registry.
pub struct ListenerRegistry<L: ?Sized> {
    inner: Arc<RegistryInner<L>>,
}

impl<L: ?Sized> Clone for ListenerRegistry<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: ?Sized> std::fmt::Debug for ListenerRegistry<L> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("id", &self.inner.id)
            .field("listeners", &self.inner.listeners.len())
            .field("errors", &self.inner.error_count.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<L: ?Sized + Send + Sync + 'static> Default for ListenerRegistry<L> {
    fn default() -> Self {
        Self::new(ListenerConfig::default())
    }
}

impl<L: ?Sized + Send + Sync + 'static> ListenerRegistry<L> {
    pub fn new(config: ListenerConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
                listeners: DashMap::new(),
                next_id: AtomicU64::new(1),
                error_count: AtomicU64::new(0),
                error_sink: RwLock::new(None),
                config,
            }),
        }
    }

    /// Register a listener; it receives every dispatch that starts after
    /// this call returns.
    pub fn add(
        &self,
        listener: Arc<L>,
    ) -> ListenerHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.insert(id, listener);

        trace!(registry = self.inner.id, listener_id = id, "Listener registered");

        ListenerHandle {
            registry: self.inner.id,
            id,
        }
    }

    /// Unregister a listener.
    ///
    /// No dispatch starting after this call reaches the listener; a dispatch
    /// already in flight may still deliver to it. Returns false when the
    /// handle is unknown to this registry.
    pub fn remove(
        &self,
        handle: &ListenerHandle,
    ) -> bool {
        let removed = self.inner.unregister(handle);
        if removed {
            trace!(
                registry = self.inner.id,
                listener_id = handle.id,
                "Listener unregistered"
            );
        }
        removed
    }

    /// Turn a handle into a guard that unregisters when dropped
    pub fn guard(
        &self,
        handle: ListenerHandle,
    ) -> ListenerGuard {
        let inner: Arc<dyn Unregister> = self.inner.clone();
        ListenerGuard {
            handle,
            registry: Arc::downgrade(&inner),
        }
    }

    pub fn contains(
        &self,
        handle: &ListenerHandle,
    ) -> bool {
        handle.registry == self.inner.id && self.inner.listeners.contains_key(&handle.id)
    }

    pub fn len(&self) -> usize {
        self.inner.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.listeners.is_empty()
    }

    pub fn clear(&self) {
        self.inner.listeners.clear();
    }

    /// Number of listener failures isolated so far
    pub fn error_count(&self) -> u64 {
        self.inner.error_count.load(Ordering::Relaxed)
    }

    /// Install a sink for listener failures, replacing any previous one
    pub fn set_error_sink(
        &self,
        sink: Option<UnhandledErrorListener>,
    ) {
        *self.inner.error_sink.write() = sink;
    }

    /// Invoke every currently registered listener exactly once.
    ///
    /// Listeners run synchronously on the calling thread, in handle order.
    /// A panicking listener is reported and skipped; the rest still run.
    /// Returns the number of listeners invoked.
    pub fn dispatch<F>(
        &self,
        invoke: F,
    ) -> usize
    where
        F: Fn(&L),
    {
        let mut snapshot: Vec<(u64, Arc<L>)> = self
            .inner
            .listeners
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        snapshot.sort_unstable_by_key(|(id, _)| *id);

        let slow_threshold = self.inner.config.slow_listener_threshold();

        for (id, listener) in snapshot.iter() {
            let started = Instant::now();
            let outcome = catch_unwind(AssertUnwindSafe(|| invoke(listener)));

            if let Err(payload) = outcome {
                self.report(ListenerError {
                    listener_id: *id,
                    message: panic_message(payload.as_ref()),
                });
            }

            if let Some(threshold) = slow_threshold {
                let elapsed = started.elapsed();
                if elapsed > threshold {
                    warn!(
                        registry = self.inner.id,
                        listener_id = id,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Slow listener is delaying dispatch"
                    );
                }
            }
        }

        snapshot.len()
    }

    fn report(
        &self,
        err: ListenerError,
    ) {
        self.inner.error_count.fetch_add(1, Ordering::Relaxed);
        error!(registry = self.inner.id, "{}", err);

        let sink = self.inner.error_sink.read().clone();
        if let Some(sink) = sink {
            if catch_unwind(AssertUnwindSafe(|| sink(&err))).is_err() {
                error!(registry = self.inner.id, "Unhandled error listener panicked");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "listener panicked".to_string()
    }
}

/// Unregisters its listener when dropped
///
/// Holds the registry weakly; dropping a guard after its registry is gone is
/// a no-op.
pub struct ListenerGuard {
    handle: ListenerHandle,
    registry: Weak<dyn Unregister>,
}

impl ListenerGuard {
    pub fn handle(&self) -> ListenerHandle {
        self.handle
    }
}

impl std::fmt::Debug for ListenerGuard {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ListenerGuard").field("handle", &self.handle).finish()
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(&self.handle);
            trace!(listener_id = self.handle.id, "Listener unregistered via guard");
        }
    }
}
