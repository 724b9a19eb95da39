use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use crate::CacheEvent;
use crate::CacheEventType;

/// Receiver of typed children cache events
///
/// Implemented for every `Fn(&CacheEvent<T>) + Send + Sync` closure.
pub trait CacheListener<T>: Send + Sync {
    fn event(
        &self,
        event: &CacheEvent<T>,
    );

    /// Only forward events matching `predicate`
    fn filtered<P>(
        self,
        predicate: P,
    ) -> Filtered<Self, P>
    where
        Self: Sized,
        P: Fn(&CacheEvent<T>) -> bool + Send + Sync,
    {
        Filtered {
            listener: self,
            predicate,
        }
    }

    /// Swallow everything up to and including the `Initialized` event.
    ///
    /// Only meaningful with `StartMode::PostInitializedEvent`; with other
    /// modes no event is ever forwarded.
    fn post_initialized_only(self) -> PostInitializedOnly<Self>
    where
        Self: Sized,
    {
        PostInitializedOnly {
            listener: self,
            initialized: AtomicBool::new(false),
        }
    }
}

impl<T, F> CacheListener<T> for F
where
    F: Fn(&CacheEvent<T>) + Send + Sync,
{
    fn event(
        &self,
        event: &CacheEvent<T>,
    ) {
        self(event)
    }
}

pub struct Filtered<L, P> {
    listener: L,
    predicate: P,
}

impl<T, L, P> CacheListener<T> for Filtered<L, P>
where
    L: CacheListener<T>,
    P: Fn(&CacheEvent<T>) -> bool + Send + Sync,
{
    fn event(
        &self,
        event: &CacheEvent<T>,
    ) {
        if (self.predicate)(event) {
            self.listener.event(event);
        }
    }
}

pub struct PostInitializedOnly<L> {
    listener: L,
    initialized: AtomicBool,
}

impl<T, L> CacheListener<T> for PostInitializedOnly<L>
where
    L: CacheListener<T>,
{
    fn event(
        &self,
        event: &CacheEvent<T>,
    ) {
        if self.initialized.load(Ordering::Acquire) {
            self.listener.event(event);
        } else if event.event_type() == CacheEventType::Initialized {
            self.initialized.store(true, Ordering::Release);
        }
    }
}

/// Predicate: node events only (added, updated, removed)
pub fn node_events<T>(event: &CacheEvent<T>) -> bool {
    event.event_type().is_node_event()
}

/// Predicate: events whose node carries a decoded payload
pub fn has_payload<T>(event: &CacheEvent<T>) -> bool {
    event.node().is_some_and(|node| node.data().is_some())
}
