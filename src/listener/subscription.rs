use std::time::Duration;

use crossbeam_channel::Receiver;
use crossbeam_channel::RecvTimeoutError;
use crossbeam_channel::TryRecvError;

use super::ListenerGuard;
use super::ListenerHandle;

/// Channel-backed stream of cache notifications
///
/// Created by `subscribe()` on the caches. Events are queued unbounded on
/// the dispatch thread and consumed at the subscriber's pace; dropping the
/// subscription unregisters its listener.
#[derive(Debug)]
pub struct EventSubscription<E> {
    receiver: Receiver<E>,
    guard: ListenerGuard,
}

impl<E> EventSubscription<E> {
    pub(crate) fn new(
        receiver: Receiver<E>,
        guard: ListenerGuard,
    ) -> Self {
        Self { receiver, guard }
    }

    pub fn handle(&self) -> ListenerHandle {
        self.guard.handle()
    }

    /// Block until the next event; `None` once the cache is closed and drained
    pub fn recv(&self) -> Option<E> {
        self.receiver.recv().ok()
    }

    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Option<E> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_recv(&self) -> Option<E> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Number of events queued and not yet received
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Blocking iterator over events
    pub fn iter(&self) -> crossbeam_channel::Iter<'_, E> {
        self.receiver.iter()
    }
}
