use std::thread::JoinHandle;
use std::thread::ThreadId;

use crossbeam_channel::bounded;
use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::debug;
use tracing::warn;

use crate::Error;
use crate::Result;
use crate::StoreEvent;

/// Dedicated notification thread of one raw adapter
///
/// Runs `init` once, then feeds store events to `handle` one at a time until
/// [`Dispatcher::stop`] is called or the event channel closes.
#[derive(Debug, Default)]
pub(crate) struct Dispatcher {
    /// Dispatcher thread handle (None when not running)
    thread_handle: Mutex<Option<JoinHandle<()>>>,

    /// Shutdown signal sender (None when not running)
    shutdown_tx: Mutex<Option<Sender<()>>>,

    thread_id: Mutex<Option<ThreadId>>,
}

impl Dispatcher {
    pub(crate) fn spawn<I, H>(
        &self,
        builder: std::thread::Builder,
        events: Receiver<StoreEvent>,
        init: I,
        mut handle: H,
    ) -> Result<()>
    where
        I: FnOnce() + Send + 'static,
        H: FnMut(StoreEvent) + Send + 'static,
    {
        let mut handle_guard = self.thread_handle.lock();

        // Already running
        if handle_guard.is_some() {
            return Ok(());
        }

        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        // Held back until the thread id is recorded
        let (ready_tx, ready_rx) = bounded::<()>(1);

        let thread = builder
            .spawn(move || {
                let _ = ready_rx.recv();
                debug!("Cache dispatcher thread started");
                init();

                loop {
                    crossbeam_channel::select! {
                        recv(events) -> result => {
                            match result {
                                Ok(event) => handle(event),
                                Err(_) => {
                                    debug!("Store event channel closed");
                                    break;
                                }
                            }
                        }
                        recv(shutdown_rx) -> _ => {
                            debug!("Cache dispatcher received shutdown signal");
                            break;
                        }
                    }
                }

                debug!("Cache dispatcher thread stopped");
            })
            .map_err(|e| Error::Fatal(format!("failed to spawn cache dispatcher: {e}")))?;

        *self.thread_id.lock() = Some(thread.thread().id());
        *handle_guard = Some(thread);
        *self.shutdown_tx.lock() = Some(shutdown_tx);
        let _ = ready_tx.send(());
        Ok(())
    }

    /// Whether the caller runs on this dispatcher's thread
    pub(crate) fn is_dispatch_thread(&self) -> bool {
        *self.thread_id.lock() == Some(std::thread::current().id())
    }

    /// Signal the thread to exit and wait for it.
    ///
    /// From the dispatch thread itself the join is skipped; the thread exits
    /// once the current notification returns.
    pub(crate) fn stop(&self) {
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(());
        }

        if self.is_dispatch_thread() {
            return;
        }

        if let Some(handle) = self.thread_handle.lock().take() {
            if handle.join().is_err() {
                warn!("Cache dispatcher thread panicked");
            }
        }
    }
}
