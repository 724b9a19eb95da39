//! Typed caches
//!
//! [`ModeledNodeCache`] and [`ModeledPathChildrenCache`] own a raw adapter
//! and decode its byte-level state into models on every read. They keep no
//! decoded state of their own; the adapter's state is the single source of
//! truth, so a read from inside a listener always reflects the change that
//! triggered it.

mod event;
mod modeled_children_cache;
mod modeled_node_cache;
mod snapshot;
mod state;

pub use event::*;
pub use modeled_children_cache::*;
pub use modeled_node_cache::*;
pub use snapshot::*;
pub use state::*;

#[cfg(test)]
mod event_test;
