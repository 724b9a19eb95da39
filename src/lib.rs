//! Typed, listener-driven caches over a hierarchical coordination store.
//!
//! A raw adapter ([`NodeCache`], [`PathChildrenCache`]) mirrors the byte-level
//! state of one node, or of one node's children, and notifies on a dedicated
//! dispatch thread. The typed caches ([`ModeledNodeCache`],
//! [`ModeledPathChildrenCache`]) wrap an adapter, decode payloads with a
//! [`ModelCodec`] and fan typed notifications out to their listeners.
//!
//! ```ignore
//! let store = MemoryStore::new();
//! let codec: Arc<dyn ModelCodec<Order>> = Arc::new(JsonCodec::new());
//! let orders = ZPath::parse("/orders")?;
//!
//! let cache = ModeledPathChildrenCache::wrap(PathChildrenCache::new(store.clone(), orders.clone()), codec.clone());
//! cache.add_listener(|event: &CacheEvent<Order>| println!("{:?}", event.event_type()))?;
//! cache.start(StartMode::BuildInitialCache)?;
//!
//! ModeledStore::wrap(store, orders, codec).at("1")?.create(&order)?;
//! ```

mod cache;
mod codec;
mod config;
mod errors;
mod listener;
mod path;
mod raw;
mod store;

pub use cache::*;
pub use codec::*;
pub use config::*;
pub use errors::*;
pub use listener::*;
pub use path::*;
pub use raw::*;
pub use store::*;


//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;
