//! Coordination store
//!
//! [`MemoryStore`] is an in-process hierarchical key-value store with
//! ZooKeeper-style metadata and ordered change subscriptions. Raw cache
//! adapters watch it; [`ModeledStore`] writes typed models into it.

mod memory_store;
mod modeled_store;
mod stat;

pub use memory_store::*;
pub use modeled_store::*;
pub use stat::*;
