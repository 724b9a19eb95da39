//! Listener registration and fan-out
//!
//! Every cache (typed or raw) owns one [`ListenerRegistry`]. Dispatch runs on
//! the caller's thread, which for caches is the adapter's dispatch thread:
//!
//! ```text
//! raw adapter dispatch thread
//!        │ apply raw change, then notify
//!        ▼
//! ┌─────────────────┐
//! │ ListenerRegistry│ snapshot of (handle, listener) sorted by handle
//! └──────┬──────────┘
//!        │ invoke each listener, catching panics
//!        ▼
//!   listener 1 .. n
//! ```
//!
//! Adding or removing listeners from inside a listener is safe: dispatch
//! works on a snapshot and holds no registry lock while invoking.

mod filter;
mod registry;
mod subscription;

pub use filter::*;
pub use registry::*;
pub use subscription::*;

#[cfg(test)]
mod filter_test;
