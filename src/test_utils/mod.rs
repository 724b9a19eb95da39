//! Shared helpers for unit tests
mod common;
mod model;

pub use common::*;
pub use model::*;
