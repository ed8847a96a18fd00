//! Adapters Layer
//!
//! Hosts implementing [`MutationSource`](crate::ports::MutationSource):
//!
//! - `memory`: in-memory node tree with explicit notification checkpoints
//! - `web`: the browser's `MutationObserver` (wasm32 only)

pub mod memory;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use memory::{InMemoryDom, InMemoryObserver};
#[cfg(target_arch = "wasm32")]
pub use web::{WebMutationSource, WebObserver};
