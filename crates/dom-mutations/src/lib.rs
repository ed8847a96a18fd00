//! # dom-mutations
//!
//! Pull-based async iteration over DOM mutation notifications.
//!
//! The host's change observer pushes batches of records through a callback.
//! This crate turns that into streams the consumer pulls from, one batch
//! (or one record) at a time, with optional cancellation through an
//! [`AbortSignal`].
//!
//! ## Architecture
//!
//! Hexagonal layout (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): options, records, abort signal
//! - **Ports Layer** (`ports/`): `MutationSource`, the driven host port
//! - **Service Layer** (`service/`): the push-to-pull bridge and both adapters
//!   - [`batched_dom_mutations`]: one item per host notification
//!   - [`dom_mutations`]: one item per change record
//! - **Adapters Layer** (`adapters/`): hosts
//!   - [`InMemoryDom`]: in-memory node tree
//!   - `WebMutationSource`: the browser `MutationObserver` (wasm32)
//!
//! ## Pull semantics
//!
//! ```text
//!  consumer            adapter                    host
//!     │ next_batch()      │                         │
//!     │──────────────────▶│ queue request           │
//!     │                   │◀──── callback(batch) ───│
//!     │◀── Ok(Some(batch))│ resolve oldest request  │
//! ```
//!
//! - Nothing is buffered ahead of a request: a notification with no
//!   request waiting is dropped.
//! - Closing or dropping a stream disconnects the host observer on the spot.
//! - An aborted signal fails the current and every later request.
//!
//! ## Usage
//!
//! ```
//! use dom_mutations::{batched_dom_mutations, InMemoryDom, ObserveOptions};
//!
//! # tokio_test::block_on(async {
//! let dom = InMemoryDom::new();
//! let div = dom.create_element("div");
//!
//! let batches = batched_dom_mutations(dom.clone(), div, ObserveOptions::new().attributes(true))
//!     .stream()
//!     .unwrap();
//!
//! let next = batches.next_batch();
//! dom.set_attribute(div, "hidden", "").unwrap();
//! dom.flush();
//!
//! let batch = next.await.unwrap().unwrap();
//! assert_eq!(batch[0].attribute_name.as_deref(), Some("hidden"));
//! # });
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

// Re-export main types
pub use adapters::{InMemoryDom, InMemoryObserver};
#[cfg(target_arch = "wasm32")]
pub use adapters::{WebMutationSource, WebObserver};
pub use domain::{
    AbortController, AbortReason, AbortSignal, MutationKind, MutationRecord, NodeId,
    NormalizedOptions, ObserveOptions,
};
pub use error::{DomError, DomMutationsError, ObserveError};
pub use ports::{MutationCallback, MutationSource, ObserverHandle};
pub use service::{
    batched_dom_mutations, dom_mutations, BatchedDomMutations, DomMutations, DomMutationsOptions,
    MutationBatches, MutationRecords, NextBatch, PullResult,
};
