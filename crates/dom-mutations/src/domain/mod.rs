//! Domain Layer
//!
//! Plain data: observation options, change records and the abort signal.
//! No host interaction happens here.

pub mod abort;
pub mod options;
pub mod record;

pub use abort::{AbortController, AbortReason, AbortSignal, ListenerId};
pub use options::{NormalizedOptions, ObserveOptions};
pub use record::{MutationKind, MutationRecord, NodeId};
