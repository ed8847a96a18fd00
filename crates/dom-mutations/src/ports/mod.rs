//! Ports Layer
//!
//! - `outbound`: the host change observer the adapters are driven by

pub mod outbound;

pub use outbound::{MutationCallback, MutationSource, ObserverHandle};
