//! Service Layer
//!
//! - `bridge`: push-to-pull state machine shared by both adapters
//! - `batched`: one item per host notification
//! - `flattened`: one item per change record

mod bridge;

pub mod batched;
pub mod flattened;

pub use batched::{batched_dom_mutations, BatchedDomMutations, DomMutationsOptions, MutationBatches};
pub use bridge::{NextBatch, PullResult};
pub use flattened::{dom_mutations, DomMutations, MutationRecords};
