//! # dom-mutations Test Suite
//!
//! Cross-crate tests that drive the adapters the way an application would.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── adapter_benchmarks.rs  # Pull/deliver throughput
//! └── src/integration/
//!     ├── flows.rs               # Batch and record contents
//!     ├── ordering.rs            # Request/notification interleavings
//!     ├── cancellation.rs        # Abort signals and early termination
//!     └── replay.rs              # mutation-trace scenarios end to end
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p dom-mutations-tests
//! cargo test -p dom-mutations-tests integration::cancellation::
//! cargo bench -p dom-mutations-tests
//! ```
