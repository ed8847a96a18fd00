//! Mutation Trace: replay DOM edit scenarios and report what an observer sees.
//!
//! Scenarios run against [`dom_mutations::InMemoryDom`]; each `flush` step
//! is a notification checkpoint. Output is one JSON object per observed
//! batch or record.

pub mod runner;
pub mod scenario;

pub use runner::{run, RunOptions, TraceEvent};
pub use scenario::{check_options, NodeTable, Scenario, ScenarioError, Step};
