//! Error types for the mutation adapters

use crate::domain::{AbortReason, NodeId};
use thiserror::Error;

/// Errors surfaced to a consumer pulling from a mutation iterator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomMutationsError {
    /// The abort signal fired before or during iteration.
    #[error("Observation aborted: {0}")]
    Aborted(AbortReason),

    /// The host refused the subscription.
    #[error("Failed to observe target: {0}")]
    Observe(#[from] ObserveError),
}

impl DomMutationsError {
    /// Whether this error came from the abort signal.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }
}

/// Errors raised when establishing an observation.
///
/// The option variants follow the `TypeError` cases of `MutationObserver.observe()`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObserveError {
    #[error("The options must enable at least one of 'childList', 'attributes' or 'characterData'")]
    NothingToObserve,

    #[error("'attributeOldValue' requires 'attributes' to be enabled")]
    AttributeOldValueWithoutAttributes,

    #[error("'attributeFilter' requires 'attributes' to be enabled")]
    AttributeFilterWithoutAttributes,

    #[error("'characterDataOldValue' requires 'characterData' to be enabled")]
    CharacterDataOldValueWithoutCharacterData,

    #[error("Unknown target node: {0}")]
    UnknownTarget(NodeId),

    #[error("Host observer error: {0}")]
    Host(String),
}

/// Errors from edits to the in-memory node tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("Node {0} is not a text node")]
    NotAText(NodeId),

    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Inserting {child} into {parent} would create a cycle")]
    HierarchyRequest { parent: NodeId, child: NodeId },
}
