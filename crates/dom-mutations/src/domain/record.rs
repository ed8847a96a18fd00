//! Change records produced by the in-memory host

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node in an [`InMemoryDom`](crate::adapters::InMemoryDom).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Category of an observed change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationKind {
    Attributes,
    CharacterData,
    ChildList,
}

impl MutationKind {
    /// The `MutationRecord.type` string for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Attributes => "attributes",
            Self::CharacterData => "characterData",
            Self::ChildList => "childList",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discrete observed modification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationRecord {
    #[serde(rename = "type")]
    pub kind: MutationKind,
    /// Element whose attribute changed, text node whose data changed, or
    /// parent whose children changed.
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added_nodes: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_nodes: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_sibling: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_sibling: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_name: Option<String>,
    /// Only set when the matching `*OldValue` option was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
}

impl MutationRecord {
    /// Old values are attached per observer by the host, since only some
    /// registrations ask for them.
    pub(crate) fn attributes(target: NodeId, name: &str) -> Self {
        Self {
            attribute_name: Some(name.to_string()),
            ..Self::bare(MutationKind::Attributes, target)
        }
    }

    pub(crate) fn character_data(target: NodeId) -> Self {
        Self::bare(MutationKind::CharacterData, target)
    }

    pub(crate) fn child_list(
        target: NodeId,
        added_nodes: Vec<NodeId>,
        removed_nodes: Vec<NodeId>,
        previous_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    ) -> Self {
        Self {
            added_nodes,
            removed_nodes,
            previous_sibling,
            next_sibling,
            ..Self::bare(MutationKind::ChildList, target)
        }
    }

    fn bare(kind: MutationKind, target: NodeId) -> Self {
        Self {
            kind,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: None,
            old_value: None,
        }
    }
}
