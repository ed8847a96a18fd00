//! Scenario files
//!
//! A scenario names nodes, builds an initial tree, picks a target and then
//! lists the edits to replay while the target is observed.
//!
//! ```json
//! {
//!   "target": "list",
//!   "options": { "childList": true },
//!   "setup": [{ "op": "createElement", "name": "list", "tag": "ul" }],
//!   "steps": [
//!     { "op": "createElement", "name": "item", "tag": "li" },
//!     { "op": "appendChild", "parent": "list", "child": "item" },
//!     { "op": "flush" }
//!   ]
//! }
//! ```

use dom_mutations::{
    DomError, DomMutationsError, InMemoryDom, NodeId, NormalizedOptions, ObserveError,
    ObserveOptions,
};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// Name under which the document root is always available.
pub const DOCUMENT: &str = "document";

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Invalid scenario JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown node name: {0}")]
    UnknownNode(String),

    #[error("Node name already in use: {0}")]
    DuplicateNode(String),

    #[error("DOM edit failed: {0}")]
    Dom(#[from] DomError),

    #[error("Invalid observe options: {0}")]
    Observe(#[from] ObserveError),

    #[error(transparent)]
    Mutations(#[from] DomMutationsError),

    #[error("Consumer task failed: {0}")]
    Consumer(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default = "default_target")]
    pub target: String,
    pub options: ObserveOptions,
    /// Applied before observation starts.
    #[serde(default)]
    pub setup: Vec<Step>,
    pub steps: Vec<Step>,
}

fn default_target() -> String {
    DOCUMENT.to_string()
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Parse observe options and apply the normalization rules to them.
pub fn check_options(json: &str) -> Result<NormalizedOptions, ScenarioError> {
    let options: ObserveOptions = serde_json::from_str(json)?;
    Ok(options.normalize()?)
}

/// One edit, or a notification checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Step {
    CreateElement {
        name: String,
        tag: String,
    },
    CreateText {
        name: String,
        data: String,
    },
    AppendChild {
        parent: String,
        child: String,
    },
    InsertBefore {
        parent: String,
        child: String,
        #[serde(default)]
        before: Option<String>,
    },
    RemoveChild {
        parent: String,
        child: String,
    },
    SetAttribute {
        node: String,
        name: String,
        value: String,
    },
    RemoveAttribute {
        node: String,
        name: String,
    },
    SetData {
        node: String,
        data: String,
    },
    Flush,
}

/// Scenario names bound to nodes of one document.
pub struct NodeTable {
    dom: InMemoryDom,
    names: HashMap<String, NodeId>,
}

impl NodeTable {
    pub fn new(dom: &InMemoryDom) -> Self {
        let mut names = HashMap::new();
        names.insert(DOCUMENT.to_string(), dom.document());
        Self {
            dom: dom.clone(),
            names,
        }
    }

    pub fn resolve(&self, name: &str) -> Result<NodeId, ScenarioError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| ScenarioError::UnknownNode(name.to_string()))
    }

    /// Apply one step. Returns the number of batches a `flush` delivered.
    pub fn apply(&mut self, step: &Step) -> Result<usize, ScenarioError> {
        match step {
            Step::CreateElement { name, tag } => {
                let id = self.dom.create_element(tag);
                self.bind(name, id)?;
            }
            Step::CreateText { name, data } => {
                let id = self.dom.create_text(data);
                self.bind(name, id)?;
            }
            Step::AppendChild { parent, child } => {
                self.dom
                    .append_child(self.resolve(parent)?, self.resolve(child)?)?;
            }
            Step::InsertBefore {
                parent,
                child,
                before,
            } => {
                let before = before.as_deref().map(|n| self.resolve(n)).transpose()?;
                self.dom
                    .insert_before(self.resolve(parent)?, self.resolve(child)?, before)?;
            }
            Step::RemoveChild { parent, child } => {
                self.dom
                    .remove_child(self.resolve(parent)?, self.resolve(child)?)?;
            }
            Step::SetAttribute { node, name, value } => {
                self.dom.set_attribute(self.resolve(node)?, name, value)?;
            }
            Step::RemoveAttribute { node, name } => {
                self.dom.remove_attribute(self.resolve(node)?, name)?;
            }
            Step::SetData { node, data } => {
                self.dom.set_data(self.resolve(node)?, data)?;
            }
            Step::Flush => return Ok(self.dom.flush()),
        }
        Ok(0)
    }

    fn bind(&mut self, name: &str, id: NodeId) -> Result<(), ScenarioError> {
        if self.names.contains_key(name) {
            return Err(ScenarioError::DuplicateNode(name.to_string()));
        }
        self.names.insert(name.to_string(), id);
        Ok(())
    }
}
