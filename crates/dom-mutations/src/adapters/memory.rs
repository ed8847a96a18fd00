//! In-memory host
//!
//! A minimal node tree with a mutation observer registry. Edits queue
//! records for every interested observer following the DOM "queue a
//! mutation record" steps; [`InMemoryDom::flush`] is the notification
//! checkpoint that hands each observer its queued records as one batch.
//!
//! Delivery is explicit so callers decide when a notification happens,
//! the way a browser decides by running its microtask checkpoint.

use crate::domain::{MutationRecord, NodeId, NormalizedOptions};
use crate::error::{DomError, ObserveError};
use crate::ports::{MutationCallback, MutationSource, ObserverHandle};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

enum NodeKind {
    Document,
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text {
        data: String,
    },
}

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

struct Registration {
    id: u64,
    target: NodeId,
    options: NormalizedOptions,
    callback: MutationCallback<MutationRecord>,
    queue: Vec<MutationRecord>,
}

/// What changed, for matching against observer options.
#[derive(Clone, Copy)]
enum Change<'a> {
    Attribute {
        name: &'a str,
        old_value: Option<&'a str>,
    },
    CharacterData {
        old_value: &'a str,
    },
    ChildList,
}

struct DomTree {
    nodes: Vec<NodeData>,
    registrations: Vec<Registration>,
    next_registration: u64,
}

impl DomTree {
    fn node(&self, id: NodeId) -> Result<&NodeData, DomError> {
        self.nodes.get(id.0).ok_or(DomError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData, DomError> {
        self.nodes.get_mut(id.0).ok_or(DomError::NodeNotFound(id))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn inclusive_ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = self.nodes.get(id.0).and_then(|n| n.parent);
        while let Some(node) = current {
            chain.push(node);
            current = self.nodes.get(node.0).and_then(|n| n.parent);
        }
        chain
    }

    fn siblings(&self, parent: NodeId, index: usize) -> (Option<NodeId>, Option<NodeId>) {
        let children = &self.nodes[parent.0].children;
        let previous = index.checked_sub(1).map(|i| children[i]);
        let next = children.get(index + 1).copied();
        (previous, next)
    }

    /// Queue a record for every registration interested in `change` on `target`.
    fn queue(&mut self, target: NodeId, change: Change<'_>, record: impl Fn() -> MutationRecord) {
        let ancestors = self.inclusive_ancestors(target);

        for registration in &mut self.registrations {
            let Some(depth) = ancestors.iter().position(|n| *n == registration.target) else {
                continue;
            };
            let options = &registration.options;
            if depth > 0 && !options.subtree {
                continue;
            }

            let old_value = match change {
                Change::Attribute { name, old_value } => {
                    if !options.attributes || !options.accepts_attribute(name) {
                        continue;
                    }
                    options.attribute_old_value.then_some(old_value).flatten()
                }
                Change::CharacterData { old_value } => {
                    if !options.character_data {
                        continue;
                    }
                    options.character_data_old_value.then_some(old_value)
                }
                Change::ChildList => {
                    if !options.child_list {
                        continue;
                    }
                    None
                }
            };

            let mut queued = record();
            queued.old_value = old_value.map(str::to_string);
            registration.queue.push(queued);
        }
    }

    fn detach(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let index = self
            .node(parent)?
            .children
            .iter()
            .position(|c| *c == child)
            .ok_or(DomError::NotAChild { parent, child })?;
        let (previous, next) = self.siblings(parent, index);

        self.queue(parent, Change::ChildList, || {
            MutationRecord::child_list(parent, Vec::new(), vec![child], previous, next)
        });

        self.node_mut(parent)?.children.remove(index);
        self.node_mut(child)?.parent = None;
        Ok(())
    }
}

/// Shared handle to an in-memory document.
///
/// Clones refer to the same tree.
#[derive(Clone)]
pub struct InMemoryDom {
    tree: Rc<RefCell<DomTree>>,
}

impl InMemoryDom {
    /// An empty document. Its root is [`InMemoryDom::document`].
    #[must_use]
    pub fn new() -> Self {
        let mut tree = DomTree {
            nodes: Vec::new(),
            registrations: Vec::new(),
            next_registration: 1,
        };
        tree.push(NodeKind::Document);
        Self {
            tree: Rc::new(RefCell::new(tree)),
        }
    }

    /// The document root.
    #[must_use]
    pub fn document(&self) -> NodeId {
        NodeId(0)
    }

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.tree.borrow_mut().push(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        })
    }

    /// Create a detached text node.
    pub fn create_text(&self, data: &str) -> NodeId {
        self.tree.borrow_mut().push(NodeKind::Text {
            data: data.to_string(),
        })
    }

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or last when `None`).
    ///
    /// A child that already has a parent is first removed from it, which
    /// observers of the old parent see as a separate removal record.
    pub fn insert_before(
        &self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        let mut tree = self.tree.borrow_mut();

        if matches!(tree.node(parent)?.kind, NodeKind::Text { .. }) {
            return Err(DomError::NotAnElement(parent));
        }
        if matches!(tree.node(child)?.kind, NodeKind::Document)
            || tree.inclusive_ancestors(parent).contains(&child)
        {
            return Err(DomError::HierarchyRequest { parent, child });
        }

        let mut reference = reference;
        if let Some(node) = reference {
            if tree.node(node)?.parent != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    child: node,
                });
            }
            if node == child {
                let children = &tree.node(parent)?.children;
                let index = children.iter().position(|c| *c == child).unwrap_or(0);
                reference = children.get(index + 1).copied();
            }
        }

        let old_parent = tree.node(child)?.parent;
        if let Some(old_parent) = old_parent {
            tree.detach(old_parent, child)?;
        }

        let children = &tree.node(parent)?.children;
        let index = match reference {
            Some(node) => children.iter().position(|c| *c == node).unwrap_or(children.len()),
            None => children.len(),
        };
        let previous = index.checked_sub(1).map(|i| children[i]);

        tree.queue(parent, Change::ChildList, || {
            MutationRecord::child_list(parent, vec![child], Vec::new(), previous, reference)
        });

        tree.node_mut(parent)?.children.insert(index, child);
        tree.node_mut(child)?.parent = Some(parent);
        trace!(%parent, %child, "Node inserted");
        Ok(())
    }

    /// Remove `child` from `parent`.
    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.tree.borrow_mut().detach(parent, child)
    }

    /// Set an attribute on an element. Queues a record even when the value
    /// is unchanged.
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let mut tree = self.tree.borrow_mut();
        let NodeKind::Element { attributes, .. } = &tree.node(node)?.kind else {
            return Err(DomError::NotAnElement(node));
        };
        let old_value = attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone());

        tree.queue(
            node,
            Change::Attribute {
                name,
                old_value: old_value.as_deref(),
            },
            || MutationRecord::attributes(node, name),
        );

        if let NodeKind::Element { attributes, .. } = &mut tree.node_mut(node)?.kind {
            match attributes.iter_mut().find(|(n, _)| n == name) {
                Some((_, v)) => *v = value.to_string(),
                None => attributes.push((name.to_string(), value.to_string())),
            }
        }
        Ok(())
    }

    /// Remove an attribute. Removing an absent attribute queues nothing.
    pub fn remove_attribute(&self, node: NodeId, name: &str) -> Result<(), DomError> {
        let mut tree = self.tree.borrow_mut();
        let NodeKind::Element { attributes, .. } = &tree.node(node)?.kind else {
            return Err(DomError::NotAnElement(node));
        };
        let Some(index) = attributes.iter().position(|(n, _)| n == name) else {
            return Ok(());
        };
        let old_value = attributes[index].1.clone();

        tree.queue(
            node,
            Change::Attribute {
                name,
                old_value: Some(&old_value),
            },
            || MutationRecord::attributes(node, name),
        );

        if let NodeKind::Element { attributes, .. } = &mut tree.node_mut(node)?.kind {
            attributes.remove(index);
        }
        Ok(())
    }

    /// Replace the data of a text node.
    pub fn set_data(&self, node: NodeId, data: &str) -> Result<(), DomError> {
        let mut tree = self.tree.borrow_mut();
        let NodeKind::Text { data: old_value } = &tree.node(node)?.kind else {
            return Err(DomError::NotAText(node));
        };
        let old_value = old_value.clone();

        tree.queue(
            node,
            Change::CharacterData {
                old_value: &old_value,
            },
            || MutationRecord::character_data(node),
        );

        if let NodeKind::Text { data: current } = &mut tree.node_mut(node)?.kind {
            *current = data.to_string();
        }
        Ok(())
    }

    /// Deliver every observer's queued records as one batch each, in
    /// registration order. Returns the number of batches delivered.
    pub fn flush(&self) -> usize {
        let deliveries: Vec<_> = {
            let mut tree = self.tree.borrow_mut();
            tree.registrations
                .iter_mut()
                .filter(|r| !r.queue.is_empty())
                .map(|r| (r.id, r.callback.clone(), std::mem::take(&mut r.queue)))
                .collect()
        };

        let mut delivered = 0;
        for (id, callback, records) in deliveries {
            // An earlier callback may have disconnected this observer.
            if !self.is_registered(id) {
                continue;
            }
            trace!(observer = id, records = records.len(), "Notifying observer");
            callback.call(records);
            delivered += 1;
        }
        delivered
    }

    /// Number of live observer registrations.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.tree.borrow().registrations.len()
    }

    /// Records queued but not yet delivered, across all observers.
    #[must_use]
    pub fn pending_records(&self) -> usize {
        self.tree
            .borrow()
            .registrations
            .iter()
            .map(|r| r.queue.len())
            .sum()
    }

    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        node.0 < self.tree.borrow().nodes.len()
    }

    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree.borrow().node(node).ok().and_then(|n| n.parent)
    }

    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.tree
            .borrow()
            .node(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Lowercased tag name, for elements.
    #[must_use]
    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        match &self.tree.borrow().node(node).ok()?.kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            NodeKind::Document | NodeKind::Text { .. } => None,
        }
    }

    #[must_use]
    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        match &self.tree.borrow().node(node).ok()?.kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone()),
            NodeKind::Document | NodeKind::Text { .. } => None,
        }
    }

    /// Data of a text node.
    #[must_use]
    pub fn data(&self, node: NodeId) -> Option<String> {
        match &self.tree.borrow().node(node).ok()?.kind {
            NodeKind::Text { data } => Some(data.clone()),
            NodeKind::Document | NodeKind::Element { .. } => None,
        }
    }

    fn is_registered(&self, id: u64) -> bool {
        self.tree.borrow().registrations.iter().any(|r| r.id == id)
    }
}

impl Default for InMemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryDom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree.borrow();
        f.debug_struct("InMemoryDom")
            .field("nodes", &tree.nodes.len())
            .field("observers", &tree.registrations.len())
            .finish()
    }
}

impl MutationSource for InMemoryDom {
    type Target = NodeId;
    type Record = MutationRecord;
    type Observer = InMemoryObserver;

    fn observe(
        &self,
        target: &NodeId,
        options: &NormalizedOptions,
        callback: MutationCallback<MutationRecord>,
    ) -> Result<InMemoryObserver, ObserveError> {
        let mut tree = self.tree.borrow_mut();
        if tree.node(*target).is_err() {
            return Err(ObserveError::UnknownTarget(*target));
        }

        let id = tree.next_registration;
        tree.next_registration += 1;
        tree.registrations.push(Registration {
            id,
            target: *target,
            options: options.clone(),
            callback,
            queue: Vec::new(),
        });
        debug!(observer = id, %target, "In-memory observer registered");

        Ok(InMemoryObserver {
            tree: Rc::downgrade(&self.tree),
            id,
        })
    }
}

/// Registration handle returned by [`InMemoryDom`].
pub struct InMemoryObserver {
    tree: Weak<RefCell<DomTree>>,
    id: u64,
}

impl ObserverHandle for InMemoryObserver {
    fn disconnect(&mut self) {
        let Some(tree) = self.tree.upgrade() else {
            return;
        };
        let mut tree = tree.borrow_mut();
        let before = tree.registrations.len();
        tree.registrations.retain(|r| r.id != self.id);
        if tree.registrations.len() != before {
            debug!(observer = self.id, "In-memory observer disconnected");
        }
    }
}
