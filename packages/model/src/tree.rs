//! # Node Arena
//!
//! All nodes of a document live in one [`Tree`], addressed by [`NodeId`].
//! Parents are stored as handles next to each node and are updated by every
//! structural operation, so no query ever has to search for a parent.

use crate::id_generator::{IdGenerator, NodeId};
use crate::node_ref::{AttributeRef, ElementRef, NodeRef, TextRef};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    /// Schema key of the element
    pub definition_id: String,
    /// Raw XML tag name
    pub tag_name: String,
    pub attributes: Vec<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element(ElementData),
    Attribute { name: String, value: String },
    Text { value: String },
}

impl NodeKind {
    pub fn is_element(&self) -> bool {
        matches!(self, NodeKind::Element(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, NodeKind::Text { .. })
    }

    pub fn is_attribute(&self) -> bool {
        matches!(self, NodeKind::Attribute { .. })
    }
}

#[derive(Debug, Clone)]
pub struct NodeData {
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: HashMap<NodeId, NodeData>,
    ids: IdGenerator,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(&id)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(&id).map(|n| &n.kind)
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn element_data(&self, id: NodeId) -> Option<&ElementData> {
        match self.kind(id) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    fn element_data_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.kind(id).map(NodeKind::is_element).unwrap_or(false)
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.kind(id).map(NodeKind::is_text).unwrap_or(false)
    }

    pub fn is_attribute(&self, id: NodeId) -> bool {
        self.kind(id).map(NodeKind::is_attribute).unwrap_or(false)
    }

    // --- Construction -----------------------------------------------------

    /// Create a detached element
    pub fn new_element(&mut self, definition_id: impl Into<String>, tag_name: impl Into<String>) -> NodeId {
        let id = self.ids.new_id();
        self.insert_with_id(
            id,
            NodeKind::Element(ElementData {
                definition_id: definition_id.into(),
                tag_name: tag_name.into(),
                attributes: Vec::new(),
                children: Vec::new(),
            }),
        )
    }

    /// Create a detached attribute
    pub fn new_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) -> NodeId {
        let id = self.ids.new_id();
        self.insert_with_id(
            id,
            NodeKind::Attribute {
                name: name.into(),
                value: value.into(),
            },
        )
    }

    /// Create a detached text node
    pub fn new_text(&mut self, value: impl Into<String>) -> NodeId {
        let id = self.ids.new_id();
        self.insert_with_id(id, NodeKind::Text { value: value.into() })
    }

    /// Insert a detached node under a caller-chosen identity.
    ///
    /// Element kinds are inserted with empty attribute and child lists; their
    /// members have to be attached afterwards.
    pub fn insert_with_id(&mut self, id: NodeId, kind: NodeKind) -> NodeId {
        self.ids.observe(id);
        let kind = match kind {
            NodeKind::Element(el) => NodeKind::Element(ElementData {
                attributes: Vec::new(),
                children: Vec::new(),
                ..el
            }),
            other => other,
        };
        self.nodes.insert(id, NodeData { parent: None, kind });
        id
    }

    // --- Structure --------------------------------------------------------

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.element_data(id).map(|el| el.children.as_slice()).unwrap_or(&[])
    }

    pub fn attributes(&self, id: NodeId) -> &[NodeId] {
        self.element_data(id).map(|el| el.attributes.as_slice()).unwrap_or(&[])
    }

    /// Position of a node in its parent's child list (or attribute list)
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent_of(id)?;
        let el = self.element_data(parent)?;
        let list = if self.is_attribute(id) { &el.attributes } else { &el.children };
        list.iter().position(|c| *c == id)
    }

    /// Whether `ancestor` is `id` or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.parent_of(c);
        }
        false
    }

    /// Topmost ancestor of a node (the node itself when detached)
    pub fn top(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            current = parent;
        }
        current
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let index = self.children(parent).len();
        self.insert_child(parent, index, child)
    }

    /// Attach an element or text node at `index` among `parent`'s children.
    ///
    /// The child is detached from its previous parent first. Refuses to
    /// create a cycle or to put an attribute into a child list.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> bool {
        if self.is_attribute(child) || !self.contains(child) || !self.is_element(parent) {
            return false;
        }
        if self.is_ancestor_or_self(child, parent) {
            return false;
        }
        self.detach(child);
        let Some(el) = self.element_data_mut(parent) else {
            return false;
        };
        let index = index.min(el.children.len());
        el.children.insert(index, child);
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        true
    }

    pub fn append_attribute(&mut self, element: NodeId, attribute: NodeId) -> bool {
        let index = self.attributes(element).len();
        self.insert_attribute(element, index, attribute)
    }

    pub fn insert_attribute(&mut self, element: NodeId, index: usize, attribute: NodeId) -> bool {
        if !self.is_attribute(attribute) || !self.is_element(element) {
            return false;
        }
        self.detach(attribute);
        let Some(el) = self.element_data_mut(element) else {
            return false;
        };
        let index = index.min(el.attributes.len());
        el.attributes.insert(index, attribute);
        if let Some(node) = self.nodes.get_mut(&attribute) {
            node.parent = Some(element);
        }
        true
    }

    /// Unlink a node from its parent, keeping it (and its subtree) in the arena.
    ///
    /// Returns the former parent and position.
    pub fn detach(&mut self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent_of(id)?;
        let index = self.index_in_parent(id)?;
        let is_attribute = self.is_attribute(id);
        if let Some(el) = self.element_data_mut(parent) {
            if is_attribute {
                el.attributes.remove(index);
            } else {
                el.children.remove(index);
            }
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = None;
        }
        Some((parent, index))
    }

    /// Move a node under a new parent at `index`
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId, index: usize) -> bool {
        if self.is_attribute(id) {
            self.insert_attribute(new_parent, index, id)
        } else {
            self.insert_child(new_parent, index, id)
        }
    }

    /// Detach a node and drop it together with everything below it
    pub fn remove_subtree(&mut self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.detach(id);
        for node in self.descendants(id) {
            self.nodes.remove(&node);
        }
        true
    }

    /// Pre-order list of a node, its attributes and all its descendants
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            if let Some(el) = self.element_data(current) {
                stack.extend(el.children.iter().rev());
                stack.extend(el.attributes.iter().rev());
            }
        }
        out
    }

    /// Replace the child list of an element with a permutation of itself
    pub fn reorder_children(&mut self, id: NodeId, order: Vec<NodeId>) -> bool {
        let Some(el) = self.element_data_mut(id) else {
            return false;
        };
        if !is_permutation(&el.children, &order) {
            return false;
        }
        el.children = order;
        true
    }

    /// Replace the attribute list of an element with a permutation of itself
    pub fn reorder_attributes(&mut self, id: NodeId, order: Vec<NodeId>) -> bool {
        let Some(el) = self.element_data_mut(id) else {
            return false;
        };
        if !is_permutation(&el.attributes, &order) {
            return false;
        }
        el.attributes = order;
        true
    }

    // --- Values -----------------------------------------------------------

    /// Value of an attribute or text node
    pub fn value(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Attribute { value, .. } | NodeKind::Text { value } => Some(value),
            NodeKind::Element(_) => None,
        }
    }

    /// Replace the value of an attribute or text node in place
    pub fn set_value(&mut self, id: NodeId, new_value: impl Into<String>) -> bool {
        match self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            Some(NodeKind::Attribute { value, .. }) | Some(NodeKind::Text { value }) => {
                *value = new_value.into();
                true
            }
            _ => false,
        }
    }

    /// Upsert an attribute: update in place if present, else append.
    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: impl Into<String>) -> Option<NodeId> {
        let existing = self.element(element)?.attribute(name).map(|a| a.id());
        match existing {
            Some(id) => {
                self.set_value(id, value);
                Some(id)
            }
            None => {
                let id = self.new_attribute(name, value);
                self.append_attribute(element, id);
                Some(id)
            }
        }
    }

    /// Append a text child
    pub fn add_text(&mut self, element: NodeId, value: impl Into<String>) -> Option<NodeId> {
        if !self.is_element(element) {
            return None;
        }
        let id = self.new_text(value);
        self.append_child(element, id);
        Some(id)
    }

    pub fn set_definition_id(&mut self, id: NodeId, definition_id: impl Into<String>) -> bool {
        match self.element_data_mut(id) {
            Some(el) => {
                el.definition_id = definition_id.into();
                true
            }
            None => false,
        }
    }

    // --- Copying ----------------------------------------------------------

    /// Copy a subtree into `dest`, detached.
    ///
    /// With `keep_ids` every copied node keeps its identity; otherwise `dest`
    /// issues fresh identities.
    pub fn copy_subtree(&self, id: NodeId, dest: &mut Tree, keep_ids: bool) -> Option<NodeId> {
        let data = self.nodes.get(&id)?;
        let new_id = if keep_ids { id } else { dest.ids.new_id() };
        dest.insert_with_id(new_id, data.kind.clone());
        if let NodeKind::Element(el) = &data.kind {
            for &attr in &el.attributes {
                if let Some(copied) = self.copy_subtree(attr, dest, keep_ids) {
                    dest.append_attribute(new_id, copied);
                }
            }
            for &child in &el.children {
                if let Some(copied) = self.copy_subtree(child, dest, keep_ids) {
                    dest.append_child(new_id, copied);
                }
            }
        }
        Some(new_id)
    }

    /// Pairs of (source, copy) identities produced by a fresh-id copy
    pub fn copy_subtree_mapped(&self, id: NodeId, dest: &mut Tree) -> Option<(NodeId, Vec<(NodeId, NodeId)>)> {
        let copied = self.copy_subtree(id, dest, false)?;
        let pairs = self
            .descendants(id)
            .into_iter()
            .zip(dest.descendants(copied))
            .collect();
        Some((copied, pairs))
    }

    // --- Borrowed handles -------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        NodeRef::new(self, id)
    }

    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        ElementRef::new(self, id)
    }

    pub fn attribute(&self, id: NodeId) -> Option<AttributeRef<'_>> {
        AttributeRef::new(self, id)
    }

    pub fn text(&self, id: NodeId) -> Option<TextRef<'_>> {
        TextRef::new(self, id)
    }
}

fn is_permutation(current: &[NodeId], order: &[NodeId]) -> bool {
    if current.len() != order.len() {
        return false;
    }
    let mut a = current.to_vec();
    let mut b = order.to_vec();
    a.sort();
    b.sort();
    a == b
}
