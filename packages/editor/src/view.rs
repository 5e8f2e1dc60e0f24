//! # View
//!
//! The projected document the user works on: a [`Tree`] of view nodes plus
//! the display state of each node (captions, flags, collapse state).
//!
//! The view is the source of truth while editing. The model that schema
//! predicates see is harvested from it (see [`crate::harvest`]). Every
//! structural change goes through a method here and bumps the view's
//! generation, which is what lets the harvest cache notice staleness.

use std::collections::HashMap;
use xedit_model::{serialize_document, ElementRef, Namespaces, NodeId, NodeKind, Tree};

/// Display state of one view node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub display_name: String,
    pub title: String,
    /// Inline caption, shown after the opening tag (or after the element
    /// when it is a oneliner)
    pub caption: Option<String>,
    /// Replaces the children display of an element without child elements,
    /// or the value display of an attribute
    pub display_value: Option<String>,
    pub background_colour: String,
    /// Preview shown in place of the children of a collapsed element
    pub collapsoid: String,

    pub has_text: bool,
    pub oneliner: bool,
    pub collapsible: bool,
    pub collapsed: bool,
    pub read_only: bool,
    pub invisible: bool,
    pub draggable: bool,
    pub has_menu: bool,
    pub has_inline_menu: bool,
    pub no_children: bool,
    /// Shy attributes are showing
    pub rolled_out: bool,
    /// The element has shy attributes, so its rollouter is shown
    pub has_shy: bool,
    pub shy: bool,
    /// The text node is empty
    pub empty: bool,
    /// The text node is whitespace only
    pub whitespace: bool,
    pub focusable: bool,
    pub is_url: bool,
    pub invalid: bool,
}

pub struct View {
    pub(crate) tree: Tree,
    pub(crate) states: HashMap<NodeId, ViewState>,
    root: NodeId,
    namespaces: Namespaces,
    layby: Vec<NodeId>,
    layby_open: bool,
    generation: u64,
}

impl View {
    pub(crate) fn from_parts(
        tree: Tree,
        states: HashMap<NodeId, ViewState>,
        root: NodeId,
        namespaces: Namespaces,
    ) -> Self {
        Self {
            tree,
            states,
            root,
            namespaces,
            layby: Vec::new(),
            layby_open: false,
            generation: 0,
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn root(&self) -> ElementRef<'_> {
        // The root is only ever replaced by another element (see `replace`).
        self.tree
            .element(self.root)
            .expect("view root is always an element")
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    /// Counter of structural changes
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn bump(&mut self) {
        self.generation += 1;
    }

    pub fn state(&self, id: NodeId) -> Option<&ViewState> {
        self.states.get(&id)
    }

    /// Display state is not structure: changing it leaves harvests valid.
    pub fn state_mut(&mut self, id: NodeId) -> &mut ViewState {
        self.states.entry(id).or_default()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.tree.contains(id)
    }

    /// Root followed by the layby elements
    pub fn tops(&self) -> Vec<NodeId> {
        let mut tops = vec![self.root];
        tops.extend(self.layby.iter().copied());
        tops
    }

    /// Whether a node is part of the document or the layby
    pub fn is_attached(&self, id: NodeId) -> bool {
        if !self.tree.contains(id) {
            return false;
        }
        let top = self.tree.top(id);
        top == self.root || self.layby.contains(&top)
    }

    pub fn in_layby(&self, id: NodeId) -> bool {
        self.tree.contains(id) && self.layby.contains(&self.tree.top(id))
    }

    // --- Layby ------------------------------------------------------------

    pub fn layby(&self) -> &[NodeId] {
        &self.layby
    }

    pub fn is_layby_open(&self) -> bool {
        self.layby_open
    }

    pub fn set_layby_open(&mut self, open: bool) {
        self.layby_open = open;
    }

    /// Park a node in the layby, detaching it from wherever it was
    pub fn push_layby(&mut self, id: NodeId) -> bool {
        if !self.tree.is_element(id) || id == self.root || self.layby.contains(&id) {
            return false;
        }
        self.tree.detach(id);
        self.layby.push(id);
        self.bump();
        true
    }

    pub fn clear_layby(&mut self) {
        for id in std::mem::take(&mut self.layby) {
            self.drop_subtree(id);
        }
        self.bump();
    }

    // --- Structure --------------------------------------------------------

    /// Create a detached text node
    pub fn new_text(&mut self, value: impl Into<String>) -> NodeId {
        let id = self.tree.new_text(value);
        self.states.insert(id, ViewState::default());
        id
    }

    /// Create a detached attribute
    pub fn new_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) -> NodeId {
        let id = self.tree.new_attribute(name, value);
        self.states.insert(id, ViewState::default());
        id
    }

    /// Copy a node and its subtree, display state included, under fresh
    /// identities. The copy is detached.
    pub fn duplicate(&mut self, id: NodeId) -> Option<NodeId> {
        let mut scratch = Tree::new();
        self.tree.copy_subtree(id, &mut scratch, true)?;
        let (copy, pairs) = self.graft(&scratch, id)?;
        for (original, new) in pairs {
            if let Some(state) = self.states.get(&original).cloned() {
                self.states.insert(new, state);
            }
        }
        Some(copy)
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> bool {
        self.layby.retain(|l| *l != child);
        let done = self.tree.insert_child(parent, index, child);
        if done {
            self.bump();
        }
        done
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let index = self.tree.children(parent).len();
        self.insert_child(parent, index, child)
    }

    pub fn insert_attribute(&mut self, element: NodeId, index: usize, attribute: NodeId) -> bool {
        let done = self.tree.insert_attribute(element, index, attribute);
        if done {
            self.bump();
        }
        done
    }

    pub fn append_attribute(&mut self, element: NodeId, attribute: NodeId) -> bool {
        let index = self.tree.attributes(element).len();
        self.insert_attribute(element, index, attribute)
    }

    pub fn detach(&mut self, id: NodeId) -> Option<(NodeId, usize)> {
        let was_parked = self.layby.contains(&id);
        self.layby.retain(|l| *l != id);
        let detached = self.tree.detach(id);
        if detached.is_some() || was_parked {
            self.bump();
        }
        detached
    }

    /// Drop a node, its subtree and their display state
    pub fn remove(&mut self, id: NodeId) -> bool {
        if !self.tree.contains(id) || id == self.root {
            return false;
        }
        self.layby.retain(|l| *l != id);
        self.drop_subtree(id);
        self.bump();
        true
    }

    fn drop_subtree(&mut self, id: NodeId) {
        for node in self.tree.descendants(id) {
            self.states.remove(&node);
        }
        self.tree.remove_subtree(id);
    }

    /// Put `nodes` where `old` is and drop `old`.
    ///
    /// Replacing the root is only possible with exactly one element.
    pub fn replace(&mut self, old: NodeId, nodes: &[NodeId]) -> bool {
        if old == self.root {
            let [new_root] = nodes else {
                return false;
            };
            if !self.tree.is_element(*new_root) {
                return false;
            }
            self.tree.detach(*new_root);
            self.drop_subtree(old);
            self.root = *new_root;
            self.bump();
            return true;
        }
        if let Some(slot) = self.layby.iter().position(|l| *l == old) {
            if !nodes.iter().all(|n| self.tree.is_element(*n)) {
                return false;
            }
            self.layby.remove(slot);
            for (offset, n) in nodes.iter().enumerate() {
                self.tree.detach(*n);
                self.layby.insert(slot + offset, *n);
            }
            self.drop_subtree(old);
            self.bump();
            return true;
        }
        let Some(parent) = self.tree.parent_of(old) else {
            return false;
        };
        let Some(mut index) = self.tree.index_in_parent(old) else {
            return false;
        };
        for n in nodes {
            if self.tree.insert_child(parent, index, *n) {
                index += 1;
            }
        }
        self.drop_subtree(old);
        self.bump();
        true
    }

    /// Move a node under a new parent at `index`
    pub fn reparent(&mut self, id: NodeId, parent: NodeId, index: usize) -> bool {
        self.layby.retain(|l| *l != id);
        let done = self.tree.reparent(id, parent, index);
        if done {
            self.bump();
        }
        done
    }

    pub fn reorder_children(&mut self, id: NodeId, order: Vec<NodeId>) -> bool {
        let done = self.tree.reorder_children(id, order);
        if done {
            self.bump();
        }
        done
    }

    pub fn reorder_attributes(&mut self, id: NodeId, order: Vec<NodeId>) -> bool {
        let done = self.tree.reorder_attributes(id, order);
        if done {
            self.bump();
        }
        done
    }

    /// Change the value of an attribute or text node in place
    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) -> bool {
        let done = self.tree.set_value(id, value);
        if done {
            self.bump();
        }
        done
    }

    /// Copy a subtree of `src` into the view under fresh identities.
    ///
    /// Returns the copy together with (source, copy) identity pairs.
    pub fn graft(&mut self, src: &Tree, src_id: NodeId) -> Option<(NodeId, Vec<(NodeId, NodeId)>)> {
        let (copy, pairs) = src.copy_subtree_mapped(src_id, &mut self.tree)?;
        for (_, id) in &pairs {
            self.states.entry(*id).or_default();
        }
        self.bump();
        Some((copy, pairs))
    }

    /// Node kinds as a short label, for log fields
    pub fn kind_label(&self, id: NodeId) -> &'static str {
        match self.tree.kind(id) {
            Some(NodeKind::Element(_)) => "element",
            Some(NodeKind::Attribute { .. }) => "attribute",
            Some(NodeKind::Text { .. }) => "text",
            None => "missing",
        }
    }

    /// Serialize the document straight from the view
    pub fn to_xml(&self) -> String {
        serialize_document(&self.tree, self.root, &self.namespaces)
    }
}

/// Char ranges `(start, end)` of the whitespace-separated tokens of a text.
///
/// A text with no token at all (empty or whitespace) still has one empty
/// token at its start, so every text node has an addressable unit.
pub fn text_tokens(value: &str) -> Vec<(usize, usize)> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in value.chars().enumerate() {
        match (c.is_whitespace(), start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                tokens.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push((s, value.chars().count()));
    }
    if tokens.is_empty() {
        tokens.push((0, 0));
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (View, NodeId, NodeId) {
        let mut tree = Tree::new();
        let root = tree.new_element("a", "a");
        let b = tree.new_element("b", "b");
        tree.append_child(root, b);
        let view = View::from_parts(tree, HashMap::new(), root, Namespaces::new());
        (view, root, b)
    }

    #[test]
    fn test_text_tokens() {
        assert_eq!(text_tokens("one two"), vec![(0, 3), (4, 7)]);
        assert_eq!(text_tokens("  x "), vec![(2, 3)]);
        assert_eq!(text_tokens(""), vec![(0, 0)]);
        assert_eq!(text_tokens("   "), vec![(0, 0)]);
        assert_eq!(text_tokens("čaj je"), vec![(0, 3), (4, 6)]);
    }

    #[test]
    fn test_structural_changes_bump_generation() {
        let (mut view, root, b) = sample();
        let start = view.generation();

        let text = view.new_text("x");
        assert_eq!(view.generation(), start);

        assert!(view.append_child(b, text));
        assert!(view.generation() > start);

        let before = view.generation();
        view.state_mut(b).collapsed = true;
        assert_eq!(view.generation(), before);

        assert!(view.set_value(text, "y"));
        assert!(view.generation() > before);
        assert_eq!(view.to_xml(), "<a><b xml:space='preserve'>y</b></a>");
        assert_eq!(view.tops(), vec![root]);
    }

    #[test]
    fn test_layby_parking() {
        let (mut view, root, b) = sample();
        assert!(view.push_layby(b));
        assert!(view.tree().children(root).is_empty());
        assert!(view.in_layby(b));
        assert!(view.is_attached(b));
        assert!(!view.push_layby(root));

        assert!(view.append_child(root, b));
        assert!(view.layby().is_empty());
        assert!(!view.in_layby(b));
    }

    #[test]
    fn test_replace_root_needs_one_element() {
        let (mut view, root, _) = sample();
        let text = view.new_text("x");
        assert!(!view.replace(root, &[text]));

        let new_root = view.tree.new_element("z", "z");
        assert!(view.replace(root, &[new_root]));
        assert_eq!(view.root_id(), new_root);
        assert!(!view.contains(root));
    }

    #[test]
    fn test_duplicate_keeps_state() {
        let (mut view, root, b) = sample();
        view.state_mut(b).collapsed = true;
        let copy = view.duplicate(b).unwrap();
        assert_ne!(copy, b);
        assert!(view.state(copy).unwrap().collapsed);
        assert!(view.tree().parent_of(copy).is_none());
        assert!(view.append_child(root, copy));
        assert_eq!(view.to_xml(), "<a><b/><b/></a>");
    }

    #[test]
    fn test_remove_drops_state() {
        let (mut view, root, b) = sample();
        view.state_mut(b).caption = Some("c".into());
        assert!(view.remove(b));
        assert!(view.state(b).is_none());
        assert!(!view.remove(root));
    }
}
