//! Borrowed, read-only handles onto nodes of a [`Tree`].
//!
//! These are what schema predicates receive: cheap `Copy` views that answer
//! the structural queries (attributes, siblings, text) without owning data.

use crate::id_generator::NodeId;
use crate::tree::{ElementData, NodeKind, Tree};

#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    tree: &'a Tree,
    id: NodeId,
    data: &'a ElementData,
    parent_override: Option<NodeId>,
}

#[derive(Clone, Copy)]
pub struct AttributeRef<'a> {
    tree: &'a Tree,
    id: NodeId,
    name: &'a str,
    value: &'a str,
}

#[derive(Clone, Copy)]
pub struct TextRef<'a> {
    tree: &'a Tree,
    id: NodeId,
    value: &'a str,
}

#[derive(Clone, Copy)]
pub enum NodeRef<'a> {
    Element(ElementRef<'a>),
    Attribute(AttributeRef<'a>),
    Text(TextRef<'a>),
}

impl<'a> ElementRef<'a> {
    pub(crate) fn new(tree: &'a Tree, id: NodeId) -> Option<Self> {
        let data = tree.element_data(id)?;
        Some(Self {
            tree,
            id,
            data,
            parent_override: None,
        })
    }

    /// The same element, answering `parent()` as if it lived under `parent`.
    ///
    /// Used to ask predicates about a hypothetical placement (drag and drop)
    /// without touching the tree.
    pub fn with_parent(self, parent: NodeId) -> Self {
        Self {
            parent_override: Some(parent),
            ..self
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    /// Definition id (schema key)
    pub fn name(&self) -> &'a str {
        let data = self.data;
        &data.definition_id
    }

    /// Raw tag name
    pub fn element_name(&self) -> &'a str {
        let data = self.data;
        &data.tag_name
    }

    pub fn parent(&self) -> Option<ElementRef<'a>> {
        let tree = self.tree;
        let parent = self.parent_override.or_else(|| tree.parent_of(self.id))?;
        tree.element(parent)
    }

    pub fn attributes(&self) -> impl Iterator<Item = AttributeRef<'a>> + 'a {
        let tree = self.tree;
        let data = self.data;
        data.attributes.iter().filter_map(move |id| tree.attribute(*id))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        let data = self.data;
        data.children.iter().filter_map(move |id| tree.node(*id))
    }

    pub fn child_ids(&self) -> &'a [NodeId] {
        let data = self.data;
        &data.children
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn attribute(&self, name: &str) -> Option<AttributeRef<'a>> {
        self.attributes().find(|a| a.name() == name)
    }

    pub fn attribute_value(&self, name: &str) -> Option<&'a str> {
        self.attribute(name).map(|a| a.value())
    }

    /// Any child element at all
    pub fn has_elements(&self) -> bool {
        let tree = self.tree;
        self.data.children.iter().any(|c| tree.is_element(*c))
    }

    /// Any child text node, including empty ones
    pub fn has_text(&self) -> bool {
        let tree = self.tree;
        self.data.children.iter().any(|c| tree.is_text(*c))
    }

    /// Whether the element with this identity is one of our children
    pub fn has_child_element(&self, id: NodeId) -> bool {
        let tree = self.tree;
        self.data.children.iter().any(|c| *c == id && tree.is_element(*c))
    }

    /// Concatenation of all descendant text in document order
    pub fn get_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in self.children() {
            match child {
                NodeRef::Text(text) => out.push_str(text.value()),
                NodeRef::Element(el) => el.collect_text(out),
                NodeRef::Attribute(_) => {}
            }
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.children().filter_map(|c| c.as_element())
    }

    /// Child elements with the given definition id
    pub fn child_elements_named(&self, definition_id: &str) -> Vec<ElementRef<'a>> {
        self.child_elements().filter(|c| c.name() == definition_id).collect()
    }

    /// All descendant elements with the given definition id, in document order
    pub fn descendant_elements(&self, definition_id: &str) -> Vec<ElementRef<'a>> {
        let mut out = Vec::new();
        for child in self.child_elements() {
            if child.name() == definition_id {
                out.push(child);
            }
            out.extend(child.descendant_elements(definition_id));
        }
        out
    }

    /// Nearest element sibling before this one; text siblings are skipped
    pub fn preceding_sibling(&self) -> Option<ElementRef<'a>> {
        let tree = self.tree;
        let siblings = tree.children(tree.parent_of(self.id)?);
        let index = siblings.iter().position(|s| *s == self.id)?;
        siblings[..index].iter().rev().find_map(|s| tree.element(*s))
    }

    /// Nearest element sibling after this one; text siblings are skipped
    pub fn following_sibling(&self) -> Option<ElementRef<'a>> {
        let tree = self.tree;
        let siblings = tree.children(tree.parent_of(self.id)?);
        let index = siblings.iter().position(|s| *s == self.id)?;
        siblings[index + 1..].iter().find_map(|s| tree.element(*s))
    }
}

impl<'a> AttributeRef<'a> {
    pub(crate) fn new(tree: &'a Tree, id: NodeId) -> Option<Self> {
        match tree.kind(id)? {
            NodeKind::Attribute { name, value } => Some(Self {
                tree,
                id,
                name,
                value,
            }),
            _ => None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn value(&self) -> &'a str {
        self.value
    }

    pub fn parent(&self) -> Option<ElementRef<'a>> {
        let tree = self.tree;
        tree.element(tree.parent_of(self.id)?)
    }
}

impl<'a> TextRef<'a> {
    pub(crate) fn new(tree: &'a Tree, id: NodeId) -> Option<Self> {
        match tree.kind(id)? {
            NodeKind::Text { value } => Some(Self { tree, id, value }),
            _ => None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn value(&self) -> &'a str {
        self.value
    }

    pub fn parent(&self) -> Option<ElementRef<'a>> {
        let tree = self.tree;
        tree.element(tree.parent_of(self.id)?)
    }
}

impl<'a> NodeRef<'a> {
    pub(crate) fn new(tree: &'a Tree, id: NodeId) -> Option<Self> {
        match tree.kind(id)? {
            NodeKind::Element(_) => ElementRef::new(tree, id).map(NodeRef::Element),
            NodeKind::Attribute { .. } => AttributeRef::new(tree, id).map(NodeRef::Attribute),
            NodeKind::Text { .. } => TextRef::new(tree, id).map(NodeRef::Text),
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            NodeRef::Element(n) => n.id(),
            NodeRef::Attribute(n) => n.id(),
            NodeRef::Text(n) => n.id(),
        }
    }

    pub fn parent(&self) -> Option<ElementRef<'a>> {
        match self {
            NodeRef::Element(n) => n.parent(),
            NodeRef::Attribute(n) => n.parent(),
            NodeRef::Text(n) => n.parent(),
        }
    }

    pub fn as_element(&self) -> Option<ElementRef<'a>> {
        match self {
            NodeRef::Element(el) => Some(*el),
            _ => None,
        }
    }

    pub fn as_attribute(&self) -> Option<AttributeRef<'a>> {
        match self {
            NodeRef::Attribute(at) => Some(*at),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<TextRef<'a>> {
        match self {
            NodeRef::Text(t) => Some(*t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{parse_document, ResolveByTagName};

    #[test]
    fn test_sibling_queries_skip_text() {
        let doc = parse_document("<a><b/>x<c/>y<d/></a>", &ResolveByTagName).unwrap();
        let root = doc.root();
        let c = root.child_elements_named("c")[0];

        assert_eq!(c.preceding_sibling().map(|e| e.name()), Some("b"));
        assert_eq!(c.following_sibling().map(|e| e.name()), Some("d"));
        assert!(root.child_elements_named("b")[0].preceding_sibling().is_none());
        assert!(root.child_elements_named("d")[0].following_sibling().is_none());
    }

    #[test]
    fn test_get_text_concatenates_descendants() {
        let doc = parse_document("<a>one <b>two <c>three</c></b> four</a>", &ResolveByTagName).unwrap();
        assert_eq!(doc.root().get_text(), "one two three four");
        assert!(doc.root().has_text());
        assert!(doc.root().has_elements());
    }

    #[test]
    fn test_descendant_elements_filters_by_definition() {
        let doc = parse_document("<a><b><c/></b><c><c/></c></a>", &ResolveByTagName).unwrap();
        assert_eq!(doc.root().descendant_elements("c").len(), 3);
        assert_eq!(doc.root().child_elements_named("c").len(), 1);
    }

    #[test]
    fn test_attribute_lookup() {
        let doc = parse_document("<a x='1' y=''/>", &ResolveByTagName).unwrap();
        let root = doc.root();
        assert_eq!(root.attribute_value("x"), Some("1"));
        assert_eq!(root.attribute_value("y"), Some(""));
        assert!(!root.has_attribute("z"));
        assert_eq!(root.attribute("x").and_then(|a| a.parent()).map(|p| p.id()), Some(root.id()));
    }

    #[test]
    fn test_parent_override() {
        let doc = parse_document("<a><b/><c/></a>", &ResolveByTagName).unwrap();
        let root = doc.root();
        let b = root.child_elements_named("b")[0];
        let c = root.child_elements_named("c")[0];

        let moved = c.with_parent(b.id());
        assert_eq!(moved.parent().map(|p| p.name()), Some("b"));
        assert_eq!(c.parent().map(|p| p.name()), Some("a"));
    }
}
