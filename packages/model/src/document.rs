//! # Documents
//!
//! A [`Document`] is a [`Tree`] together with its root element and the
//! namespace declarations collected while parsing.

use crate::error::ModelError;
use crate::id_generator::NodeId;
use crate::node_ref::ElementRef;
use crate::parser::{parse_document, ResolveElementId};
use crate::serializer::serialize_document;
use crate::tree::Tree;
use tracing::error;

/// Document used when the input cannot be parsed
pub const PLACEHOLDER_DOCUMENT: &str = "<entry/>";

/// Namespace declarations (`xmlns`, `xmlns:*`) in declaration order.
///
/// They are lifted off whatever element declared them and emitted again on
/// the root element only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespaces {
    entries: Vec<(String, String)>,
}

impl Namespaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an attribute name declares a namespace
    pub fn is_declaration(name: &str) -> bool {
        name == "xmlns" || name.starts_with("xmlns:")
    }

    /// Record a declaration; a later declaration of the same name wins
    pub fn insert(&mut self, name: impl Into<String>, uri: impl Into<String>) {
        let name = name.into();
        let uri = uri.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = uri,
            None => self.entries.push((name, uri)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    tree: Tree,
    root: NodeId,
    namespaces: Namespaces,
}

impl Document {
    /// Wrap a tree whose `root` is an element
    pub fn new(tree: Tree, root: NodeId, namespaces: Namespaces) -> Option<Self> {
        if !tree.is_element(root) {
            return None;
        }
        Some(Self {
            tree,
            root,
            namespaces,
        })
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn root(&self) -> ElementRef<'_> {
        // The constructor checks that the root is an element and nothing
        // hands out mutable access to the tree.
        self.tree
            .element(self.root)
            .expect("document root is always an element")
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    pub fn into_parts(self) -> (Tree, NodeId, Namespaces) {
        (self.tree, self.root, self.namespaces)
    }

    /// Canonical XML of the whole document
    pub fn to_xml(&self) -> String {
        serialize_document(&self.tree, self.root, &self.namespaces)
    }
}

/// Parse `xml`, falling back to `placeholder` when it is malformed.
///
/// The parse error is logged once and handed back so the caller can surface
/// it; the returned document is always usable.
pub fn load_or_placeholder(
    xml: &str,
    resolver: &dyn ResolveElementId,
    placeholder: &str,
) -> (Document, Option<ModelError>) {
    match parse_document(xml, resolver) {
        Ok(doc) => (doc, None),
        Err(err) => {
            error!(error = %err, "Document failed to parse, substituting placeholder");
            let doc = parse_document(placeholder, resolver)
                .or_else(|_| parse_document(PLACEHOLDER_DOCUMENT, resolver));
            match doc {
                Ok(doc) => (doc, Some(err)),
                Err(_) => {
                    let mut tree = Tree::new();
                    let root = tree.new_element(resolver.resolve("entry", None), "entry");
                    let doc = Document {
                        tree,
                        root,
                        namespaces: Namespaces::new(),
                    };
                    (doc, Some(err))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResolveByTagName;

    #[test]
    fn test_namespaces_keep_order_and_override() {
        let mut ns = Namespaces::new();
        ns.insert("xmlns:b", "urn:b");
        ns.insert("xmlns:a", "urn:a");
        ns.insert("xmlns:b", "urn:b2");

        let entries: Vec<_> = ns.iter().collect();
        assert_eq!(entries, vec![("xmlns:b", "urn:b2"), ("xmlns:a", "urn:a")]);
        assert!(Namespaces::is_declaration("xmlns"));
        assert!(Namespaces::is_declaration("xmlns:x"));
        assert!(!Namespaces::is_declaration("xmlnsx"));
    }

    #[test]
    fn test_placeholder_on_malformed_input() {
        let (doc, err) = load_or_placeholder("<a><b></a>", &ResolveByTagName, "<empty/>");
        assert!(err.is_some());
        assert_eq!(doc.to_xml(), "<empty/>");

        let (doc, err) = load_or_placeholder("<a/>", &ResolveByTagName, "<empty/>");
        assert!(err.is_none());
        assert_eq!(doc.root().name(), "a");
    }

    #[test]
    fn test_broken_placeholder_still_yields_document() {
        let (doc, err) = load_or_placeholder("<", &ResolveByTagName, "<also broken");
        assert!(err.is_some());
        assert_eq!(doc.to_xml(), "<entry/>");
    }
}
