//! # XML Parser
//!
//! Builds a [`Document`] from XML text with `quick-xml`.
//!
//! - CDATA sections become ordinary text
//! - comments, processing instructions and doctypes are dropped
//! - `xmlns` declarations move to the document's [`Namespaces`]
//! - `xml:space` is dropped (the serializer re-derives it)
//! - consecutive text events are joined into one text node

use crate::document::{Document, Namespaces};
use crate::error::{ModelError, ModelResult};
use crate::id_generator::NodeId;
use crate::tree::Tree;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Maps a raw tag name (and the definition id of its parent, if any) to the
/// definition id used as the element's schema key.
pub trait ResolveElementId {
    fn resolve(&self, tag_name: &str, parent_definition_id: Option<&str>) -> String;
}

/// Uses the tag name itself as the definition id
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveByTagName;

impl ResolveElementId for ResolveByTagName {
    fn resolve(&self, tag_name: &str, _parent_definition_id: Option<&str>) -> String {
        tag_name.to_string()
    }
}

impl<F> ResolveElementId for F
where
    F: Fn(&str, Option<&str>) -> String,
{
    fn resolve(&self, tag_name: &str, parent_definition_id: Option<&str>) -> String {
        self(tag_name, parent_definition_id)
    }
}

/// Parse a complete document
pub fn parse_document(xml: &str, resolver: &dyn ResolveElementId) -> ModelResult<Document> {
    let mut tree = Tree::new();
    let mut namespaces = Namespaces::new();
    let root = parse_into(xml, resolver, None, &mut tree, &mut namespaces)?;
    Document::new(tree, root, namespaces).ok_or(ModelError::MissingRoot)
}

/// Parse `xml` into an existing tree as a detached element.
///
/// `parent_definition_id` is what the resolver sees as the parent of the
/// fragment's root. Namespace declarations found on the way are added to
/// `namespaces`.
pub fn parse_into(
    xml: &str,
    resolver: &dyn ResolveElementId,
    parent_definition_id: Option<&str>,
    tree: &mut Tree,
    namespaces: &mut Namespaces,
) -> ModelResult<NodeId> {
    let mut reader = Reader::from_str(xml);
    let mut parser = XmlParser {
        resolver,
        outer_parent: parent_definition_id,
        tree,
        namespaces,
        stack: Vec::new(),
        root: None,
        pending_text: None,
    };

    loop {
        let pos = reader.buffer_position() as u64;
        let event = reader
            .read_event()
            .map_err(|e| ModelError::syntax(pos, e.to_string()))?;

        match event {
            Event::Start(start) => {
                parser.flush_text();
                let id = parser.open_element(&start, pos)?;
                parser.stack.push((id, tag_name(&start)));
            }
            Event::Empty(start) => {
                parser.flush_text();
                parser.open_element(&start, pos)?;
            }
            Event::End(end) => {
                parser.flush_text();
                let found = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                match parser.stack.pop() {
                    Some((_, expected)) if expected == found => {}
                    Some((_, expected)) => return Err(ModelError::unbalanced(pos, expected, found)),
                    None => return Err(ModelError::unbalanced(pos, "", found)),
                }
            }
            Event::Text(text) => {
                let value = text
                    .unescape()
                    .map_err(|e| ModelError::syntax(pos, e.to_string()))?;
                parser.push_text(&value, pos)?;
            }
            Event::CData(cdata) => {
                let raw = cdata.into_inner();
                let value = String::from_utf8_lossy(&raw).into_owned();
                parser.push_text(&value, pos)?;
            }
            Event::Eof => break,
            // Comments, processing instructions, declarations, doctype
            _ => {}
        }
    }

    if let Some((_, name)) = parser.stack.pop() {
        return Err(ModelError::Unclosed(name));
    }
    parser.root.ok_or(ModelError::MissingRoot)
}

struct XmlParser<'p, 'x> {
    resolver: &'p dyn ResolveElementId,
    outer_parent: Option<&'x str>,
    tree: &'p mut Tree,
    namespaces: &'p mut Namespaces,
    stack: Vec<(NodeId, String)>,
    root: Option<NodeId>,
    pending_text: Option<String>,
}

impl XmlParser<'_, '_> {
    fn open_element(&mut self, start: &BytesStart<'_>, pos: u64) -> ModelResult<NodeId> {
        let tag = tag_name(start);
        let parent = self.stack.last().map(|(id, _)| *id);

        if parent.is_none() && self.root.is_some() {
            return Err(ModelError::MultipleRoots(tag));
        }

        let parent_definition = match parent {
            Some(p) => self.tree.element_data(p).map(|el| el.definition_id.clone()),
            None => self.outer_parent.map(str::to_string),
        };
        let definition_id = self.resolver.resolve(&tag, parent_definition.as_deref());
        let id = self.tree.new_element(definition_id, tag);

        for attr in start.attributes() {
            let attr = attr.map_err(|e| ModelError::attribute(pos, e.to_string()))?;
            let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| ModelError::attribute(pos, e.to_string()))?
                .into_owned();

            if Namespaces::is_declaration(&name) {
                self.namespaces.insert(name, value);
            } else if name != "xml:space" {
                let attr_id = self.tree.new_attribute(name, value);
                self.tree.append_attribute(id, attr_id);
            }
        }

        match parent {
            Some(p) => {
                self.tree.append_child(p, id);
            }
            None => self.root = Some(id),
        }
        Ok(id)
    }

    fn push_text(&mut self, value: &str, pos: u64) -> ModelResult<()> {
        if self.stack.is_empty() {
            if value.trim().is_empty() {
                return Ok(());
            }
            return Err(ModelError::TextOutsideRoot { pos });
        }
        self.pending_text.get_or_insert_with(String::new).push_str(value);
        Ok(())
    }

    fn flush_text(&mut self) {
        let Some(text) = self.pending_text.take() else {
            return;
        };
        if let Some((parent, _)) = self.stack.last() {
            let parent = *parent;
            self.tree.add_text(parent, text);
        }
    }
}

fn tag_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeKind;

    fn parse(xml: &str) -> Document {
        parse_document(xml, &ResolveByTagName).unwrap()
    }

    #[test]
    fn test_parse_elements_attributes_text() {
        let doc = parse("<a x='1'><b>hi</b> there</a>");
        let root = doc.root();
        assert_eq!(root.name(), "a");
        assert_eq!(root.attribute_value("x"), Some("1"));
        assert_eq!(root.children().count(), 2);
        assert_eq!(root.get_text(), "hi there");
    }

    #[test]
    fn test_entities_are_unescaped() {
        let doc = parse("<a t='&lt;&amp;&quot;'>x &gt; y &#65;</a>");
        assert_eq!(doc.root().attribute_value("t"), Some("<&\""));
        assert_eq!(doc.root().get_text(), "x > y A");
    }

    #[test]
    fn test_cdata_and_comments_merge_into_one_text() {
        let doc = parse("<a>one<!-- gone --><![CDATA[ <two> ]]>three</a>");
        let root = doc.root();
        assert_eq!(root.children().count(), 1);
        assert_eq!(root.get_text(), "one <two> three");
    }

    #[test]
    fn test_namespaces_go_to_side_table() {
        let doc = parse("<a xmlns='urn:a'><b xmlns:x='urn:x' xml:space='preserve' x:y='1'/></a>");
        assert_eq!(doc.namespaces().get("xmlns"), Some("urn:a"));
        assert_eq!(doc.namespaces().get("xmlns:x"), Some("urn:x"));

        let b = doc.root().child_elements_named("b")[0];
        let names: Vec<_> = b.attributes().map(|a| a.name()).collect();
        assert_eq!(names, vec!["x:y"]);
        assert!(doc.root().attributes().next().is_none());
    }

    #[test]
    fn test_resolver_sees_parent_definition() {
        let resolver = |tag: &str, parent: Option<&str>| match parent {
            Some(p) => format!("{}/{}", p, tag),
            None => tag.to_string(),
        };
        let doc = parse_document("<a><b><c/></b></a>", &resolver).unwrap();
        let b = doc.root().child_elements().next().unwrap();
        assert_eq!(b.name(), "a/b");
        assert_eq!(b.element_name(), "b");
        assert_eq!(b.child_elements().next().unwrap().name(), "a/b/c");
    }

    #[test]
    fn test_parse_into_existing_tree() {
        let mut tree = Tree::new();
        let host = tree.new_element("host", "host");
        let mut ns = Namespaces::new();
        let frag = parse_into("<i>word</i>", &ResolveByTagName, Some("host"), &mut tree, &mut ns).unwrap();
        assert!(tree.parent_of(frag).is_none());
        assert_ne!(frag, host);
        assert!(matches!(tree.kind(frag), Some(NodeKind::Element(_))));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            parse_document("<a><b></a>", &ResolveByTagName),
            Err(ModelError::Syntax { .. }) | Err(ModelError::UnbalancedTag { .. })
        ));
        assert!(matches!(parse_document("", &ResolveByTagName), Err(ModelError::MissingRoot)));
        assert!(matches!(
            parse_document("<a/><b/>", &ResolveByTagName),
            Err(ModelError::MultipleRoots(_))
        ));
        assert!(parse_document("<a>", &ResolveByTagName).is_err());
        assert!(parse_document("text<a/>", &ResolveByTagName).is_err());
    }

    #[test]
    fn test_whitespace_text_is_kept_inside_root() {
        let doc = parse("<?xml version='1.0'?>\n<a>\n  <b/>\n</a>\n");
        assert_eq!(doc.root().children().count(), 3);
    }
}
