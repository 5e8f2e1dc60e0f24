use crate::document::Namespaces;
use crate::id_generator::NodeId;
use crate::tree::{NodeKind, Tree};

/// Serializer converts a tree back to XML text.
///
/// Output is canonical rather than faithful to the input's formatting:
/// - attribute values are single-quoted
/// - `& " ' < >` are escaped in text and attribute values
/// - an element with any text child carries `xml:space='preserve'`
/// - childless elements are self-closing
pub struct Serializer<'a> {
    tree: &'a Tree,
    output: String,
}

impl<'a> Serializer<'a> {
    pub fn new(tree: &'a Tree) -> Self {
        Self {
            tree,
            output: String::new(),
        }
    }

    /// Serialize one node (element, attribute or text)
    pub fn serialize(mut self, id: NodeId) -> String {
        self.write_node(id, None);
        self.output
    }

    /// Serialize an element, declaring `namespaces` on it unless it
    /// already carries an attribute of the same name.
    pub fn serialize_with_namespaces(mut self, id: NodeId, namespaces: &Namespaces) -> String {
        self.write_node(id, Some(namespaces));
        self.output
    }

    fn write_node(&mut self, id: NodeId, namespaces: Option<&Namespaces>) {
        let tree = self.tree;
        match tree.kind(id) {
            Some(NodeKind::Text { value }) => escape_into(value, &mut self.output),
            Some(NodeKind::Attribute { name, value }) => self.write_attribute(name, value),
            Some(NodeKind::Element(el)) => {
                self.output.push('<');
                self.output.push_str(&el.tag_name);

                for attr in &el.attributes {
                    if let Some(NodeKind::Attribute { name, value }) = tree.kind(*attr) {
                        self.output.push(' ');
                        self.write_attribute(name, value);
                    }
                }
                if let Some(namespaces) = namespaces {
                    for (name, uri) in namespaces.iter() {
                        let declared = el
                            .attributes
                            .iter()
                            .any(|a| matches!(tree.kind(*a), Some(NodeKind::Attribute { name: n, .. }) if n == name));
                        if !declared {
                            self.output.push(' ');
                            self.write_attribute(name, uri);
                        }
                    }
                }

                if el.children.is_empty() {
                    self.output.push_str("/>");
                    return;
                }

                if el.children.iter().any(|c| tree.is_text(*c)) {
                    self.output.push_str(" xml:space='preserve'");
                }
                self.output.push('>');
                for child in &el.children {
                    self.write_node(*child, None);
                }
                self.output.push_str("</");
                self.output.push_str(&el.tag_name);
                self.output.push('>');
            }
            None => {}
        }
    }

    fn write_attribute(&mut self, name: &str, value: &str) {
        self.output.push_str(name);
        self.output.push_str("='");
        escape_into(value, &mut self.output);
        self.output.push('\'');
    }
}

/// Escape text for use in XML content or a quoted attribute value
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(text, &mut out);
    out
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

/// Serialize a single node
pub fn serialize_node(tree: &Tree, id: NodeId) -> String {
    Serializer::new(tree).serialize(id)
}

/// Serialize a root element with the document's namespace declarations
pub fn serialize_document(tree: &Tree, root: NodeId, namespaces: &Namespaces) -> String {
    Serializer::new(tree).serialize_with_namespaces(root, namespaces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_document, ResolveByTagName};

    fn roundtrip(xml: &str) -> String {
        parse_document(xml, &ResolveByTagName).unwrap().to_xml()
    }

    #[test]
    fn test_canonical_output() {
        assert_eq!(roundtrip(r#"<a x="1"><b/></a>"#), "<a x='1'><b/></a>");
        assert_eq!(roundtrip("<a></a>"), "<a/>");
    }

    #[test]
    fn test_text_children_mark_space_preserve() {
        assert_eq!(
            roundtrip("<a><b>x</b></a>"),
            "<a><b xml:space='preserve'>x</b></a>"
        );
    }

    #[test]
    fn test_escaping() {
        assert_eq!(
            roundtrip(r#"<a t="it's &lt;b&gt;">&quot;x&quot; &amp; y</a>"#),
            "<a t='it&apos;s &lt;b&gt;' xml:space='preserve'>&quot;x&quot; &amp; y</a>"
        );
        assert_eq!(escape("a<b"), "a&lt;b");
    }

    #[test]
    fn test_namespaces_hoisted_to_root() {
        assert_eq!(
            roundtrip("<a><b xmlns:x='urn:x' x:k='v'/></a>"),
            "<a xmlns:x='urn:x'><b x:k='v'/></a>"
        );
    }

    #[test]
    fn test_serialize_attribute_and_text_nodes() {
        let doc = parse_document("<a k='v'>t&amp;</a>", &ResolveByTagName).unwrap();
        let root = doc.root();
        let attr = root.attribute("k").unwrap().id();
        let text = root.child_ids()[0];
        assert_eq!(serialize_node(doc.tree(), attr), "k='v'");
        assert_eq!(serialize_node(doc.tree(), text), "t&amp;");
    }
}
