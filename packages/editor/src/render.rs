//! # Render
//!
//! Projects model trees into the view. Rendering copies nodes under fresh
//! view identities and inserts the empty text placeholders that give the
//! user an insertion point between adjacent child elements of a text-bearing
//! element. Everything else about display state is filled in by the next
//! refresh pass.

use std::collections::HashMap;
use tracing::debug;
use xedit_model::{parse_into, Document, Namespaces, NodeId, Tree};
use xedit_schema::Schema;

use crate::errors::EditorResult;
use crate::view::{View, ViewState};

/// Render a whole document into a new view
pub fn render_document(doc: &Document, schema: &Schema) -> View {
    let mut tree = Tree::new();
    let mut states = HashMap::new();
    let root = match doc.tree().copy_subtree_mapped(doc.root_id(), &mut tree) {
        Some((root, pairs)) => {
            dress(&mut tree, &mut states, schema, doc.tree(), &pairs);
            root
        }
        None => tree.new_element(doc.root().name(), doc.root().element_name()),
    };
    states.entry(root).or_default();
    debug!(nodes = tree.len(), "Rendered document");
    View::from_parts(tree, states, root, doc.namespaces().clone())
}

/// Render a subtree of `src` into the view, detached.
///
/// Returns the identity of the rendered copy.
pub fn render_subtree(view: &mut View, schema: &Schema, src: &Tree, src_id: NodeId) -> Option<NodeId> {
    let (copy, pairs) = view.graft(src, src_id)?;
    dress(&mut view.tree, &mut view.states, schema, src, &pairs);
    Some(copy)
}

/// Parse an XML fragment into its own tree.
///
/// `parent_definition_id` is what the schema's resolver sees as the parent
/// of the fragment's root.
pub fn parse_fragment(xml: &str, schema: &Schema, parent_definition_id: Option<&str>) -> EditorResult<(Tree, NodeId)> {
    let mut tree = Tree::new();
    let mut namespaces = Namespaces::new();
    let root = parse_into(xml, schema, parent_definition_id, &mut tree, &mut namespaces)?;
    Ok((tree, root))
}

/// Initial display state and text placeholders for freshly copied nodes
fn dress(
    tree: &mut Tree,
    states: &mut HashMap<NodeId, ViewState>,
    schema: &Schema,
    src: &Tree,
    pairs: &[(NodeId, NodeId)],
) {
    for &(src_id, id) in pairs {
        let Some(el) = src.element(src_id) else {
            states.entry(id).or_default();
            continue;
        };
        let def = schema.element(el.name());
        let has_text = (def.has_text)(el);
        let collapsible = (def.collapsible)(el);
        let state = states.entry(id).or_default();
        state.has_text = has_text;
        state.collapsible = collapsible;
        state.collapsed = collapsible && (def.collapsed)(el) && !el.child_ids().is_empty();

        let shows_display_value = def.display_value.is_some() && !el.has_elements();
        if has_text && !shows_display_value {
            insert_placeholders(tree, states, id);
        }
    }
}

/// Empty texts: first when there is no child or the first child is an
/// element, between adjacent elements, and last when a longer list ends
/// with an element.
fn insert_placeholders(tree: &mut Tree, states: &mut HashMap<NodeId, ViewState>, element: NodeId) {
    let children = tree.children(element).to_vec();
    let mut placeholder = |tree: &mut Tree, index: usize| {
        let text = tree.new_text("");
        tree.insert_child(element, index, text);
        states.insert(text, ViewState::default());
    };

    let mut at = 0;
    if children.first().map_or(true, |c| tree.is_element(*c)) {
        placeholder(tree, 0);
        at += 1;
    }
    let mut previous_is_element = false;
    for child in &children {
        let is_element = tree.is_element(*child);
        if previous_is_element && is_element {
            placeholder(tree, at);
            at += 1;
        }
        at += 1;
        previous_is_element = is_element;
    }
    if children.len() > 1 && previous_is_element {
        placeholder(tree, at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xedit_model::parse_document;
    use xedit_schema::{DocSpec, ElementSpec, Prop};

    fn inline_schema() -> Schema {
        Schema::new(&DocSpec::new().element(
            "p",
            ElementSpec {
                has_text: Some(Prop::value(true)),
                ..Default::default()
            },
        ))
    }

    fn render(xml: &str, schema: &Schema) -> View {
        let doc = parse_document(xml, schema).unwrap();
        render_document(&doc, schema)
    }

    fn shape(view: &View) -> Vec<String> {
        view.tree()
            .children(view.root_id())
            .iter()
            .map(|c| match view.tree().value(*c) {
                Some(v) => format!("'{}'", v),
                None => view.tree().element(*c).map(|e| e.name().to_string()).unwrap_or_default(),
            })
            .collect()
    }

    #[test]
    fn test_placeholders_between_inline_elements() {
        let schema = inline_schema();
        let view = render("<p><b/><i/></p>", &schema);
        assert_eq!(shape(&view), vec!["''", "b", "''", "i", "''"]);
    }

    #[test]
    fn test_placeholder_in_empty_text_element() {
        let schema = inline_schema();
        let view = render("<p/>", &schema);
        assert_eq!(shape(&view), vec!["''"]);
    }

    #[test]
    fn test_single_child_gets_leading_placeholder_only() {
        let schema = inline_schema();
        let view = render("<p><b/></p>", &schema);
        assert_eq!(shape(&view), vec!["''", "b"]);
    }

    #[test]
    fn test_no_placeholders_without_text_capability() {
        let view = render("<a><b/><c/></a>", &Schema::default());
        assert_eq!(shape(&view), vec!["b", "c"]);
    }

    #[test]
    fn test_render_issues_fresh_identities() {
        let schema = Schema::default();
        let doc = parse_document("<a><b/></a>", &schema).unwrap();
        let mut view = render_document(&doc, &schema);
        let copy = render_subtree(&mut view, &schema, doc.tree(), doc.root_id()).unwrap();
        assert_ne!(copy, view.root_id());
        assert!(view.tree().parent_of(copy).is_none());
    }

    #[test]
    fn test_collapsed_only_with_children() {
        let schema = Schema::new(&DocSpec::new().element(
            "a",
            ElementSpec {
                collapsed: Some(Prop::value(true)),
                ..Default::default()
            },
        ));
        let view = render("<a/>", &schema);
        assert!(!view.state(view.root_id()).unwrap().collapsed);
        let view = render("<a><b/></a>", &schema);
        assert!(view.state(view.root_id()).unwrap().collapsed);
    }

    #[test]
    fn test_parse_fragment_reports_errors() {
        let schema = Schema::default();
        assert!(parse_fragment("<b>", &schema, Some("a")).is_err());
        let (tree, root) = parse_fragment("<b x='1'/>", &schema, Some("a")).unwrap();
        assert_eq!(tree.element(root).unwrap().attribute_value("x"), Some("1"));
    }
}
