//! # Refresh
//!
//! The pass that runs after every change and brings the view back to its
//! invariants. In order:
//!
//! 1. flags recomputed from the schema
//! 2. empty texts dropped from elements that may not hold text
//! 3. `no_children` and the collapsed preview
//! 4. empty placeholders on both sides of each child element of a
//!    text-bearing element
//! 5. adjacent texts merged (the merged node gets a new identity)
//! 6. attributes put in declared order
//! 7. shy attributes and the rollouter
//! 8. display names, captions and display values
//!
//! The harvest cache is cleared after every step that changes structure.

use tracing::{debug, trace};
use xedit_model::{ElementRef, NodeId, NodeRef};
use xedit_schema::{text_by_lang, ElementDefinition, Schema};

use crate::constraints::reorder_attributes;
use crate::harvest::HarvestCache;
use crate::view::View;

/// Length of the preview shown for a collapsed element
const COLLAPSOID_LENGTH: usize = 35;

pub fn refresh(view: &mut View, cache: &mut HarvestCache, schema: &Schema, lang: &str) {
    cache.clear(view);
    update_flags(view, cache, schema);

    drop_stray_placeholders(view, cache, schema);
    cache.clear(view);

    update_collapsoids(view, cache, schema);

    add_placeholders(view);
    merge_adjacent_texts(view);
    for element in elements(view) {
        if let Err(err) = reorder_attributes(view, schema, element) {
            debug!(node = %element, error = %err, "Attributes left unordered");
        }
    }
    cache.clear(view);

    update_shy(view);
    update_display(view, cache, schema, lang);
    trace!(generation = view.generation(), "Refreshed view");
}

/// Every element of the document and the layby, in document order
pub(crate) fn elements(view: &View) -> Vec<NodeId> {
    view.tops()
        .into_iter()
        .flat_map(|top| view.tree().descendants(top))
        .filter(|id| view.tree().is_element(*id))
        .collect()
}

fn update_flags(view: &mut View, cache: &mut HarvestCache, schema: &Schema) {
    for id in elements(view) {
        let Some(harvest) = cache.harvest(view, id) else {
            continue;
        };
        let Some(el) = harvest.element() else {
            continue;
        };
        let def = schema.element(el.name());
        let has_text = (def.has_text)(el);
        let oneliner = (def.oneliner)(el);
        let collapsible = (def.collapsible)(el);
        let read_only = def.read_only(el);
        let invisible = def.invisible(el);
        let draggable = !(def.can_drop_to)(el).is_empty();
        let background_colour = (def.background_colour)(el);

        let state = view.state_mut(id);
        state.has_text = has_text;
        state.oneliner = oneliner;
        state.collapsible = collapsible;
        state.collapsed = state.collapsed && collapsible;
        state.read_only = read_only;
        state.invisible = invisible;
        state.draggable = draggable;
        state.has_menu = !def.menu.is_empty();
        state.has_inline_menu = !def.inline_menu.is_empty();
        state.background_colour = background_colour;
    }
}

fn drop_stray_placeholders(view: &mut View, cache: &mut HarvestCache, schema: &Schema) {
    let mut stray = Vec::new();
    for id in elements(view) {
        let Some(harvest) = cache.harvest(view, id) else {
            continue;
        };
        let Some(el) = harvest.element() else {
            continue;
        };
        if (schema.element(el.name()).has_text)(el) {
            continue;
        }
        stray.extend(
            el.children()
                .filter_map(|c| c.as_text())
                .filter(|t| t.value().is_empty())
                .map(|t| t.id()),
        );
    }
    for id in stray {
        view.remove(id);
    }
}

fn update_collapsoids(view: &mut View, cache: &mut HarvestCache, schema: &Schema) {
    for id in elements(view) {
        let (no_children, preview) = {
            let Some(harvest) = cache.harvest(view, id) else {
                continue;
            };
            let Some(el) = harvest.element() else {
                continue;
            };
            let has_text = view.state(id).map(|s| s.has_text).unwrap_or(false);
            let oneliner = view.state(id).map(|s| s.oneliner).unwrap_or(false);
            if el.child_ids().is_empty() && !has_text {
                (true, None)
            } else {
                (false, Some(collapsoid(el, &schema.element(el.name()), oneliner)))
            }
        };
        let state = view.state_mut(id);
        state.no_children = no_children;
        if let Some(preview) = preview {
            state.collapsoid = preview;
        }
    }
}

/// Preview of a collapsed element: the declared collapsoid, or the start of
/// its text
pub fn collapsoid(el: ElementRef<'_>, def: &ElementDefinition, oneliner: bool) -> String {
    let mut whisper = match &def.collapsoid {
        Some(f) => f(el),
        None => {
            let mut whisper = String::new();
            let mut length = 0;
            let mut abbreviated = false;
            for text in descendant_texts(el) {
                for c in text.chars() {
                    if length < COLLAPSOID_LENGTH {
                        whisper.push(c);
                        length += 1;
                    } else {
                        abbreviated = true;
                    }
                }
                whisper.push(' ');
                length += 1;
            }
            let mut whisper = squeeze_spaces(&whisper);
            if abbreviated && !oneliner && whisper != "..." {
                whisper.push_str("...");
            }
            whisper
        }
    };
    if whisper.is_empty() {
        whisper = "...".to_string();
    }
    whisper
}

fn descendant_texts<'a>(el: ElementRef<'a>) -> Vec<&'a str> {
    let mut out = Vec::new();
    for child in el.children() {
        match child {
            NodeRef::Text(t) => out.push(t.value()),
            NodeRef::Element(e) => out.extend(descendant_texts(e)),
            NodeRef::Attribute(_) => {}
        }
    }
    out
}

/// Runs of spaces become one space; trailing spaces go
fn squeeze_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == ' ' && out.ends_with(' ') {
            continue;
        }
        out.push(c);
    }
    out.trim_end_matches(' ').to_string()
}

fn add_placeholders(view: &mut View) {
    for id in elements(view) {
        if !view.state(id).map(|s| s.has_text).unwrap_or(false) {
            continue;
        }
        let mut i = 0;
        while i < view.tree().children(id).len() {
            let children = view.tree().children(id).to_vec();
            if view.tree().is_element(children[i]) {
                if i == 0 || !view.tree().is_text(children[i - 1]) {
                    let text = view.new_text("");
                    view.insert_child(id, i, text);
                    i += 1;
                }
                let next = view.tree().children(id).get(i + 1).copied();
                if !next.map(|n| view.tree().is_text(n)).unwrap_or(false) {
                    let text = view.new_text("");
                    view.insert_child(id, i + 1, text);
                }
            }
            i += 1;
        }
    }
}

fn merge_adjacent_texts(view: &mut View) {
    loop {
        let pair = elements(view).into_iter().find_map(|id| {
            view.tree()
                .children(id)
                .windows(2)
                .find(|w| view.tree().is_text(w[0]) && view.tree().is_text(w[1]))
                .map(|w| (w[0], w[1]))
        });
        let Some((first, second)) = pair else {
            break;
        };
        let value = format!(
            "{}{}",
            view.tree().value(first).unwrap_or_default(),
            view.tree().value(second).unwrap_or_default()
        );
        let merged = view.new_text(value);
        view.replace(first, &[merged]);
        view.remove(second);
    }
}

fn update_shy(view: &mut View) {
    for id in elements(view) {
        let has_shy = view
            .tree()
            .attributes(id)
            .iter()
            .any(|a| view.state(*a).map(|s| s.shy).unwrap_or(false));
        let state = view.state_mut(id);
        state.has_shy = has_shy;
        if !has_shy {
            state.rolled_out = false;
        }
    }
}

fn update_display(view: &mut View, cache: &mut HarvestCache, schema: &Schema, lang: &str) {
    for id in elements(view) {
        let Some(harvest) = cache.harvest(view, id) else {
            continue;
        };
        let Some(el) = harvest.element() else {
            continue;
        };
        let def = schema.element(el.name());

        let display_name = match &def.display_name {
            Some(f) => text_by_lang(&f(el), lang),
            None => (def.element_name)(el),
        };
        let title = def.title.as_ref().map(|f| text_by_lang(&f(el), lang)).unwrap_or_default();
        let caption = def.caption.as_ref().map(|f| text_by_lang(&f(el), lang));
        let display_value = match &def.display_value {
            Some(f) if !el.has_elements() => Some(text_by_lang(&f(el), lang)),
            _ => None,
        };
        let children_shown = display_value.is_none();

        let state = view.state_mut(id);
        state.display_name = display_name;
        state.title = title;
        state.caption = caption;
        state.display_value = display_value;

        for at in el.attributes() {
            let at_def = schema.attribute(el.name(), at.name());
            let display_name = at_def
                .display_name
                .as_ref()
                .map(|f| text_by_lang(&f(at), lang))
                .unwrap_or_else(|| at.name().to_string());
            let display_value = at_def.display_value.as_ref().map(|f| text_by_lang(&f(at), lang));
            let shown = display_value.clone().unwrap_or_else(|| at.value().to_string());

            let state = view.state_mut(at.id());
            state.display_name = display_name;
            state.display_value = display_value;
            state.title = at_def.title.as_ref().map(|f| text_by_lang(&f(at), lang)).unwrap_or_default();
            state.caption = at_def.caption.as_ref().map(|f| text_by_lang(&f(at), lang));
            state.read_only = at_def.read_only(at);
            state.invisible = at_def.invisible(at);
            state.shy = at_def.is_shy(at);
            state.is_url = shown.starts_with("http://") || shown.starts_with("https://");
            state.focusable = true;
        }

        for text in el.children().filter_map(|c| c.as_text()) {
            let state = view.state_mut(text.id());
            state.empty = text.value().is_empty();
            state.whitespace = text.value().trim().is_empty();
            state.focusable = children_shown;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_document;
    use xedit_model::parse_document;
    use xedit_schema::{AttributeSpec, DocSpec, ElementSpec, Prop};

    fn refreshed(xml: &str, schema: &Schema) -> (View, HarvestCache) {
        let doc = parse_document(xml, schema).unwrap();
        let mut view = render_document(&doc, schema);
        let mut cache = HarvestCache::new(&view);
        refresh(&mut view, &mut cache, schema, "");
        (view, cache)
    }

    fn inline_schema() -> Schema {
        Schema::new(&DocSpec::new().element(
            "p",
            ElementSpec {
                has_text: Some(Prop::value(true)),
                ..Default::default()
            },
        ))
    }

    #[test]
    fn test_squeeze_spaces() {
        assert_eq!(squeeze_spaces("a  b   c  "), "a b c");
        assert_eq!(squeeze_spaces(""), "");
    }

    #[test]
    fn test_collapsoid_abbreviates_long_text() {
        let schema = Schema::default();
        let text = "x".repeat(50);
        let (view, _) = refreshed(&format!("<a><b>{}</b></a>", text), &schema);
        let state = view.state(view.root_id()).unwrap();
        assert_eq!(state.collapsoid, format!("{}...", "x".repeat(35)));
    }

    #[test]
    fn test_collapsoid_joins_texts_with_spaces() {
        let (view, _) = refreshed("<a><b>one</b><c>two</c></a>", &Schema::default());
        assert_eq!(view.state(view.root_id()).unwrap().collapsoid, "one two");

        let (view, _) = refreshed("<a><b/></a>", &Schema::default());
        assert_eq!(view.state(view.root_id()).unwrap().collapsoid, "...");
    }

    #[test]
    fn test_no_children_flag() {
        let (view, _) = refreshed("<a><b/></a>", &Schema::default());
        let b = view.root().child_elements_named("b")[0].id();
        assert!(view.state(b).unwrap().no_children);
        assert!(!view.state(view.root_id()).unwrap().no_children);

        let (view, _) = refreshed("<p/>", &inline_schema());
        assert!(!view.state(view.root_id()).unwrap().no_children);
    }

    #[test]
    fn test_placeholders_surround_inline_children() {
        let (view, _) = refreshed("<p>x<b/></p>", &inline_schema());
        let children = view.tree().children(view.root_id());
        assert_eq!(children.len(), 3);
        assert!(view.tree().is_text(children[0]));
        assert!(view.tree().is_element(children[1]));
        assert_eq!(view.tree().value(children[2]), Some(""));
    }

    #[test]
    fn test_adjacent_texts_merge_under_new_identity() {
        let schema = inline_schema();
        let doc = parse_document("<p>ab</p>", &schema).unwrap();
        let mut view = render_document(&doc, &schema);
        let first = view.tree().children(view.root_id())[0];
        let extra = view.new_text("cd");
        view.append_child(view.root_id(), extra);

        let mut cache = HarvestCache::new(&view);
        refresh(&mut view, &mut cache, &schema, "");
        let children = view.tree().children(view.root_id()).to_vec();
        assert_eq!(children.len(), 1);
        assert_eq!(view.tree().value(children[0]), Some("abcd"));
        assert_ne!(children[0], first);
        assert!(!view.contains(extra));
    }

    #[test]
    fn test_empty_text_dropped_without_text_capability() {
        let schema = Schema::default();
        let doc = parse_document("<a><b/></a>", &schema).unwrap();
        let mut view = render_document(&doc, &schema);
        let empty = view.new_text("");
        view.append_child(view.root_id(), empty);

        let mut cache = HarvestCache::new(&view);
        refresh(&mut view, &mut cache, &schema, "");
        assert!(!view.contains(empty));
        assert_eq!(view.to_xml(), "<a><b/></a>");
    }

    #[test]
    fn test_attributes_put_in_declared_order() {
        let schema = Schema::new(
            &DocSpec::new().element(
                "a",
                ElementSpec::default()
                    .attribute("id", AttributeSpec::default())
                    .attribute("lang", AttributeSpec::default()),
            ),
        );
        let (view, _) = refreshed("<a extra='x' lang='en' id='1'/>", &schema);
        assert_eq!(view.to_xml(), "<a id='1' lang='en' extra='x'/>");
    }

    #[test]
    fn test_display_name_and_caption_by_language() {
        let schema = Schema::new(&DocSpec::new().element(
            "a",
            ElementSpec {
                display_name: Some(Prop::value("en: Entry | de: Eintrag")),
                caption: Some(Prop::on_element(|el: ElementRef<'_>| format!("{} children", el.child_ids().len()))),
                ..Default::default()
            },
        ));
        let doc = parse_document("<a><b/></a>", &schema).unwrap();
        let mut view = render_document(&doc, &schema);
        let mut cache = HarvestCache::new(&view);
        refresh(&mut view, &mut cache, &schema, "de");

        let state = view.state(view.root_id()).unwrap();
        assert_eq!(state.display_name, "Eintrag");
        assert_eq!(state.caption.as_deref(), Some("1 children"));

        let b = view.root().child_elements_named("b")[0].id();
        assert_eq!(view.state(b).unwrap().display_name, "b");
    }

    #[test]
    fn test_url_attributes_detected() {
        let (view, _) = refreshed("<a href='https://example.com' x='y'/>", &Schema::default());
        let attrs = view.tree().attributes(view.root_id()).to_vec();
        assert!(view.state(attrs[0]).unwrap().is_url);
        assert!(!view.state(attrs[1]).unwrap().is_url);
    }
}
