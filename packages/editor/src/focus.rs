//! # Focus Navigation
//!
//! The focusable units of the view in document order, and the four arrow
//! moves over them. Left and right step through every unit. Up and down
//! only stop at "vertical" units (tags and the first token of each text)
//! and skip whatever a oneliner or a collapsed element keeps on one line.
//!
//! Laic mode shows no closing tags, so moving down out of a text goes to
//! whatever follows the text's parent.

use serde::{Deserialize, Serialize};
use xedit_model::NodeId;
use xedit_schema::Mode;

use crate::view::{text_tokens, View, ViewState};

/// A focusable unit of the view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Focus {
    OpeningTag(NodeId),
    ClosingTag(NodeId),
    AttributeName(NodeId),
    AttributeValue(NodeId),
    /// One whitespace-separated token of a text node
    Text { id: NodeId, token: usize },
    /// The preview shown in place of a collapsed element's children
    ChildrenCollapsed(NodeId),
    /// Toggle for an element's shy attributes
    Rollouter(NodeId),
}

impl Focus {
    pub fn text(id: NodeId) -> Self {
        Focus::Text { id, token: 0 }
    }

    /// The node this unit belongs to
    pub fn node(&self) -> NodeId {
        match *self {
            Focus::OpeningTag(id)
            | Focus::ClosingTag(id)
            | Focus::AttributeName(id)
            | Focus::AttributeValue(id)
            | Focus::ChildrenCollapsed(id)
            | Focus::Rollouter(id) => id,
            Focus::Text { id, .. } => id,
        }
    }

    fn is_vertical(&self) -> bool {
        matches!(
            self,
            Focus::OpeningTag(_) | Focus::ClosingTag(_) | Focus::Text { token: 0, .. }
        )
    }

    /// The unit up/down navigation tracks for this one
    fn vertical(self) -> Self {
        match self {
            Focus::Text { id, .. } => Focus::text(id),
            other => other,
        }
    }
}

/// Every focusable unit in document order: the document, then the layby
/// when it is open
pub fn units(view: &View, mode: Mode) -> Vec<Focus> {
    let mut out = Vec::new();
    walk(view, view.root_id(), mode, &mut out);
    if view.is_layby_open() {
        for id in view.layby() {
            walk(view, *id, mode, &mut out);
        }
    }
    out
}

fn walk(view: &View, id: NodeId, mode: Mode, out: &mut Vec<Focus>) {
    let Some(state) = view.state(id) else {
        return;
    };
    if state.invisible {
        return;
    }
    out.push(Focus::OpeningTag(id));
    for at in view.tree().attributes(id) {
        let shown = view
            .state(*at)
            .map(|s| !s.invisible && (!s.shy || state.rolled_out))
            .unwrap_or(true);
        if shown {
            out.push(Focus::AttributeName(*at));
            out.push(Focus::AttributeValue(*at));
        }
    }
    if state.has_shy {
        out.push(Focus::Rollouter(id));
    }
    if state.collapsed {
        out.push(Focus::ChildrenCollapsed(id));
    } else if state.display_value.is_none() {
        for child in view.tree().children(id) {
            if view.tree().is_element(*child) {
                walk(view, *child, mode, out);
            } else if let Some(value) = view.tree().value(*child) {
                let tokens = text_tokens(value).len();
                out.extend((0..tokens).map(|token| Focus::Text { id: *child, token }));
            }
        }
    }
    if mode == Mode::Nerd && !state.no_children {
        out.push(Focus::ClosingTag(id));
    }
}

/// Next unit, or the first one when nothing has focus
pub fn go_right(view: &View, mode: Mode, current: Option<Focus>) -> Option<Focus> {
    let all = units(view, mode);
    match current {
        None => all.first().copied(),
        Some(focus) => {
            let pos = all.iter().position(|u| *u == focus)?;
            all.get(pos + 1).copied()
        }
    }
}

/// Previous unit, or the first one when nothing has focus
pub fn go_left(view: &View, mode: Mode, current: Option<Focus>) -> Option<Focus> {
    let all = units(view, mode);
    match current {
        None => all.first().copied(),
        Some(focus) => {
            let pos = all.iter().position(|u| *u == focus)?;
            pos.checked_sub(1).and_then(|p| all.get(p).copied())
        }
    }
}

pub fn go_down(view: &View, mode: Mode, current: Focus) -> Option<Focus> {
    if !current.is_vertical() && !matches!(current, Focus::Text { .. }) {
        return go_right(view, mode, Some(current));
    }
    let current = current.vertical();
    let tree = view.tree();

    if let Focus::Text { id, .. } = current {
        let parent = tree.parent_of(id)?;
        match mode {
            Mode::Nerd => return Some(Focus::ClosingTag(parent)),
            Mode::Laic => {
                if let Some(next) = next_sibling_unit(view, parent) {
                    return Some(next);
                }
            }
        }
    }

    let mut candidates: Vec<Focus> = units(view, mode).into_iter().filter(Focus::is_vertical).collect();
    if let Focus::OpeningTag(id) = current {
        let state = view.state(id);
        if state.map(|s| s.oneliner).unwrap_or(false) {
            candidates.retain(|u| *u != Focus::ClosingTag(id) && !strictly_inside(view, id, u.node()));
        }
        if state.map(|s| s.collapsed).unwrap_or(false) {
            candidates.retain(|u| *u != Focus::ClosingTag(id));
        }
    }
    let pos = candidates.iter().position(|u| *u == current)?;
    candidates.get(pos + 1).copied()
}

pub fn go_up(view: &View, mode: Mode, current: Focus) -> Option<Focus> {
    if !current.is_vertical() && !matches!(current, Focus::Text { .. }) {
        return go_left(view, mode, Some(current));
    }
    let current = current.vertical();
    let tree = view.tree();
    if let Focus::Text { id, .. } = current {
        return tree.parent_of(id).map(Focus::OpeningTag);
    }

    let root = view.root_id();
    let flag = |id: NodeId, get: fn(&ViewState) -> bool| view.state(id).map(get).unwrap_or(false);
    let mut candidates: Vec<Focus> = units(view, mode)
        .into_iter()
        .filter(Focus::is_vertical)
        .filter(|u| match *u {
            Focus::ClosingTag(id) => id == root || !(flag(id, |s| s.oneliner) || flag(id, |s| s.collapsed)),
            Focus::Text { id, .. } => match tree.parent_of(id) {
                Some(parent) => parent == root || !flag(parent, |s| s.oneliner),
                None => true,
            },
            _ => true,
        })
        .collect();

    let inline_container = match current {
        Focus::ClosingTag(id) if flag(id, |s| s.has_text) => Some(id),
        Focus::OpeningTag(id) => tree
            .element(id)
            .and_then(|el| el.preceding_sibling())
            .map(|s| s.id())
            .filter(|s| flag(*s, |st| st.has_text)),
        _ => None,
    };
    if let Some(container) = inline_container {
        candidates.retain(|u| {
            if !strictly_inside(view, container, u.node()) {
                return true;
            }
            match *u {
                Focus::Text { id, .. } => tree.index_in_parent(id) == Some(0),
                _ => false,
            }
        });
    }

    let pos = candidates.iter().position(|u| *u == current)?;
    pos.checked_sub(1).and_then(|p| candidates.get(p).copied())
}

/// First unit of the nearest visible node following `id` among its
/// siblings
fn next_sibling_unit(view: &View, id: NodeId) -> Option<Focus> {
    let tree = view.tree();
    let parent = tree.parent_of(id)?;
    let index = tree.index_in_parent(id)?;
    tree.children(parent)[index + 1..].iter().find_map(|&next| {
        if !tree.is_element(next) {
            Some(Focus::text(next))
        } else if view.state(next).map(|s| s.invisible).unwrap_or(false) {
            None
        } else {
            Some(Focus::OpeningTag(next))
        }
    })
}

fn strictly_inside(view: &View, ancestor: NodeId, id: NodeId) -> bool {
    id != ancestor && view.tree().is_ancestor_or_self(ancestor, id)
}

/// Keys the editor reacts to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Escape,
    Char(String),
}

impl Key {
    /// Name as used by key triggers in menus
    pub fn name(&self) -> &str {
        match self {
            Key::Up => "ArrowUp",
            Key::Down => "ArrowDown",
            Key::Left => "ArrowLeft",
            Key::Right => "ArrowRight",
            Key::Enter => "Enter",
            Key::Escape => "Escape",
            Key::Char(c) => c.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: Key,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
}

impl KeyEvent {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            shift: false,
            alt: false,
        }
    }

    pub fn ctrl(key: Key) -> Self {
        Self {
            ctrl: true,
            ..Self::plain(key)
        }
    }

    pub fn has_modifier(&self) -> bool {
        self.ctrl || self.shift || self.alt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::HarvestCache;
    use crate::refresh::refresh;
    use crate::render::render_document;
    use xedit_model::parse_document;
    use xedit_schema::{DocSpec, ElementSpec, Prop, Schema};

    fn setup(xml: &str, schema: &Schema) -> View {
        let doc = parse_document(xml, schema).unwrap();
        let mut view = render_document(&doc, schema);
        let mut cache = HarvestCache::new(&view);
        refresh(&mut view, &mut cache, schema, "");
        view
    }

    fn child(view: &View, parent: NodeId, nth: usize) -> NodeId {
        view.tree().children(parent)[nth]
    }

    fn inline_schema() -> Schema {
        Schema::new(
            &DocSpec::new()
                .element(
                    "p",
                    ElementSpec {
                        has_text: Some(Prop::value(true)),
                        ..Default::default()
                    },
                )
                .element(
                    "b",
                    ElementSpec {
                        has_text: Some(Prop::value(true)),
                        oneliner: Some(Prop::value(true)),
                        ..Default::default()
                    },
                ),
        )
    }

    #[test]
    fn test_units_in_document_order() {
        let view = setup("<a x='1'><b/></a>", &Schema::default());
        let root = view.root_id();
        let x = view.tree().attributes(root)[0];
        let b = child(&view, root, 0);
        assert_eq!(
            units(&view, Mode::Nerd),
            vec![
                Focus::OpeningTag(root),
                Focus::AttributeName(x),
                Focus::AttributeValue(x),
                Focus::OpeningTag(b),
                Focus::ClosingTag(root),
            ]
        );
    }

    #[test]
    fn test_text_tokens_are_units() {
        let view = setup("<p>one two</p>", &inline_schema());
        let root = view.root_id();
        let text = child(&view, root, 0);
        assert_eq!(
            units(&view, Mode::Nerd),
            vec![
                Focus::OpeningTag(root),
                Focus::Text { id: text, token: 0 },
                Focus::Text { id: text, token: 1 },
                Focus::ClosingTag(root),
            ]
        );
        assert_eq!(units(&view, Mode::Laic).len(), 3);
    }

    #[test]
    fn test_left_right() {
        let view = setup("<a><b/><c/></a>", &Schema::default());
        let root = view.root_id();
        let b = child(&view, root, 0);
        let c = child(&view, root, 1);
        assert_eq!(go_right(&view, Mode::Nerd, None), Some(Focus::OpeningTag(root)));
        assert_eq!(go_right(&view, Mode::Nerd, Some(Focus::OpeningTag(b))), Some(Focus::OpeningTag(c)));
        assert_eq!(go_left(&view, Mode::Nerd, Some(Focus::OpeningTag(b))), Some(Focus::OpeningTag(root)));
        assert_eq!(go_left(&view, Mode::Nerd, Some(Focus::OpeningTag(root))), None);
    }

    #[test]
    fn test_down_skips_oneliner_contents() {
        let view = setup("<p><b>bold</b></p>", &inline_schema());
        let root = view.root_id();
        // ['', b, ''] after refresh
        let b = child(&view, root, 1);
        let after = child(&view, root, 2);
        assert_eq!(go_down(&view, Mode::Nerd, Focus::OpeningTag(b)), Some(Focus::text(after)));
    }

    #[test]
    fn test_down_from_text() {
        let schema = inline_schema();
        let view = setup("<a><p>x</p><c/></a>", &schema);
        let root = view.root_id();
        let p = child(&view, root, 0);
        let c = child(&view, root, 1);
        let text = child(&view, p, 0);
        assert_eq!(go_down(&view, Mode::Nerd, Focus::text(text)), Some(Focus::ClosingTag(p)));
        assert_eq!(go_down(&view, Mode::Laic, Focus::text(text)), Some(Focus::OpeningTag(c)));
    }

    #[test]
    fn test_down_from_text_skips_invisible_siblings() {
        let schema = Schema::new(
            &DocSpec::new()
                .element(
                    "p",
                    ElementSpec {
                        has_text: Some(Prop::value(true)),
                        ..Default::default()
                    },
                )
                .element(
                    "hidden",
                    ElementSpec {
                        is_invisible: Some(Prop::value(true)),
                        ..Default::default()
                    },
                ),
        );
        let view = setup("<a><p>x</p><hidden/><c/></a>", &schema);
        let root = view.root_id();
        let p = child(&view, root, 0);
        let c = child(&view, root, 2);
        let text = child(&view, p, 0);

        let down = go_down(&view, Mode::Laic, Focus::text(text));
        assert_eq!(down, Some(Focus::OpeningTag(c)));
        assert!(units(&view, Mode::Laic).contains(&Focus::OpeningTag(c)));
    }

    #[test]
    fn test_up() {
        let view = setup("<a><b/><c/></a>", &Schema::default());
        let root = view.root_id();
        let b = child(&view, root, 0);
        let c = child(&view, root, 1);
        assert_eq!(go_up(&view, Mode::Nerd, Focus::OpeningTag(c)), Some(Focus::OpeningTag(b)));
        assert_eq!(go_up(&view, Mode::Nerd, Focus::ClosingTag(root)), Some(Focus::OpeningTag(c)));
        assert_eq!(go_up(&view, Mode::Nerd, Focus::OpeningTag(root)), None);
    }

    #[test]
    fn test_up_from_text_goes_to_parent() {
        let view = setup("<p>one two</p>", &inline_schema());
        let root = view.root_id();
        let text = child(&view, root, 0);
        assert_eq!(
            go_up(&view, Mode::Nerd, Focus::Text { id: text, token: 1 }),
            Some(Focus::OpeningTag(root))
        );
    }

    #[test]
    fn test_up_from_closing_tag_of_text_element() {
        let view = setup("<p>x<b>y</b>z</p>", &inline_schema());
        let root = view.root_id();
        let first = child(&view, root, 0);
        assert_eq!(go_up(&view, Mode::Nerd, Focus::ClosingTag(root)), Some(Focus::text(first)));
    }

    #[test]
    fn test_invisible_and_collapsed() {
        let schema = Schema::new(
            &DocSpec::new()
                .element(
                    "hidden",
                    ElementSpec {
                        is_invisible: Some(Prop::value(true)),
                        ..Default::default()
                    },
                )
                .element(
                    "c",
                    ElementSpec {
                        collapsed: Some(Prop::value(true)),
                        ..Default::default()
                    },
                ),
        );
        let view = setup("<a><hidden><x/></hidden><c><y/></c></a>", &schema);
        let root = view.root_id();
        let c = child(&view, root, 1);
        assert_eq!(
            units(&view, Mode::Nerd),
            vec![
                Focus::OpeningTag(root),
                Focus::OpeningTag(c),
                Focus::ChildrenCollapsed(c),
                Focus::ClosingTag(c),
                Focus::ClosingTag(root),
            ]
        );
        assert_eq!(go_down(&view, Mode::Nerd, Focus::OpeningTag(c)), Some(Focus::ClosingTag(root)));
    }
}
