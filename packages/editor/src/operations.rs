//! # Editing Operations
//!
//! The structural edits a session offers. Each one checks its
//! preconditions against the current view and declines without touching
//! anything when they fail; otherwise it mutates the view, reports the
//! change and says where the focus went.

use std::collections::HashSet;
use tracing::{debug, warn};
use xedit_model::{escape, serialize_node, NodeId, NodeRef};
use xedit_schema::{Asker, CustomEdit, EditAction};

use crate::bubble::{build_menu, Bubble};
use crate::constraints::reorder_children;
use crate::drop_targets::{drop_into, gap_above, gap_below};
use crate::focus::Focus;
use crate::render::{parse_fragment, render_subtree};
use crate::session::{EditorSession, Outcome};
use crate::view::text_tokens;

/// A run of text between two points, possibly spanning sibling nodes.
///
/// Indices are char offsets into the respective text node; `till_index`
/// is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSelection {
    pub from_text: NodeId,
    pub from_index: usize,
    pub till_text: NodeId,
    pub till_index: usize,
}

impl TextSelection {
    pub fn new(from_text: NodeId, from_index: usize, till_text: NodeId, till_index: usize) -> Self {
        Self {
            from_text,
            from_index,
            till_text,
            till_index,
        }
    }

    /// Characters `from..=till` of a single text node
    pub fn within(text: NodeId, from: usize, till: usize) -> Self {
        Self::new(text, from, text, till)
    }
}

fn char_split(value: &str, at: usize) -> (String, String) {
    let head: String = value.chars().take(at).collect();
    let tail: String = value.chars().skip(at).collect();
    (head, tail)
}

impl EditorSession {
    fn element_name_of(&self, id: NodeId) -> Option<String> {
        self.view.tree().element(id).map(|el| el.name().to_string())
    }

    fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.view.tree().parent_of(id).filter(|p| self.view.tree().is_element(*p))
    }

    /// Parse `xml` as if it lived under `parent` and render it, detached.
    /// Nothing in the view changes when the XML does not parse.
    fn render_xml(&mut self, xml: &str, parent: Option<NodeId>) -> Option<NodeId> {
        let parent_def = parent.and_then(|p| self.element_name_of(p));
        match parse_fragment(xml, &self.schema, parent_def.as_deref()) {
            Ok((tree, root)) => render_subtree(&mut self.view, &self.schema, &tree, root),
            Err(err) => {
                warn!(error = %err, "Could not parse fragment");
                None
            }
        }
    }

    /// Restore declared child order under `parent`. A contradiction leaves
    /// the order as it is; the edit itself still stands.
    pub(crate) fn reorder(&mut self, parent: NodeId) {
        self.cache.clear(&self.view);
        if let Err(err) = reorder_children(&mut self.view, &mut self.cache, &self.schema, parent) {
            debug!(error = %err, "Children left unordered");
        }
        self.cache.clear(&self.view);
    }

    // --- Attributes --------------------------------------------------------

    pub fn delete_attribute(&mut self, id: NodeId) -> Outcome {
        if !self.view.tree().is_attribute(id) {
            return Outcome::Declined;
        }
        let Some(element) = self.parent_element(id) else {
            return Outcome::Declined;
        };
        self.view.remove(id);
        self.changed(Some(element));
        self.applied(Some(Focus::OpeningTag(element)))
    }

    /// Add an attribute. An existing attribute of that name declines; an
    /// empty value opens the attribute's asker.
    pub fn new_attribute(&mut self, element: NodeId, name: &str, value: &str) -> Outcome {
        let Some(el) = self.view.tree().element(element) else {
            return Outcome::Declined;
        };
        if el.has_attribute(name) {
            return Outcome::Declined;
        }
        let id = self.view.new_attribute(name, value);
        self.view.append_attribute(element, id);
        self.changed(Some(id));

        if self.view.state(id).map(|s| s.shy).unwrap_or(false) {
            self.view.state_mut(element).rolled_out = true;
        }
        if value.is_empty() {
            self.click(Focus::AttributeValue(id));
        }
        self.applied(Some(Focus::AttributeValue(id)))
    }

    pub fn set_attribute_value(&mut self, id: NodeId, value: &str) -> Outcome {
        if !self.view.tree().is_attribute(id) || !self.view.set_value(id, value) {
            return Outcome::Declined;
        }
        self.changed(Some(id));
        self.applied(Some(Focus::AttributeValue(id)))
    }

    // --- Text ----------------------------------------------------------------

    /// Change a text node's value in place
    pub fn set_text_value(&mut self, id: NodeId, value: &str) -> Outcome {
        if !self.view.tree().is_text(id) || !self.view.set_value(id, value) {
            return Outcome::Declined;
        }
        self.changed(Some(id));
        self.applied(Some(Focus::text(id)))
    }

    /// Select text and offer the inline menu of the element holding it
    pub fn select_text(&mut self, selection: TextSelection) -> bool {
        if !self.is_valid_selection(&selection) {
            return false;
        }
        let Some(parent) = self.parent_element(selection.from_text) else {
            return false;
        };
        if self.is_read_only(parent) {
            return false;
        }
        let Some(harvest) = self.cache.harvest(&self.view, parent) else {
            return false;
        };
        let Some(el) = harvest.element() else {
            return false;
        };
        let def = self.schema.element(el.name());
        let entries = build_menu(&def.inline_menu, NodeRef::Element(el), &self.config.lang);
        if entries.is_empty() {
            return false;
        }

        let value = self.view.tree().value(selection.from_text).unwrap_or_default();
        let token = text_tokens(value)
            .iter()
            .position(|(_, end)| selection.from_index < *end)
            .unwrap_or(0);
        let target = Focus::Text {
            id: selection.from_text,
            token,
        };
        self.cancel_bubble();
        self.focus = Some(target);
        self.bubble = Some(Bubble::menu(target, entries));
        self.selection = Some(selection);
        true
    }

    fn is_valid_selection(&self, selection: &TextSelection) -> bool {
        let tree = self.view.tree();
        let (Some(from), Some(till)) = (tree.value(selection.from_text), tree.value(selection.till_text)) else {
            return false;
        };
        if !tree.is_text(selection.from_text) || !tree.is_text(selection.till_text) {
            return false;
        }
        if tree.parent_of(selection.from_text) != tree.parent_of(selection.till_text) {
            return false;
        }
        if selection.from_text == selection.till_text {
            return selection.from_index <= selection.till_index && selection.till_index < from.chars().count();
        }
        let order = (
            tree.index_in_parent(selection.from_text),
            tree.index_in_parent(selection.till_text),
        );
        match order {
            (Some(a), Some(b)) => {
                a < b && selection.from_index <= from.chars().count() && selection.till_index < till.chars().count()
            }
            _ => false,
        }
    }

    /// Put the selected content inside a new element made from `template`.
    ///
    /// The first occurrence of `placeholder` in the template receives the
    /// selection: escaped text, plus the serialized siblings in between when
    /// the selection spans several nodes. The template is parsed before the
    /// view is touched.
    pub fn wrap(&mut self, selection: TextSelection, template: &str, placeholder: &str) -> Outcome {
        if !self.is_valid_selection(&selection) {
            return Outcome::Declined;
        }
        let Some(parent) = self.parent_element(selection.from_text) else {
            return Outcome::Declined;
        };
        let tree = self.view.tree();
        let from_value = tree.value(selection.from_text).unwrap_or_default();
        let till_value = tree.value(selection.till_text).unwrap_or_default();

        let (open, rest) = char_split(from_value, selection.from_index);
        let (content, close, between) = if selection.from_text == selection.till_text {
            let (middle, close) = char_split(&rest, selection.till_index + 1 - selection.from_index);
            (escape(&middle), close, Vec::new())
        } else {
            let (middle_close, close) = char_split(till_value, selection.till_index + 1);
            let siblings = tree.children(parent);
            let start = tree.index_in_parent(selection.from_text).unwrap_or(0) + 1;
            let end = tree.index_in_parent(selection.till_text).unwrap_or(start);
            let between: Vec<NodeId> = siblings[start..end].to_vec();
            let mut content = escape(&rest);
            for id in &between {
                content.push_str(&serialize_node(tree, *id));
            }
            content.push_str(&escape(&middle_close));
            (content, close, between)
        };
        let xml = template.replacen(placeholder, &content, 1);

        let Some(wrapper) = self.render_xml(&xml, Some(parent)) else {
            return Outcome::Declined;
        };
        let open = self.view.new_text(open);
        let close = self.view.new_text(close);
        for id in between {
            self.view.remove(id);
        }
        if selection.till_text != selection.from_text {
            self.view.remove(selection.till_text);
        }
        self.view.replace(selection.from_text, &[open, wrapper, close]);
        self.selection = None;
        debug!(node = %wrapper, "Wrapped selection");

        self.reorder(parent);
        self.changed(Some(wrapper));
        self.applied(Some(Focus::OpeningTag(wrapper)))
    }

    /// Replace an element with its children
    pub fn unwrap(&mut self, id: NodeId) -> Outcome {
        if !self.view.tree().is_element(id) {
            return Outcome::Declined;
        }
        let Some(parent) = self.parent_element(id) else {
            return Outcome::Declined;
        };
        let children = self.view.tree().children(id).to_vec();
        if !self.view.replace(id, &children) {
            return Outcome::Declined;
        }
        self.reorder(parent);
        self.changed(Some(parent));
        self.applied(Some(Focus::OpeningTag(parent)))
    }

    // --- Elements ----------------------------------------------------------

    /// Remove an element. Focus goes to its parent unless it was parked in
    /// the layby.
    pub fn delete_element(&mut self, id: NodeId) -> Outcome {
        if !self.view.tree().is_element(id) || id == self.view.root_id() {
            return Outcome::Declined;
        }
        let parent = self.parent_element(id);
        let parked = self.view.in_layby(id);
        if !self.view.remove(id) {
            return Outcome::Declined;
        }
        self.changed(parent);
        match parent {
            Some(parent) if !parked => self.applied(Some(Focus::OpeningTag(parent))),
            _ => self.applied(None),
        }
    }

    pub fn new_element_child(&mut self, parent: NodeId, xml: &str) -> Outcome {
        if !self.view.tree().is_element(parent) {
            return Outcome::Declined;
        }
        let Some(child) = self.render_xml(xml, Some(parent)) else {
            return Outcome::Declined;
        };
        self.view.append_child(parent, child);
        self.expand(parent);
        self.reorder(parent);
        self.changed(Some(child));
        self.applied(Some(Focus::OpeningTag(child)))
    }

    pub fn new_element_before(&mut self, sibling: NodeId, xml: &str) -> Outcome {
        self.new_element_beside(sibling, xml, 0)
    }

    pub fn new_element_after(&mut self, sibling: NodeId, xml: &str) -> Outcome {
        self.new_element_beside(sibling, xml, 1)
    }

    fn new_element_beside(&mut self, sibling: NodeId, xml: &str, offset: usize) -> Outcome {
        let Some(parent) = self.parent_element(sibling) else {
            return Outcome::Declined;
        };
        let Some(index) = self.view.tree().index_in_parent(sibling) else {
            return Outcome::Declined;
        };
        let Some(element) = self.render_xml(xml, Some(parent)) else {
            return Outcome::Declined;
        };
        self.view.insert_child(parent, index + offset, element);
        self.reorder(parent);
        self.changed(Some(element));
        self.applied(Some(Focus::OpeningTag(element)))
    }

    /// Park a new element in the layby
    pub fn new_element_layby(&mut self, xml: &str) -> Outcome {
        if !self.schema.allow_layby {
            return Outcome::Declined;
        }
        let Some(element) = self.render_xml(xml, None) else {
            return Outcome::Declined;
        };
        if !self.view.push_layby(element) {
            self.view.remove(element);
            return Outcome::Declined;
        }
        self.view.set_layby_open(true);
        self.changed(Some(element));
        self.applied(Some(Focus::OpeningTag(element)))
    }

    /// Replace an element with freshly parsed XML, read as if it sat where
    /// the element is
    pub fn replace_with_xml(&mut self, id: NodeId, xml: &str) -> Outcome {
        if !self.view.tree().is_element(id) {
            return Outcome::Declined;
        }
        let parent = self.parent_element(id);
        let Some(element) = self.render_xml(xml, parent) else {
            return Outcome::Declined;
        };
        if !self.view.replace(id, &[element]) {
            self.view.remove(element);
            return Outcome::Declined;
        }
        if let Some(parent) = parent {
            self.reorder(parent);
        }
        self.changed(Some(element));
        self.applied(Some(Focus::OpeningTag(element)))
    }

    /// Open the element's XML for editing; the answer replaces the element
    pub fn edit_raw(&mut self, id: NodeId) -> Outcome {
        let Some(harvest) = self.cache.harvest(&self.view, id) else {
            return Outcome::Declined;
        };
        if harvest.element().is_none() || self.is_read_only(id) {
            return Outcome::Declined;
        }
        let xml = harvest.to_xml();
        let target = Focus::OpeningTag(id);
        self.focus = Some(target);
        self.bubble = Some(Bubble::asker(target, Asker::LongString, xml));
        Outcome::Applied { focus: Some(target) }
    }

    /// Copy an element, unsaved display state included, right after itself
    pub fn duplicate_element(&mut self, id: NodeId) -> Outcome {
        if !self.view.tree().is_element(id) || id == self.view.root_id() {
            return Outcome::Declined;
        }
        let parent = self.parent_element(id);
        let index = self.view.tree().index_in_parent(id);
        let Some(copy) = self.view.duplicate(id) else {
            return Outcome::Declined;
        };
        let placed = match (parent, index) {
            (Some(parent), Some(index)) => self.view.insert_child(parent, index + 1, copy),
            _ => self.view.push_layby(copy),
        };
        if !placed {
            self.view.remove(copy);
            return Outcome::Declined;
        }
        if let Some(parent) = parent {
            self.reorder(parent);
        }
        self.changed(Some(copy));
        self.applied(Some(Focus::OpeningTag(copy)))
    }

    pub fn can_move_element_up(&mut self, id: NodeId) -> bool {
        self.move_gap(id, true).is_some()
    }

    pub fn can_move_element_down(&mut self, id: NodeId) -> bool {
        self.move_gap(id, false).is_some()
    }

    pub fn move_element_up(&mut self, id: NodeId) -> Outcome {
        self.move_element(id, true)
    }

    pub fn move_element_down(&mut self, id: NodeId) -> Outcome {
        self.move_element(id, false)
    }

    fn move_gap(&mut self, id: NodeId, up: bool) -> Option<crate::drop_targets::Gap> {
        if !self.view.tree().is_element(id) || id == self.view.root_id() || self.view.in_layby(id) {
            return None;
        }
        self.cache.clear(&self.view);
        if up {
            gap_above(&self.view, &mut self.cache, &self.schema, id)
        } else {
            gap_below(&self.view, &mut self.cache, &self.schema, id)
        }
    }

    fn move_element(&mut self, id: NodeId, up: bool) -> Outcome {
        let Some(gap) = self.move_gap(id, up) else {
            return Outcome::Declined;
        };
        if !drop_into(&mut self.view, id, gap) {
            return Outcome::Declined;
        }
        self.reorder(gap.parent);
        self.changed(Some(id));
        self.applied(Some(Focus::OpeningTag(id)))
    }

    pub fn merge_with_previous(&mut self, id: NodeId) -> Outcome {
        let live = self
            .view
            .tree()
            .element(id)
            .and_then(|el| el.preceding_sibling())
            .map(|el| el.id());
        match live {
            Some(live) => self.merge(id, live),
            None => Outcome::Declined,
        }
    }

    pub fn merge_with_next(&mut self, id: NodeId) -> Outcome {
        let live = self
            .view
            .tree()
            .element(id)
            .and_then(|el| el.following_sibling())
            .map(|el| el.id());
        match live {
            Some(live) => self.merge(id, live),
            None => Outcome::Declined,
        }
    }

    /// Fold `dead` into `live` and drop it.
    ///
    /// Attributes fill in what `live` lacks or has empty. Text-bearing
    /// elements get their children concatenated; others keep one copy of
    /// each distinct child element and lose the text of `dead`.
    fn merge(&mut self, dead: NodeId, live: NodeId) -> Outcome {
        let tree = self.view.tree();
        let (Some(dead_el), Some(live_el)) = (tree.element(dead), tree.element(live)) else {
            return Outcome::Declined;
        };

        let mut fill = Vec::new();
        let mut overwrite = Vec::new();
        for at in dead_el.attributes() {
            match live_el.attribute(at.name()) {
                None => fill.push((at.name().to_string(), at.value().to_string())),
                Some(existing) if existing.value().is_empty() => {
                    overwrite.push((existing.id(), at.value().to_string()))
                }
                Some(_) => {}
            }
        }

        let has_text = [dead, live]
            .iter()
            .any(|id| self.view.state(*id).map(|s| s.has_text).unwrap_or(false));
        let separate = has_text && !dead_el.get_text().is_empty() && !live_el.get_text().is_empty();
        let moving: Vec<NodeId> = if has_text {
            dead_el.child_ids().to_vec()
        } else {
            let mut seen: HashSet<String> = live_el.child_ids().iter().map(|c| serialize_node(tree, *c)).collect();
            dead_el
                .child_ids()
                .iter()
                .filter(|c| tree.is_element(**c))
                .filter(|c| seen.insert(serialize_node(tree, **c)))
                .copied()
                .collect()
        };

        for (name, value) in fill {
            let at = self.view.new_attribute(name, value);
            self.view.append_attribute(live, at);
        }
        for (at, value) in overwrite {
            self.view.set_value(at, value);
        }
        if separate {
            let space = self.view.new_text(" ");
            self.view.append_child(live, space);
        }
        for child in moving {
            self.view.append_child(live, child);
        }
        self.reorder(live);
        self.view.remove(dead);
        debug!(dead = %dead, live = %live, "Merged elements");

        self.changed(Some(live));
        self.applied(Some(Focus::OpeningTag(live)))
    }

    /// Remove every sibling element with the same definition
    pub fn delete_eponymous_siblings(&mut self, id: NodeId) -> Outcome {
        let Some(el) = self.view.tree().element(id) else {
            return Outcome::Declined;
        };
        let Some(parent) = el.parent() else {
            return Outcome::Declined;
        };
        let doomed: Vec<NodeId> = parent
            .child_elements_named(el.name())
            .iter()
            .map(|s| s.id())
            .filter(|s| *s != id)
            .collect();
        if doomed.is_empty() {
            return Outcome::Declined;
        }
        let parent = parent.id();
        for sibling in doomed {
            self.view.remove(sibling);
        }
        self.changed(Some(parent));
        self.applied(None)
    }

    // --- Menu actions ------------------------------------------------------

    /// Run a menu action on `node`
    pub fn run_action(&mut self, node: NodeId, action: &EditAction) -> Outcome {
        debug!(node = %node, action = action.name(), "Running action");
        self.bubble = None;
        match action {
            EditAction::DeleteAttribute => self.delete_attribute(node),
            EditAction::DeleteElement => self.delete_element(node),
            EditAction::NewAttribute { name, value } => self.new_attribute(node, name, value),
            EditAction::NewElementChild(xml) => self.new_element_child(node, xml),
            EditAction::NewElementBefore(xml) => self.new_element_before(node, xml),
            EditAction::NewElementAfter(xml) => self.new_element_after(node, xml),
            EditAction::NewElementLayby(xml) => self.new_element_layby(xml),
            EditAction::Wrap { template, placeholder } => match self.selection.take() {
                Some(selection) => self.wrap(selection, template, placeholder),
                None => Outcome::Declined,
            },
            EditAction::Unwrap => self.unwrap(node),
            EditAction::DuplicateElement => self.duplicate_element(node),
            EditAction::MoveElementUp => self.move_element_up(node),
            EditAction::MoveElementDown => self.move_element_down(node),
            EditAction::MergeWithPrevious => self.merge_with_previous(node),
            EditAction::MergeWithNext => self.merge_with_next(node),
            EditAction::DeleteEponymousSiblings => self.delete_eponymous_siblings(node),
            EditAction::EditRaw => self.edit_raw(node),
            EditAction::Custom { action, parameter } => {
                let edit = match self.cache.harvest(&self.view, node) {
                    Some(harvest) => match harvest.node() {
                        Some(node_ref) => action(node_ref, parameter),
                        None => CustomEdit::Nothing,
                    },
                    None => CustomEdit::Nothing,
                };
                self.apply_custom(node, edit)
            }
            EditAction::Noop => Outcome::Declined,
        }
    }

    fn apply_custom(&mut self, node: NodeId, edit: CustomEdit) -> Outcome {
        match edit {
            CustomEdit::Nothing => Outcome::Declined,
            CustomEdit::ReplaceWith(xml) => self.replace_with_xml(node, &xml),
            CustomEdit::SetValue(value) if self.view.tree().is_attribute(node) => {
                self.set_attribute_value(node, &value)
            }
            CustomEdit::SetValue(value) => self.set_text_value(node, &value),
        }
    }
}
