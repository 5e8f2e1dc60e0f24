//! # Editor Session
//!
//! One editor over one document. The session owns everything that changes
//! while the user works: the view, its harvest cache, the keyboard focus,
//! the open bubble, drag state and the latest validation warnings.
//!
//! Every completed edit goes through [`EditorSession::changed`]: the cache
//! is cleared synchronously, the refresh pass restores the view's
//! invariants, validation runs and the schema's change callback fires.

use tracing::{debug, warn};
use xedit_model::{load_or_placeholder, parse_document, Document, ModelError, NodeId, NodeRef};
use xedit_schema::{Asker, Mode, PickOption, Schema, Warnings};

use crate::bubble::{build_menu, find_key_action, Bubble, BubbleContent};
use crate::config::EditorConfig;
use crate::drop_targets::{drop_into, drop_targets, Gap};
use crate::errors::EditorResult;
use crate::focus::{go_down, go_left, go_right, go_up, Focus, Key, KeyEvent};
use crate::harvest::{Harvest, HarvestCache};
use crate::operations::TextSelection;
use crate::refresh::refresh;
use crate::remote::{filter_options, RemoteCache, RemoteSource};
use crate::render::render_document;
use crate::view::View;

/// What an operation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The document changed; `focus` is where the keyboard focus went
    Applied { focus: Option<Focus> },
    /// A precondition failed and nothing changed
    Declined,
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied { .. })
    }
}

/// What a key press amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResponse {
    Handled,
    /// Not for the editor; let the embedder have it
    Ignored,
    ScrollUp,
    ScrollDown,
}

/// An element being dragged and the gaps it may land in
#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    pub node: NodeId,
    pub targets: Vec<Gap>,
}

pub struct EditorSession {
    pub(crate) view: View,
    pub(crate) cache: HarvestCache,
    pub(crate) schema: Schema,
    pub(crate) config: EditorConfig,
    pub(crate) focus: Option<Focus>,
    pub(crate) bubble: Option<Bubble>,
    pub(crate) warnings: Warnings,
    pub(crate) drag: Option<DragState>,
    pub(crate) selection: Option<TextSelection>,
    pub(crate) remote: RemoteCache,
}

impl EditorSession {
    /// Open a document, substituting the placeholder document when it does
    /// not parse. The parse error, if any, is handed back once.
    pub fn load(xml: &str, schema: Schema, config: EditorConfig) -> (Self, Option<ModelError>) {
        let (doc, err) = load_or_placeholder(xml, &schema, &config.placeholder_document);
        (Self::from_document(&doc, schema, config), err)
    }

    /// Open a document that must parse
    pub fn from_xml(xml: &str, schema: Schema, config: EditorConfig) -> EditorResult<Self> {
        let doc = parse_document(xml, &schema)?;
        Ok(Self::from_document(&doc, schema, config))
    }

    pub fn from_document(doc: &Document, schema: Schema, config: EditorConfig) -> Self {
        let view = render_document(doc, &schema);
        let cache = HarvestCache::new(&view);
        let mut session = Self {
            view,
            cache,
            schema,
            config,
            focus: None,
            bubble: None,
            warnings: Warnings::new(),
            drag: None,
            selection: None,
            remote: RemoteCache::new(),
        };
        session.settle();
        session
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn focus(&self) -> Option<Focus> {
        self.focus
    }

    pub fn set_focus(&mut self, focus: Option<Focus>) {
        self.focus = focus.filter(|f| self.view.is_attached(f.node()));
    }

    pub fn bubble(&self) -> Option<&Bubble> {
        self.bubble.as_ref()
    }

    pub fn warnings(&self) -> &Warnings {
        &self.warnings
    }

    pub fn drag(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    /// Model node reconstructed from the view
    pub fn harvest(&mut self, id: NodeId) -> Option<Harvest> {
        self.cache.harvest(&self.view, id)
    }

    /// The document as XML
    pub fn to_xml(&mut self) -> String {
        self.cache.harvest_document(&self.view)
    }

    /// Report a completed change: refresh, validate, notify
    pub fn changed(&mut self, node: Option<NodeId>) {
        self.settle();
        self.schema.notify_change(node);
    }

    fn settle(&mut self) {
        refresh(&mut self.view, &mut self.cache, &self.schema, &self.config.lang);
        self.cache.clear(&self.view);
        self.validate();
        if self.focus.map(|f| !self.view.is_attached(f.node())).unwrap_or(false) {
            self.focus = None;
        }
    }

    fn validate(&mut self) {
        let root = self.view.root_id();
        let warnings = match self.cache.harvest(&self.view, root) {
            Some(harvest) => harvest.element().map(|el| self.schema.validate(el)).unwrap_or_default(),
            None => Warnings::new(),
        };
        for state in self.view.states.values_mut() {
            state.invalid = false;
        }
        for warning in warnings.iter() {
            if self.view.contains(warning.node) {
                self.view.state_mut(warning.node).invalid = true;
            }
        }
        self.warnings = warnings;
    }

    /// Focus and report an applied change
    pub(crate) fn applied(&mut self, focus: Option<Focus>) -> Outcome {
        let focus = focus.filter(|f| self.view.is_attached(f.node()));
        if focus.is_some() {
            self.focus = focus;
        }
        Outcome::Applied { focus }
    }

    /// Whether the node, or anything above it, is read-only
    pub fn is_read_only(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.view.state(node).map(|s| s.read_only).unwrap_or(false) {
                return true;
            }
            current = self.view.tree().parent_of(node);
        }
        false
    }

    // --- Mode ---------------------------------------------------------------

    pub fn set_mode(&mut self, mode: Mode) {
        if self.config.mode == mode {
            return;
        }
        self.config.mode = mode;
        if let (Mode::Laic, Some(Focus::ClosingTag(id))) = (mode, self.focus) {
            self.focus = Some(Focus::OpeningTag(id));
        }
        debug!(?mode, "Switched mode");
        self.schema.notify_mode_switch(mode);
    }

    // --- Collapse and rollout -------------------------------------------------

    pub fn collapse(&mut self, id: NodeId) -> bool {
        let can = self.view.tree().is_element(id)
            && !self.view.tree().children(id).is_empty()
            && self.view.state(id).map(|s| s.collapsible && !s.collapsed).unwrap_or(false);
        if !can {
            return false;
        }
        self.view.state_mut(id).collapsed = true;
        if let Some(focus) = self.focus {
            if focus.node() != id && self.view.tree().is_ancestor_or_self(id, focus.node()) {
                self.focus = Some(Focus::ChildrenCollapsed(id));
            }
        }
        true
    }

    pub fn expand(&mut self, id: NodeId) -> bool {
        if !self.view.state(id).map(|s| s.collapsed).unwrap_or(false) {
            return false;
        }
        self.view.state_mut(id).collapsed = false;
        if self.focus == Some(Focus::ChildrenCollapsed(id)) {
            self.focus = Some(Focus::OpeningTag(id));
        }
        true
    }

    pub fn toggle_collapse(&mut self, id: NodeId) -> bool {
        if self.view.state(id).map(|s| s.collapsed).unwrap_or(false) {
            self.expand(id)
        } else {
            self.collapse(id)
        }
    }

    /// Show or hide an element's shy attributes
    pub fn toggle_rollout(&mut self, id: NodeId) -> bool {
        if !self.view.state(id).map(|s| s.has_shy).unwrap_or(false) {
            return false;
        }
        let rolled_out = !self.view.state(id).map(|s| s.rolled_out).unwrap_or(false);
        self.view.state_mut(id).rolled_out = rolled_out;
        if !rolled_out {
            if let Some(Focus::AttributeName(at) | Focus::AttributeValue(at)) = self.focus {
                let shy = self.view.state(at).map(|s| s.shy).unwrap_or(false);
                if shy && self.view.tree().parent_of(at) == Some(id) {
                    self.focus = Some(Focus::Rollouter(id));
                }
            }
        }
        true
    }

    // --- Clicks and the bubble -------------------------------------------------

    /// Focus a unit and open whatever it opens. Returns whether a bubble or a
    /// toggle resulted.
    pub fn click(&mut self, target: Focus) -> bool {
        let node = target.node();
        if !self.view.is_attached(node) {
            return false;
        }
        self.cancel_bubble();
        self.focus = Some(target);
        if self.is_read_only(node) {
            return false;
        }
        match target {
            Focus::OpeningTag(id) | Focus::ClosingTag(id) => self.open_element_menu(target, id),
            Focus::AttributeName(id) => self.open_attribute_menu(target, id),
            Focus::AttributeValue(id) => self.open_attribute_asker(target, id),
            Focus::Text { id, .. } => self.open_text_asker(target, id),
            Focus::ChildrenCollapsed(id) => self.expand(id),
            Focus::Rollouter(id) => self.toggle_rollout(id),
        }
    }

    /// Show the warnings registered on a node
    pub fn click_warner(&mut self, id: NodeId) -> bool {
        let messages: Vec<String> = self.warnings.for_node(id).map(|w| w.text.clone()).collect();
        if messages.is_empty() {
            return false;
        }
        let target = if self.view.tree().is_attribute(id) {
            Focus::AttributeName(id)
        } else if self.view.tree().is_text(id) {
            Focus::text(id)
        } else {
            Focus::OpeningTag(id)
        };
        self.bubble = Some(Bubble::warnings(target, messages));
        true
    }

    fn open_element_menu(&mut self, target: Focus, id: NodeId) -> bool {
        let Some(harvest) = self.cache.harvest(&self.view, id) else {
            return false;
        };
        let Some(el) = harvest.element() else {
            return false;
        };
        let def = self.schema.element(el.name());
        let entries = build_menu(&def.menu, NodeRef::Element(el), &self.config.lang);
        if entries.is_empty() {
            return false;
        }
        self.bubble = Some(Bubble::menu(target, entries));
        true
    }

    fn open_attribute_menu(&mut self, target: Focus, id: NodeId) -> bool {
        let Some(harvest) = self.cache.harvest(&self.view, id) else {
            return false;
        };
        let Some(at) = harvest.node().and_then(|n| n.as_attribute()) else {
            return false;
        };
        let Some(el) = at.parent() else {
            return false;
        };
        let def = self.schema.attribute(el.name(), at.name());
        let entries = build_menu(&def.menu, NodeRef::Attribute(at), &self.config.lang);
        if entries.is_empty() {
            return false;
        }
        self.bubble = Some(Bubble::menu(target, entries));
        true
    }

    fn open_attribute_asker(&mut self, target: Focus, id: NodeId) -> bool {
        let Some(el) = self.view.tree().parent_of(id).and_then(|p| self.view.tree().element(p)) else {
            return false;
        };
        let Some(at) = self.view.tree().attribute(id) else {
            return false;
        };
        let asker = self.schema.attribute(el.name(), at.name()).asker.clone();
        let value = at.value().to_string();
        self.bubble = Some(Bubble::asker(target, asker, value));
        true
    }

    fn open_text_asker(&mut self, target: Focus, id: NodeId) -> bool {
        let Some(parent) = self.view.tree().parent_of(id).and_then(|p| self.view.tree().element(p)) else {
            return false;
        };
        let asker = self.schema.element(parent.name()).asker.clone();
        let value = self.view.tree().value(id).unwrap_or_default().to_string();
        self.bubble = Some(Bubble::asker(target, asker, value));
        true
    }

    pub fn cancel_bubble(&mut self) {
        self.bubble = None;
        self.selection = None;
    }

    /// Replace the value typed into the open asker
    pub fn set_draft(&mut self, draft: impl Into<String>) {
        if let Some(Bubble {
            content: BubbleContent::Asker { value, .. },
            ..
        }) = &mut self.bubble
        {
            *value = draft.into();
        }
    }

    /// Options the open asker offers for what has been typed so far
    pub fn asker_options(&mut self, source: &dyn RemoteSource, typed: &str) -> Vec<PickOption> {
        let Some(Bubble {
            content: BubbleContent::Asker { asker, .. },
            ..
        }) = &self.bubble
        else {
            return Vec::new();
        };
        match asker {
            Asker::Picklist(options) | Asker::OpenPicklist(options) => filter_options(options, typed),
            Asker::Remote(remote) => {
                let url = match &remote.search_url {
                    Some(search) if !typed.is_empty() => search.replace(&remote.url_placeholder, typed),
                    _ => remote.url.clone(),
                };
                let mut options = remote.add.clone();
                options.extend(self.remote.options(source, &url));
                filter_options(&options, typed)
            }
            Asker::Custom(f) => f(typed),
            Asker::String | Asker::LongString => Vec::new(),
        }
    }

    /// Create `typed` through the open remote asker's create URL, then
    /// forget the cached search results so the new value shows up
    pub fn remote_create(&mut self, source: &dyn RemoteSource, typed: &str) -> bool {
        let typed = typed.trim();
        let Some(Bubble {
            content: BubbleContent::Asker {
                asker: Asker::Remote(remote),
                ..
            },
            ..
        }) = &self.bubble
        else {
            return false;
        };
        let Some(create_url) = &remote.create_url else {
            return false;
        };
        if typed.is_empty() {
            return false;
        }
        let created = source.create(&create_url.replace(&remote.url_placeholder, typed));
        if created {
            let search = remote.search_url.as_ref().unwrap_or(&remote.url);
            self.remote.invalidate(&search.replace(&remote.url_placeholder, typed));
        }
        created
    }

    /// Commit the open asker with `value`
    pub fn answer(&mut self, value: &str) -> Outcome {
        let Some(bubble) = self.bubble.take() else {
            return Outcome::Declined;
        };
        if !matches!(bubble.content, BubbleContent::Asker { .. }) {
            return Outcome::Declined;
        }
        match bubble.target {
            Focus::AttributeValue(id) => self.set_attribute_value(id, value),
            Focus::Text { id, .. } => self.set_text_value(id, value),
            Focus::OpeningTag(id) => self.replace_with_xml(id, value),
            _ => Outcome::Declined,
        }
    }

    /// Run a menu item of the open bubble, addressed by its position
    /// (sub-menus included)
    pub fn choose(&mut self, path: &[usize]) -> Outcome {
        let Some(bubble) = self.bubble.take() else {
            return Outcome::Declined;
        };
        let mut entries = bubble.entries();
        let mut chosen = None;
        for &index in path {
            let Some(entry) = entries.get(index) else {
                return Outcome::Declined;
            };
            entries = entry.submenu.as_slice();
            chosen = Some(entry.action.clone());
        }
        match chosen {
            Some(action) => self.run_action(bubble.target.node(), &action),
            None => Outcome::Declined,
        }
    }

    // --- Keyboard ----------------------------------------------------------

    pub fn handle_key(&mut self, event: &KeyEvent) -> KeyResponse {
        if let Some(bubble) = &self.bubble {
            return match (&event.key, event.ctrl) {
                (Key::Escape, _) => {
                    self.cancel_bubble();
                    KeyResponse::Handled
                }
                (Key::Enter, true) => {
                    if let BubbleContent::Asker { value, .. } = &bubble.content {
                        let value = value.clone();
                        self.answer(&value);
                    }
                    KeyResponse::Handled
                }
                _ => KeyResponse::Ignored,
            };
        }

        let arrows = self.config.key_nav;
        match (&event.key, event.ctrl, event.shift || event.alt) {
            (Key::Escape, false, false) => KeyResponse::Ignored,
            (Key::Enter, false, false) => {
                match self.focus {
                    Some(Focus::ChildrenCollapsed(id)) => {
                        self.expand(id);
                    }
                    Some(focus) => {
                        self.click(focus);
                    }
                    None => return KeyResponse::Ignored,
                }
                KeyResponse::Handled
            }
            (Key::Down, true, false) => KeyResponse::ScrollDown,
            (Key::Up, true, false) => KeyResponse::ScrollUp,
            (Key::Left, true, false) => match self.focused_element() {
                Some(id) if self.collapse(id) => KeyResponse::Handled,
                _ => KeyResponse::Ignored,
            },
            (Key::Right, true, false) => match self.focused_element() {
                Some(id) if self.expand(id) => KeyResponse::Handled,
                _ => KeyResponse::Ignored,
            },
            (Key::Up | Key::Down | Key::Left | Key::Right, false, false) if arrows => {
                self.navigate(&event.key);
                KeyResponse::Handled
            }
            _ if event.has_modifier() => {
                if self.keyboard_menu(event) {
                    KeyResponse::Handled
                } else {
                    KeyResponse::Ignored
                }
            }
            _ => KeyResponse::Ignored,
        }
    }

    fn navigate(&mut self, key: &Key) {
        let mode = self.config.mode;
        let Some(current) = self.focus else {
            self.focus = Some(Focus::OpeningTag(self.view.root_id()));
            return;
        };
        let next = match key {
            Key::Down => go_down(&self.view, mode, current),
            Key::Up => go_up(&self.view, mode, current),
            Key::Right => go_right(&self.view, mode, Some(current)),
            Key::Left => go_left(&self.view, mode, Some(current)),
            _ => None,
        };
        if let Some(next) = next {
            self.focus = Some(next);
        }
    }

    fn focused_element(&self) -> Option<NodeId> {
        match self.focus? {
            Focus::OpeningTag(id) | Focus::ClosingTag(id) | Focus::ChildrenCollapsed(id) => Some(id),
            _ => None,
        }
    }

    /// Run the first menu action whose key trigger matches
    fn keyboard_menu(&mut self, event: &KeyEvent) -> bool {
        let Some(focus) = self.focus else {
            return false;
        };
        let node = focus.node();
        if self.is_read_only(node) {
            return false;
        }
        let Some(harvest) = self.cache.harvest(&self.view, node) else {
            return false;
        };
        let action = match (focus, harvest.node()) {
            (Focus::OpeningTag(_) | Focus::ClosingTag(_), Some(NodeRef::Element(el))) => {
                let def = self.schema.element(el.name());
                find_key_action(&def.menu, NodeRef::Element(el), event)
            }
            (Focus::AttributeName(_) | Focus::AttributeValue(_), Some(NodeRef::Attribute(at))) => {
                match at.parent() {
                    Some(el) => {
                        let def = self.schema.attribute(el.name(), at.name());
                        find_key_action(&def.menu, NodeRef::Attribute(at), event)
                    }
                    None => None,
                }
            }
            _ => None,
        };
        match action {
            Some(action) => {
                self.run_action(node, &action);
                true
            }
            None => false,
        }
    }

    // --- Drag and drop --------------------------------------------------------

    pub fn start_drag(&mut self, id: NodeId) -> bool {
        let draggable = self.view.tree().is_element(id)
            && id != self.view.root_id()
            && self.view.state(id).map(|s| s.draggable).unwrap_or(false)
            && !self.is_read_only(id);
        if !draggable {
            return false;
        }
        self.bubble = None;
        self.cache.clear(&self.view);
        let targets = drop_targets(&self.view, &mut self.cache, &self.schema, id);
        debug!(node = %id, targets = targets.len(), "Drag started");
        self.drag = Some(DragState { node: id, targets });
        true
    }

    pub fn drop_on(&mut self, gap: Gap) -> Outcome {
        let Some(drag) = self.drag.take() else {
            return Outcome::Declined;
        };
        if !drag.targets.contains(&gap) {
            warn!(node = %drag.node, parent = %gap.parent, index = gap.index, "Not a drop target");
            return Outcome::Declined;
        }
        if !drop_into(&mut self.view, drag.node, gap) {
            return Outcome::Declined;
        }
        self.reorder(gap.parent);
        self.changed(Some(drag.node));
        self.applied(Some(Focus::OpeningTag(drag.node)))
    }

    /// Park the dragged element in the layby
    pub fn drop_on_layby(&mut self) -> Outcome {
        if !self.schema.allow_layby {
            return Outcome::Declined;
        }
        let Some(drag) = self.drag.take() else {
            return Outcome::Declined;
        };
        if !self.view.push_layby(drag.node) {
            return Outcome::Declined;
        }
        self.view.set_layby_open(true);
        self.changed(Some(drag.node));
        self.applied(Some(Focus::OpeningTag(drag.node)))
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    // --- Layby ---------------------------------------------------------------

    pub fn open_layby(&mut self) {
        self.view.set_layby_open(true);
    }

    pub fn close_layby(&mut self) {
        self.view.set_layby_open(false);
        if self.focus.map(|f| self.view.in_layby(f.node())).unwrap_or(false) {
            self.focus = None;
        }
    }

    pub fn empty_layby(&mut self) -> Outcome {
        if self.view.layby().is_empty() {
            return Outcome::Declined;
        }
        self.view.clear_layby();
        self.view.set_layby_open(false);
        self.changed(None);
        self.applied(None)
    }
}
