//! # Normalized Schema Graph
//!
//! Every definition here is complete: each predicate is callable, every
//! default filled in. Definitions can only be produced by the normalizer;
//! the private [`Normalized`] marker keeps outside code from building a
//! half-filled one by hand.

use crate::props::{AttributeFn, ElementFn, NodeFn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::rc::Rc;
use xedit_model::{AttributeRef, ElementRef, NodeRef};

/// Proof that a definition came out of the normalizer
#[derive(Debug, Clone, Copy)]
pub(crate) struct Normalized;

pub struct ElementDefinition {
    pub element_name: ElementFn<String>,
    pub display_name: Option<ElementFn<String>>,
    pub title: Option<ElementFn<String>>,
    pub caption: Option<ElementFn<String>>,
    pub display_value: Option<ElementFn<String>>,
    pub collapsoid: Option<ElementFn<String>>,
    pub background_colour: ElementFn<String>,
    pub has_text: ElementFn<bool>,
    pub oneliner: ElementFn<bool>,
    pub collapsible: ElementFn<bool>,
    pub collapsed: ElementFn<bool>,
    pub local_drop_only: ElementFn<bool>,
    pub is_read_only: Option<ElementFn<bool>>,
    pub is_invisible: Option<ElementFn<bool>>,
    pub must_be_before: Option<ElementFn<Vec<String>>>,
    pub must_be_after: Option<ElementFn<Vec<String>>>,
    pub can_drop_to: ElementFn<Vec<String>>,
    /// Attribute definitions in declared order
    pub attributes: Vec<(String, Rc<AttributeDefinition>)>,
    pub menu: Vec<Rc<MenuAction>>,
    pub inline_menu: Vec<Rc<MenuAction>>,
    /// Asker used to edit the element's text
    pub asker: Asker,
    pub(crate) _normalized: Normalized,
}

impl ElementDefinition {
    pub fn attribute(&self, name: &str) -> Option<&Rc<AttributeDefinition>> {
        self.attributes.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    /// Position of an attribute in the declared order
    pub fn attribute_rank(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|(n, _)| n == name)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(n, _)| n.as_str())
    }

    pub fn read_only(&self, el: ElementRef<'_>) -> bool {
        self.is_read_only.as_ref().map(|f| f(el)).unwrap_or(false)
    }

    pub fn invisible(&self, el: ElementRef<'_>) -> bool {
        self.is_invisible.as_ref().map(|f| f(el)).unwrap_or(false)
    }

    /// Definition ids this element has to precede
    pub fn before(&self, el: ElementRef<'_>) -> Vec<String> {
        self.must_be_before.as_ref().map(|f| f(el)).unwrap_or_default()
    }

    /// Definition ids this element has to follow
    pub fn after(&self, el: ElementRef<'_>) -> Vec<String> {
        self.must_be_after.as_ref().map(|f| f(el)).unwrap_or_default()
    }

    pub fn has_ordering(&self) -> bool {
        self.must_be_before.is_some() || self.must_be_after.is_some()
    }
}

pub struct AttributeDefinition {
    pub asker: Asker,
    pub menu: Vec<Rc<MenuAction>>,
    pub display_name: Option<AttributeFn<String>>,
    pub display_value: Option<AttributeFn<String>>,
    pub title: Option<AttributeFn<String>>,
    pub caption: Option<AttributeFn<String>>,
    pub is_read_only: Option<AttributeFn<bool>>,
    pub is_invisible: Option<AttributeFn<bool>>,
    pub shy: Option<AttributeFn<bool>>,
    pub(crate) _normalized: Normalized,
}

impl AttributeDefinition {
    pub fn read_only(&self, at: AttributeRef<'_>) -> bool {
        self.is_read_only.as_ref().map(|f| f(at)).unwrap_or(false)
    }

    pub fn invisible(&self, at: AttributeRef<'_>) -> bool {
        self.is_invisible.as_ref().map(|f| f(at)).unwrap_or(false)
    }

    pub fn is_shy(&self, at: AttributeRef<'_>) -> bool {
        self.shy.as_ref().map(|f| f(at)).unwrap_or(false)
    }
}

pub struct MenuAction {
    pub caption: NodeFn<String>,
    pub action: EditAction,
    pub hide_if: NodeFn<bool>,
    pub expanded: NodeFn<bool>,
    /// Sub-menu; an item with a sub-menu opens it instead of acting
    pub menu: Vec<Rc<MenuAction>>,
    pub icon: Option<String>,
    pub key_caption: Option<String>,
    pub key_trigger: Option<KeyChord>,
    pub(crate) _normalized: Normalized,
}

impl MenuAction {
    pub fn is_hidden(&self, node: NodeRef<'_>) -> bool {
        (self.hide_if)(node)
    }

    pub fn has_submenu(&self) -> bool {
        !self.menu.is_empty()
    }
}

/// Result of a custom menu action
#[derive(Debug, Clone, PartialEq)]
pub enum CustomEdit {
    Nothing,
    /// Replace the element with this XML
    ReplaceWith(String),
    /// Set the value of the attribute or text node
    SetValue(String),
}

pub type CustomActionFn = Rc<dyn Fn(NodeRef<'_>, &Value) -> CustomEdit>;

/// What a menu item does when chosen
#[derive(Clone)]
pub enum EditAction {
    DeleteAttribute,
    DeleteElement,
    NewAttribute { name: String, value: String },
    NewElementChild(String),
    NewElementBefore(String),
    NewElementAfter(String),
    NewElementLayby(String),
    Wrap { template: String, placeholder: String },
    Unwrap,
    DuplicateElement,
    MoveElementUp,
    MoveElementDown,
    MergeWithPrevious,
    MergeWithNext,
    DeleteEponymousSiblings,
    EditRaw,
    Custom { action: CustomActionFn, parameter: Value },
    Noop,
}

impl EditAction {
    pub fn name(&self) -> &'static str {
        match self {
            EditAction::DeleteAttribute => "deleteAttribute",
            EditAction::DeleteElement => "deleteElement",
            EditAction::NewAttribute { .. } => "newAttribute",
            EditAction::NewElementChild(_) => "newElementChild",
            EditAction::NewElementBefore(_) => "newElementBefore",
            EditAction::NewElementAfter(_) => "newElementAfter",
            EditAction::NewElementLayby(_) => "newElementLayby",
            EditAction::Wrap { .. } => "wrap",
            EditAction::Unwrap => "unwrap",
            EditAction::DuplicateElement => "duplicateElement",
            EditAction::MoveElementUp => "moveElementUp",
            EditAction::MoveElementDown => "moveElementDown",
            EditAction::MergeWithPrevious => "mergeWithPrevious",
            EditAction::MergeWithNext => "mergeWithNext",
            EditAction::DeleteEponymousSiblings => "deleteEponymousSiblings",
            EditAction::EditRaw => "editRaw",
            EditAction::Custom { .. } => "custom",
            EditAction::Noop => "noop",
        }
    }
}

impl std::fmt::Debug for EditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickOption {
    pub value: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
}

impl PickOption {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            caption: String::new(),
            display_value: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAsker {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_url: Option<String>,
    /// Substring of `search_url` and `create_url` replaced by the typed text
    #[serde(default = "default_url_placeholder")]
    pub url_placeholder: String,
    /// Options offered ahead of the fetched ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add: Vec<PickOption>,
}

fn default_url_placeholder() -> String {
    "$".to_string()
}

pub type CustomAskerFn = Rc<dyn Fn(&str) -> Vec<PickOption>>;

/// How a value gets asked for in the editor bubble
#[derive(Clone)]
pub enum Asker {
    String,
    LongString,
    Picklist(Vec<PickOption>),
    /// Picklist that also accepts free text
    OpenPicklist(Vec<PickOption>),
    Remote(RemoteAsker),
    Custom(CustomAskerFn),
}

impl std::fmt::Debug for Asker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Asker::String => f.write_str("String"),
            Asker::LongString => f.write_str("LongString"),
            Asker::Picklist(o) => f.debug_tuple("Picklist").field(o).finish(),
            Asker::OpenPicklist(o) => f.debug_tuple("OpenPicklist").field(o).finish(),
            Asker::Remote(r) => f.debug_tuple("Remote").field(r).finish(),
            Asker::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Key combination that triggers a menu action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyChord {
    pub key: String,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
}

impl KeyChord {
    pub fn matches(&self, key: &str, ctrl: bool, shift: bool, alt: bool) -> bool {
        self.key.eq_ignore_ascii_case(key) && self.ctrl == ctrl && self.shift == shift && self.alt == alt
    }
}
