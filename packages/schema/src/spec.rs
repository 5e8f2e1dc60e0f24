//! # Partial Schema (docSpec)
//!
//! What the embedder hands in. Every field is optional, properties may be
//! plain JSON values or functions, and nothing here is validated: the
//! normalizer coerces whatever it finds.

use crate::definition::{AttributeDefinition, CustomActionFn, CustomAskerFn, ElementDefinition, KeyChord, MenuAction};
use crate::props::{AttributeFn, ElementFn, NodeFn, Prop};
use crate::warnings::Warnings;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::rc::Rc;
use xedit_model::{ElementRef, NodeId};

/// A schema entry that is either still partial or already normalized.
///
/// Normalizing a `Normalized` source hands back the same definition.
pub enum Source<S, N> {
    Partial(Rc<S>),
    Normalized(Rc<N>),
}

impl<S, N> Clone for Source<S, N> {
    fn clone(&self) -> Self {
        match self {
            Source::Partial(s) => Source::Partial(s.clone()),
            Source::Normalized(n) => Source::Normalized(n.clone()),
        }
    }
}

impl<S, N> From<S> for Source<S, N> {
    fn from(spec: S) -> Self {
        Source::Partial(Rc::new(spec))
    }
}

pub type ElementSource = Source<ElementSpec, ElementDefinition>;
pub type AttributeSource = Source<AttributeSpec, AttributeDefinition>;
pub type MenuSource = Source<MenuItemSpec, MenuAction>;

/// Display mode of the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Raw XML chrome: tag names, closing tags, attributes
    #[default]
    Nerd,
    /// Simplified presentation for non-technical users
    Laic,
}

pub type ResolveFn = Rc<dyn Fn(&str, Option<&str>) -> String>;
pub type ChangeFn = Rc<dyn Fn(Option<NodeId>)>;
pub type ValidateFn = Rc<dyn Fn(ElementRef<'_>, &mut Warnings)>;
pub type ModeSwitchFn = Rc<dyn Fn(Mode)>;

#[derive(Clone)]
pub enum UnknownElement {
    Static(Rc<ElementSpec>),
    /// Called with the definition id
    Factory(Rc<dyn Fn(&str) -> ElementSpec>),
}

#[derive(Clone)]
pub enum UnknownAttribute {
    Static(Rc<AttributeSpec>),
    /// Called with the element's definition id and the attribute name
    Factory(Rc<dyn Fn(&str, &str) -> AttributeSpec>),
}

#[derive(Clone, Default)]
pub struct DocSpec {
    pub elements: Vec<(String, ElementSource)>,
    pub unknown_element: Option<UnknownElement>,
    pub unknown_attribute: Option<UnknownAttribute>,
    pub resolve_element_id: Option<ResolveFn>,
    pub on_change: Option<ChangeFn>,
    pub validate: Option<ValidateFn>,
    pub on_mode_switch: Option<ModeSwitchFn>,
    pub allow_layby: Option<Value>,
    pub allow_mode_switching: Option<Value>,
    pub layby_message: Option<Value>,
}

impl DocSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(mut self, id: impl Into<String>, spec: impl Into<ElementSource>) -> Self {
        self.elements.push((id.into(), spec.into()));
        self
    }
}

#[derive(Clone, Default)]
pub struct ElementSpec {
    pub element_name: Option<Prop<ElementFn<String>>>,
    pub display_name: Option<Prop<ElementFn<String>>>,
    pub title: Option<Prop<ElementFn<String>>>,
    pub caption: Option<Prop<ElementFn<String>>>,
    pub display_value: Option<Prop<ElementFn<String>>>,
    pub collapsoid: Option<Prop<ElementFn<String>>>,
    pub background_colour: Option<Prop<ElementFn<String>>>,
    pub has_text: Option<Prop<ElementFn<bool>>>,
    pub oneliner: Option<Prop<ElementFn<bool>>>,
    pub collapsible: Option<Prop<ElementFn<bool>>>,
    pub collapsed: Option<Prop<ElementFn<bool>>>,
    pub local_drop_only: Option<Prop<ElementFn<bool>>>,
    pub is_read_only: Option<Prop<ElementFn<bool>>>,
    pub is_invisible: Option<Prop<ElementFn<bool>>>,
    pub must_be_before: Option<Prop<ElementFn<Vec<String>>>>,
    pub must_be_after: Option<Prop<ElementFn<Vec<String>>>>,
    pub can_drop_to: Option<Prop<ElementFn<Vec<String>>>>,
    pub attributes: Vec<(String, AttributeSource)>,
    pub menu: Vec<MenuSource>,
    pub inline_menu: Vec<MenuSource>,
    pub asker: Option<AskerSpec>,
    pub asker_parameter: Option<Value>,
}

impl ElementSpec {
    pub fn attribute(mut self, name: impl Into<String>, spec: impl Into<AttributeSource>) -> Self {
        self.attributes.push((name.into(), spec.into()));
        self
    }

    /// Read a partial element spec from JSON.
    ///
    /// Never fails: unknown keys are ignored and mistyped values are left for
    /// the normalizer to coerce.
    pub fn from_json(value: &Value) -> Self {
        let empty = Map::new();
        let obj = value.as_object().unwrap_or(&empty);

        Self {
            element_name: prop(obj, "elementName"),
            display_name: prop(obj, "displayName"),
            title: prop(obj, "title"),
            caption: prop(obj, "caption"),
            display_value: prop(obj, "displayValue"),
            collapsoid: prop(obj, "collapsoid"),
            background_colour: prop(obj, "backgroundColour"),
            has_text: prop(obj, "hasText"),
            oneliner: prop(obj, "oneliner"),
            collapsible: prop(obj, "collapsible"),
            collapsed: prop(obj, "collapsed"),
            local_drop_only: prop(obj, "localDropOnly"),
            is_read_only: prop(obj, "isReadOnly"),
            is_invisible: prop(obj, "isInvisible"),
            must_be_before: prop(obj, "mustBeBefore"),
            must_be_after: prop(obj, "mustBeAfter"),
            can_drop_to: prop(obj, "canDropTo"),
            attributes: obj
                .get("attributes")
                .and_then(Value::as_object)
                .map(|attrs| {
                    attrs
                        .iter()
                        .map(|(name, spec)| (name.clone(), AttributeSpec::from_json(spec).into()))
                        .collect()
                })
                .unwrap_or_default(),
            menu: menu_from_json(obj.get("menu")),
            inline_menu: menu_from_json(obj.get("inlineMenu")),
            asker: obj.get("asker").and_then(Value::as_str).map(|s| AskerSpec::Named(s.to_string())),
            asker_parameter: obj.get("askerParameter").cloned(),
        }
    }
}

#[derive(Clone, Default)]
pub struct AttributeSpec {
    pub asker: Option<AskerSpec>,
    pub asker_parameter: Option<Value>,
    pub menu: Vec<MenuSource>,
    pub display_name: Option<Prop<AttributeFn<String>>>,
    pub display_value: Option<Prop<AttributeFn<String>>>,
    pub title: Option<Prop<AttributeFn<String>>>,
    pub caption: Option<Prop<AttributeFn<String>>>,
    pub is_read_only: Option<Prop<AttributeFn<bool>>>,
    pub is_invisible: Option<Prop<AttributeFn<bool>>>,
    pub shy: Option<Prop<AttributeFn<bool>>>,
}

impl AttributeSpec {
    pub fn from_json(value: &Value) -> Self {
        let empty = Map::new();
        let obj = value.as_object().unwrap_or(&empty);

        Self {
            asker: obj.get("asker").and_then(Value::as_str).map(|s| AskerSpec::Named(s.to_string())),
            asker_parameter: obj.get("askerParameter").cloned(),
            menu: menu_from_json(obj.get("menu")),
            display_name: prop(obj, "displayName"),
            display_value: prop(obj, "displayValue"),
            title: prop(obj, "title"),
            caption: prop(obj, "caption"),
            is_read_only: prop(obj, "isReadOnly"),
            is_invisible: prop(obj, "isInvisible"),
            shy: prop(obj, "shy"),
        }
    }
}

#[derive(Clone)]
pub enum ActionSpec {
    /// One of the built-in actions, by name (`"deleteElement"`, ...)
    Named(String),
    Custom(CustomActionFn),
}

#[derive(Clone)]
pub enum AskerSpec {
    /// One of the built-in askers, by name (`"string"`, `"picklist"`, ...)
    Named(String),
    Custom(CustomAskerFn),
}

#[derive(Clone, Default)]
pub struct MenuItemSpec {
    pub caption: Option<Prop<NodeFn<String>>>,
    pub action: Option<ActionSpec>,
    pub action_parameter: Option<Value>,
    pub hide_if: Option<Prop<NodeFn<bool>>>,
    pub expanded: Option<Prop<NodeFn<bool>>>,
    pub menu: Vec<MenuSource>,
    pub icon: Option<String>,
    pub key_caption: Option<String>,
    pub key_trigger: Option<KeyChord>,
}

impl MenuItemSpec {
    pub fn action(caption: &str, action: &str) -> Self {
        Self {
            caption: Some(Prop::value(caption)),
            action: Some(ActionSpec::Named(action.to_string())),
            ..Self::default()
        }
    }

    pub fn with_parameter(mut self, parameter: Value) -> Self {
        self.action_parameter = Some(parameter);
        self
    }

    pub fn from_json(value: &Value) -> Self {
        let empty = Map::new();
        let obj = value.as_object().unwrap_or(&empty);

        Self {
            caption: prop(obj, "caption"),
            action: obj.get("action").and_then(Value::as_str).map(|s| ActionSpec::Named(s.to_string())),
            action_parameter: obj.get("actionParameter").cloned(),
            hide_if: prop(obj, "hideIf"),
            expanded: prop(obj, "expanded"),
            menu: menu_from_json(obj.get("menu")),
            icon: obj.get("icon").and_then(Value::as_str).map(str::to_string),
            key_caption: obj.get("keyCaption").and_then(Value::as_str).map(str::to_string),
            key_trigger: obj
                .get("keyTrigger")
                .and_then(|v| serde_json::from_value(v.clone()).ok()),
        }
    }
}

fn prop<F>(obj: &Map<String, Value>, key: &str) -> Option<Prop<F>> {
    obj.get(key).cloned().map(Prop::Value)
}

fn menu_from_json(value: Option<&Value>) -> Vec<MenuSource> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().map(|i| MenuItemSpec::from_json(i).into()).collect())
        .unwrap_or_default()
}

impl DocSpec {
    /// Read the data part of a docSpec from JSON.
    ///
    /// Callbacks (validation, change notification, identity resolution)
    /// cannot be expressed in JSON and keep their defaults.
    pub fn from_json(value: &Value) -> Self {
        let empty = Map::new();
        let obj = value.as_object().unwrap_or(&empty);

        Self {
            elements: obj
                .get("elements")
                .and_then(Value::as_object)
                .map(|els| {
                    els.iter()
                        .map(|(id, spec)| (id.clone(), ElementSpec::from_json(spec).into()))
                        .collect()
                })
                .unwrap_or_default(),
            unknown_element: obj
                .get("unknownElement")
                .filter(|v| v.is_object())
                .map(|v| UnknownElement::Static(Rc::new(ElementSpec::from_json(v)))),
            unknown_attribute: obj
                .get("unknownAttribute")
                .filter(|v| v.is_object())
                .map(|v| UnknownAttribute::Static(Rc::new(AttributeSpec::from_json(v)))),
            allow_layby: obj.get("allowLayby").cloned(),
            allow_mode_switching: obj.get("allowModeSwitching").cloned(),
            layby_message: obj.get("laybyMessage").cloned(),
            ..Self::default()
        }
    }
}
