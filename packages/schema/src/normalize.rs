//! # Schema Normalizer
//!
//! Turns a partial [`DocSpec`] into a complete, immutable [`Schema`].
//!
//! Normalization is pure: the caller's spec objects are never touched.
//! Partial specs are memoized by identity, so an `Rc<ElementSpec>` shared by
//! several definition ids is normalized once and the ids share the result.
//! Mistyped fields degrade to their defaults; nothing here can fail.

use crate::definition::{
    Asker, AttributeDefinition, EditAction, ElementDefinition, MenuAction, Normalized, PickOption, RemoteAsker,
};
use crate::props::{attribute_const, element_const, lift, lift_or, node_const, ElementFn};
use crate::spec::{
    ActionSpec, AskerSpec, AttributeSource, AttributeSpec, ChangeFn, DocSpec, ElementSource, ElementSpec, MenuItemSpec,
    MenuSource, Mode, ModeSwitchFn, ResolveFn, Source, UnknownAttribute, UnknownElement, ValidateFn,
};
use crate::warnings::Warnings;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;
use xedit_model::{ElementRef, NodeId, ResolveElementId};

/// Memo of partial specs already normalized, keyed by allocation
#[derive(Default)]
pub struct Normalizer {
    elements: HashMap<*const ElementSpec, (Rc<ElementSpec>, Rc<ElementDefinition>)>,
    attributes: HashMap<*const AttributeSpec, (Rc<AttributeSpec>, Rc<AttributeDefinition>)>,
    menu_items: HashMap<*const MenuItemSpec, (Rc<MenuItemSpec>, Rc<MenuAction>)>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(&mut self, source: &ElementSource) -> Rc<ElementDefinition> {
        let spec = match source {
            Source::Normalized(def) => return def.clone(),
            Source::Partial(spec) => spec,
        };
        if let Some((_, def)) = self.elements.get(&Rc::as_ptr(spec)) {
            return def.clone();
        }
        let def = Rc::new(self.build_element(spec));
        self.elements.insert(Rc::as_ptr(spec), (spec.clone(), def.clone()));
        def
    }

    pub fn attribute(&mut self, source: &AttributeSource) -> Rc<AttributeDefinition> {
        let spec = match source {
            Source::Normalized(def) => return def.clone(),
            Source::Partial(spec) => spec,
        };
        if let Some((_, def)) = self.attributes.get(&Rc::as_ptr(spec)) {
            return def.clone();
        }
        let def = Rc::new(self.build_attribute(spec));
        self.attributes.insert(Rc::as_ptr(spec), (spec.clone(), def.clone()));
        def
    }

    pub fn menu_item(&mut self, source: &MenuSource) -> Rc<MenuAction> {
        let spec = match source {
            Source::Normalized(action) => return action.clone(),
            Source::Partial(spec) => spec,
        };
        if let Some((_, action)) = self.menu_items.get(&Rc::as_ptr(spec)) {
            return action.clone();
        }
        let action = Rc::new(self.build_menu_item(spec));
        self.menu_items.insert(Rc::as_ptr(spec), (spec.clone(), action.clone()));
        action
    }

    pub fn menu(&mut self, items: &[MenuSource]) -> Vec<Rc<MenuAction>> {
        items.iter().map(|item| self.menu_item(item)).collect()
    }

    fn build_element(&mut self, spec: &ElementSpec) -> ElementDefinition {
        let raw_tag_name: ElementFn<String> = Rc::new(|el: ElementRef<'_>| el.element_name().to_string());

        ElementDefinition {
            element_name: lift(spec.element_name.as_ref(), element_const).unwrap_or(raw_tag_name),
            display_name: lift(spec.display_name.as_ref(), element_const),
            title: lift(spec.title.as_ref(), element_const),
            caption: lift(spec.caption.as_ref(), element_const),
            display_value: lift(spec.display_value.as_ref(), element_const),
            collapsoid: lift(spec.collapsoid.as_ref(), element_const),
            background_colour: lift_or(spec.background_colour.as_ref(), element_const, String::new()),
            has_text: lift_or(spec.has_text.as_ref(), element_const, false),
            oneliner: lift_or(spec.oneliner.as_ref(), element_const, false),
            collapsible: lift_or(spec.collapsible.as_ref(), element_const, true),
            collapsed: lift_or(spec.collapsed.as_ref(), element_const, false),
            local_drop_only: lift_or(spec.local_drop_only.as_ref(), element_const, false),
            is_read_only: lift(spec.is_read_only.as_ref(), element_const),
            is_invisible: lift(spec.is_invisible.as_ref(), element_const),
            must_be_before: lift(spec.must_be_before.as_ref(), element_const),
            must_be_after: lift(spec.must_be_after.as_ref(), element_const),
            can_drop_to: lift_or(spec.can_drop_to.as_ref(), element_const, Vec::new()),
            attributes: spec
                .attributes
                .iter()
                .map(|(name, source)| (name.clone(), self.attribute(source)))
                .collect(),
            menu: self.menu(&spec.menu),
            inline_menu: self.menu(&spec.inline_menu),
            asker: normalize_asker(spec.asker.as_ref(), spec.asker_parameter.as_ref(), Asker::LongString),
            _normalized: Normalized,
        }
    }

    fn build_attribute(&mut self, spec: &AttributeSpec) -> AttributeDefinition {
        AttributeDefinition {
            asker: normalize_asker(spec.asker.as_ref(), spec.asker_parameter.as_ref(), Asker::String),
            menu: self.menu(&spec.menu),
            display_name: lift(spec.display_name.as_ref(), attribute_const),
            display_value: lift(spec.display_value.as_ref(), attribute_const),
            title: lift(spec.title.as_ref(), attribute_const),
            caption: lift(spec.caption.as_ref(), attribute_const),
            is_read_only: lift(spec.is_read_only.as_ref(), attribute_const),
            is_invisible: lift(spec.is_invisible.as_ref(), attribute_const),
            shy: lift(spec.shy.as_ref(), attribute_const),
            _normalized: Normalized,
        }
    }

    fn build_menu_item(&mut self, spec: &MenuItemSpec) -> MenuAction {
        MenuAction {
            caption: lift_or(spec.caption.as_ref(), node_const, "?".to_string()),
            action: normalize_action(spec.action.as_ref(), spec.action_parameter.as_ref()),
            hide_if: lift_or(spec.hide_if.as_ref(), node_const, false),
            expanded: lift_or(spec.expanded.as_ref(), node_const, false),
            menu: self.menu(&spec.menu),
            icon: spec.icon.clone(),
            key_caption: spec.key_caption.clone(),
            key_trigger: spec.key_trigger.clone(),
            _normalized: Normalized,
        }
    }
}

/// Resolve a menu item's action name and parameter to an [`EditAction`].
///
/// Unknown names and parameters of the wrong shape give [`EditAction::Noop`].
pub fn normalize_action(action: Option<&ActionSpec>, parameter: Option<&Value>) -> EditAction {
    let name = match action {
        None => return EditAction::Noop,
        Some(ActionSpec::Custom(f)) => {
            return EditAction::Custom {
                action: f.clone(),
                parameter: parameter.cloned().unwrap_or(Value::Null),
            }
        }
        Some(ActionSpec::Named(name)) => name.as_str(),
    };

    let xml = || parameter.and_then(Value::as_str).map(str::to_string);
    let field = |key: &str| parameter.and_then(|p| p.get(key)).and_then(Value::as_str).map(str::to_string);

    let action = match name {
        "deleteAttribute" => Some(EditAction::DeleteAttribute),
        "deleteElement" => Some(EditAction::DeleteElement),
        "newAttribute" => field("name").map(|name| EditAction::NewAttribute {
            name,
            value: field("value").unwrap_or_default(),
        }),
        "newElementChild" => xml().map(EditAction::NewElementChild),
        "newElementBefore" => xml().map(EditAction::NewElementBefore),
        "newElementAfter" => xml().map(EditAction::NewElementAfter),
        "newElementLayby" => xml().map(EditAction::NewElementLayby),
        "wrap" => match (field("template"), field("placeholder")) {
            (Some(template), Some(placeholder)) => Some(EditAction::Wrap { template, placeholder }),
            _ => None,
        },
        "unwrap" => Some(EditAction::Unwrap),
        "duplicateElement" => Some(EditAction::DuplicateElement),
        "moveElementUp" => Some(EditAction::MoveElementUp),
        "moveElementDown" => Some(EditAction::MoveElementDown),
        "mergeWithPrevious" => Some(EditAction::MergeWithPrevious),
        "mergeWithNext" => Some(EditAction::MergeWithNext),
        "deleteEponymousSiblings" => Some(EditAction::DeleteEponymousSiblings),
        "editRaw" => Some(EditAction::EditRaw),
        _ => None,
    };

    action.unwrap_or_else(|| {
        debug!(action = name, "Unusable menu action, treating as no-op");
        EditAction::Noop
    })
}

pub fn normalize_asker(asker: Option<&AskerSpec>, parameter: Option<&Value>, default: Asker) -> Asker {
    let name = match asker {
        None => return default,
        Some(AskerSpec::Custom(f)) => return Asker::Custom(f.clone()),
        Some(AskerSpec::Named(name)) => name.as_str(),
    };
    match name {
        "string" => Asker::String,
        "longString" => Asker::LongString,
        "picklist" => Asker::Picklist(pick_options(parameter)),
        "openPicklist" => Asker::OpenPicklist(pick_options(parameter)),
        "remote" => match parameter.and_then(|p| serde_json::from_value::<RemoteAsker>(p.clone()).ok()) {
            Some(remote) => Asker::Remote(remote),
            None => default,
        },
        _ => {
            debug!(asker = name, "Unknown asker, using default");
            default
        }
    }
}

fn pick_options(parameter: Option<&Value>) -> Vec<PickOption> {
    let Some(items) = parameter.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(PickOption::new(s.clone())),
            Value::Object(_) => serde_json::from_value(item.clone()).ok(),
            _ => None,
        })
        .collect()
}

/// The normalized schema
pub struct Schema {
    elements: HashMap<String, Rc<ElementDefinition>>,
    unknown_element: Option<UnknownElement>,
    unknown_attribute: Option<UnknownAttribute>,
    fallback_elements: RefCell<HashMap<String, Rc<ElementDefinition>>>,
    fallback_attributes: RefCell<HashMap<(String, String), Rc<AttributeDefinition>>>,
    resolve_element_id: Option<ResolveFn>,
    on_change: Option<ChangeFn>,
    validate: Option<ValidateFn>,
    on_mode_switch: Option<ModeSwitchFn>,
    pub allow_layby: bool,
    pub allow_mode_switching: bool,
    pub layby_message: String,
}

impl Schema {
    pub fn new(spec: &DocSpec) -> Self {
        let mut normalizer = Normalizer::new();
        let elements = spec
            .elements
            .iter()
            .map(|(id, source)| (id.clone(), normalizer.element(source)))
            .collect();

        Self {
            elements,
            unknown_element: spec.unknown_element.clone(),
            unknown_attribute: spec.unknown_attribute.clone(),
            fallback_elements: RefCell::new(HashMap::new()),
            fallback_attributes: RefCell::new(HashMap::new()),
            resolve_element_id: spec.resolve_element_id.clone(),
            on_change: spec.on_change.clone(),
            validate: spec.validate.clone(),
            on_mode_switch: spec.on_mode_switch.clone(),
            allow_layby: spec.allow_layby.as_ref().and_then(Value::as_bool).unwrap_or(false),
            allow_mode_switching: spec.allow_mode_switching.as_ref().and_then(Value::as_bool).unwrap_or(false),
            layby_message: spec
                .layby_message
                .as_ref()
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
        }
    }

    pub fn from_json(value: &Value) -> Self {
        Self::new(&DocSpec::from_json(value))
    }

    /// Whether the definition id is declared (rather than resolved through
    /// the unknown-element fallback)
    pub fn is_declared(&self, definition_id: &str) -> bool {
        self.elements.contains_key(definition_id)
    }

    /// Definition for an element, falling back to `unknownElement`
    pub fn element(&self, definition_id: &str) -> Rc<ElementDefinition> {
        if let Some(def) = self.elements.get(definition_id) {
            return def.clone();
        }
        if let Some(def) = self.fallback_elements.borrow().get(definition_id) {
            return def.clone();
        }

        let spec = match &self.unknown_element {
            Some(UnknownElement::Static(spec)) => spec.clone(),
            Some(UnknownElement::Factory(factory)) => Rc::new(factory(definition_id)),
            None => Rc::new(ElementSpec::default()),
        };
        let def = Normalizer::new().element(&Source::Partial(spec));
        self.fallback_elements
            .borrow_mut()
            .insert(definition_id.to_string(), def.clone());
        def
    }

    /// Definition for an attribute, falling back to `unknownAttribute`
    pub fn attribute(&self, element_id: &str, name: &str) -> Rc<AttributeDefinition> {
        if let Some(def) = self.element(element_id).attribute(name) {
            return def.clone();
        }
        let key = (element_id.to_string(), name.to_string());
        if let Some(def) = self.fallback_attributes.borrow().get(&key) {
            return def.clone();
        }

        let spec = match &self.unknown_attribute {
            Some(UnknownAttribute::Static(spec)) => spec.clone(),
            Some(UnknownAttribute::Factory(factory)) => Rc::new(factory(element_id, name)),
            None => Rc::new(AttributeSpec::default()),
        };
        let def = Normalizer::new().attribute(&Source::Partial(spec));
        self.fallback_attributes.borrow_mut().insert(key, def.clone());
        def
    }

    /// Run the embedder's validation over the document
    pub fn validate(&self, root: ElementRef<'_>) -> Warnings {
        let mut warnings = Warnings::new();
        if let Some(validate) = &self.validate {
            validate(root, &mut warnings);
        }
        warnings
    }

    pub fn notify_change(&self, node: Option<NodeId>) {
        if let Some(on_change) = &self.on_change {
            on_change(node);
        }
    }

    pub fn notify_mode_switch(&self, mode: Mode) {
        if let Some(on_mode_switch) = &self.on_mode_switch {
            on_mode_switch(mode);
        }
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new(&DocSpec::default())
    }
}

impl ResolveElementId for Schema {
    fn resolve(&self, tag_name: &str, parent_definition_id: Option<&str>) -> String {
        match &self.resolve_element_id {
            Some(resolve) => resolve(tag_name, parent_definition_id),
            None => tag_name.to_string(),
        }
    }
}
