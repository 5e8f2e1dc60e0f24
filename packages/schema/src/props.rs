//! Schema properties that are either plain values or functions of a node.

use serde_json::Value;
use std::rc::Rc;
use xedit_model::{AttributeRef, ElementRef, NodeRef};

pub type ElementFn<T> = Rc<dyn Fn(ElementRef<'_>) -> T>;
pub type AttributeFn<T> = Rc<dyn Fn(AttributeRef<'_>) -> T>;
pub type NodeFn<T> = Rc<dyn Fn(NodeRef<'_>) -> T>;

/// A partial-schema property as the embedder wrote it: a JSON scalar, or a
/// function computing the value per node.
#[derive(Clone)]
pub enum Prop<F> {
    Value(Value),
    Func(F),
}

impl<F> Prop<F> {
    pub fn value(value: impl Into<Value>) -> Self {
        Prop::Value(value.into())
    }
}

impl<T> Prop<ElementFn<T>> {
    pub fn on_element(f: impl Fn(ElementRef<'_>) -> T + 'static) -> Self {
        Prop::Func(Rc::new(f))
    }
}

impl<T> Prop<AttributeFn<T>> {
    pub fn on_attribute(f: impl Fn(AttributeRef<'_>) -> T + 'static) -> Self {
        Prop::Func(Rc::new(f))
    }
}

impl<T> Prop<NodeFn<T>> {
    pub fn on_node(f: impl Fn(NodeRef<'_>) -> T + 'static) -> Self {
        Prop::Func(Rc::new(f))
    }
}

pub fn element_const<T: Clone + 'static>(value: T) -> ElementFn<T> {
    Rc::new(move |_: ElementRef<'_>| value.clone())
}

pub fn attribute_const<T: Clone + 'static>(value: T) -> AttributeFn<T> {
    Rc::new(move |_: AttributeRef<'_>| value.clone())
}

pub fn node_const<T: Clone + 'static>(value: T) -> NodeFn<T> {
    Rc::new(move |_: NodeRef<'_>| value.clone())
}

/// Reads a JSON scalar as the property's value type
pub(crate) trait Coerce: Sized + Clone + 'static {
    fn coerce(value: &Value) -> Option<Self>;
}

impl Coerce for bool {
    fn coerce(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl Coerce for String {
    fn coerce(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl Coerce for Vec<String> {
    fn coerce(value: &Value) -> Option<Self> {
        let items = value.as_array()?;
        Some(
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        )
    }
}

/// Lift a property to a function of the node.
///
/// A function is used as is; a value of the right type becomes a constant
/// function; anything else (missing or mistyped) yields `None`.
pub(crate) fn lift<F: Clone, T: Coerce>(prop: Option<&Prop<F>>, constant: fn(T) -> F) -> Option<F> {
    match prop? {
        Prop::Func(f) => Some(f.clone()),
        Prop::Value(v) => T::coerce(v).map(constant),
    }
}

pub(crate) fn lift_or<F: Clone, T: Coerce>(prop: Option<&Prop<F>>, constant: fn(T) -> F, default: T) -> F {
    lift(prop, constant).unwrap_or_else(|| constant(default))
}
