//! # Xedit Schema
//!
//! The docSpec: what each element and attribute of a document may do.
//!
//! Embedders describe capabilities with a partial [`DocSpec`] (from Rust or
//! JSON); [`Schema::new`] normalizes it into a complete graph of
//! [`ElementDefinition`]s whose predicates are all functions of a node.
//!
//! ```rust,ignore
//! use xedit_schema::{DocSpec, ElementSpec, Prop, Schema};
//!
//! let spec = DocSpec::new().element("p", ElementSpec {
//!     has_text: Some(Prop::value(true)),
//!     must_be_before: Some(Prop::value(vec!["note"])),
//!     ..Default::default()
//! });
//! let schema = Schema::new(&spec);
//! ```

mod definition;
mod lang;
mod normalize;
mod props;
mod spec;
mod warnings;

pub use definition::{
    Asker, AttributeDefinition, CustomActionFn, CustomAskerFn, CustomEdit, EditAction, ElementDefinition, KeyChord,
    MenuAction, PickOption, RemoteAsker,
};
pub use lang::text_by_lang;
pub use normalize::{normalize_action, normalize_asker, Normalizer, Schema};
pub use props::{attribute_const, element_const, node_const, AttributeFn, ElementFn, NodeFn, Prop};
pub use spec::{
    ActionSpec, AskerSpec, AttributeSource, AttributeSpec, ChangeFn, DocSpec, ElementSource, ElementSpec,
    MenuItemSpec, MenuSource, Mode, ModeSwitchFn, ResolveFn, Source, UnknownAttribute, UnknownElement, ValidateFn,
};
pub use warnings::{Warning, Warnings};
