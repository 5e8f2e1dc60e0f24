//! Arbitrary JSON docSpecs normalize without failing

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use std::rc::Rc;
use xedit_model::parse_document;
use xedit_schema::Schema;

const ELEMENT_KEYS: &[&str] = &[
    "hasText",
    "oneliner",
    "collapsible",
    "collapsed",
    "localDropOnly",
    "canDropTo",
    "mustBeBefore",
    "mustBeAfter",
    "backgroundColour",
    "displayName",
    "caption",
    "isReadOnly",
    "isInvisible",
    "menu",
    "inlineMenu",
    "asker",
    "attributes",
];

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        "[a-z ]{0,8}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

fn element_spec() -> impl Strategy<Value = Value> {
    prop::collection::vec((prop::sample::select(ELEMENT_KEYS), json_value()), 0..6).prop_map(|fields| {
        Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<Map<_, _>>(),
        )
    })
}

proptest! {
    #[test]
    fn test_any_element_spec_normalizes(entry in element_spec(), layby in json_value()) {
        let schema = Schema::from_json(&json!({
            "elements": { "entry": entry },
            "allowLayby": layby,
        }));
        let doc = parse_document("<entry lang='en'><sense/>text</entry>", &schema).unwrap();
        let root = doc.root();

        let def = schema.element("entry");
        prop_assert!(Rc::ptr_eq(&def, &schema.element("entry")));
        let _ = (def.has_text)(root);
        let _ = (def.collapsible)(root);
        let _ = (def.can_drop_to)(root);
        let _ = def.before(root);
        let _ = def.after(root);
        let _ = def.read_only(root);
        let _ = def.invisible(root);
        let _ = schema.attribute("entry", "lang");
        prop_assert!(schema.validate(root).is_empty());
    }
}
