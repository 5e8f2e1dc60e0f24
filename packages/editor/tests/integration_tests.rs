//! Integration tests for the editor crate

use proptest::prelude::*;
use serde_json::json;
use xedit_editor::focus::units;
use xedit_editor::render::render_document;
use xedit_editor::{
    EditorConfig, EditorSession, Focus, Gap, HarvestCache, Key, KeyEvent, Outcome, StaticSource, TextSelection,
};
use xedit_model::{parse_document, NodeId, ResolveByTagName};
use xedit_schema::{AskerSpec, AttributeSpec, DocSpec, ElementSpec, Mode, PickOption, Prop, Schema};

fn open(xml: &str, spec: DocSpec) -> EditorSession {
    EditorSession::from_xml(xml, Schema::new(&spec), EditorConfig::default()).unwrap()
}

fn child(session: &EditorSession, path: &[usize]) -> NodeId {
    let mut id = session.view().root_id();
    for &i in path {
        id = session.view().tree().children(id)[i];
    }
    id
}

fn with_text(spec: DocSpec, name: &str) -> DocSpec {
    spec.element(
        name,
        ElementSpec {
            has_text: Some(Prop::value(true)),
            ..Default::default()
        },
    )
}

fn droppable(spec: DocSpec, name: &str, parents: &[&str]) -> DocSpec {
    spec.element(
        name,
        ElementSpec {
            can_drop_to: Some(Prop::value(json!(parents))),
            ..Default::default()
        },
    )
}

fn no_adjacent_texts(session: &EditorSession) -> bool {
    let tree = session.view().tree();
    let mut stack = vec![session.view().root_id()];
    while let Some(id) = stack.pop() {
        let children = tree.children(id);
        if children.windows(2).any(|w| tree.is_text(w[0]) && tree.is_text(w[1])) {
            return false;
        }
        stack.extend(children.iter().copied().filter(|c| tree.is_element(*c)));
    }
    true
}

#[test]
fn test_merge_discards_text_without_text_capability() {
    let mut session = open("<a><b>x</b><b>y</b></a>", DocSpec::new());
    let live = child(&session, &[0]);
    let dead = child(&session, &[1]);

    let outcome = session.merge_with_previous(dead);
    assert_eq!(outcome, Outcome::Applied { focus: Some(Focus::OpeningTag(live)) });
    assert_eq!(session.to_xml(), "<a><b xml:space='preserve'>x</b></a>");
}

#[test]
fn test_merge_concatenates_text_with_text_capability() {
    let mut session = open("<a><b>x</b><b>y</b></a>", with_text(DocSpec::new(), "b"));
    let dead = child(&session, &[1]);

    assert!(session.merge_with_previous(dead).is_applied());
    assert_eq!(session.to_xml(), "<a><b xml:space='preserve'>x y</b></a>");
    assert!(no_adjacent_texts(&session));
}

#[test]
fn test_merge_with_next_keeps_following_element() {
    let mut session = open("<a><b n='1'/><b n='2'/></a>", DocSpec::new());
    let dead = child(&session, &[0]);
    let live = child(&session, &[1]);

    assert!(session.merge_with_next(dead).is_applied());
    assert_eq!(session.to_xml(), "<a><b n='2'/></a>");
    assert_eq!(child(&session, &[0]), live);
}

#[test]
fn test_merge_suppresses_duplicate_children() {
    let mut session = open("<a><b><c/><d k='1'/></b><b><c/><d k='2'/></b></a>", DocSpec::new());
    let dead = child(&session, &[1]);

    assert!(session.merge_with_previous(dead).is_applied());
    assert_eq!(session.to_xml(), "<a><b><c/><d k='1'/><d k='2'/></b></a>");
}

#[test]
fn test_new_attribute_lands_in_declared_order() {
    let spec = DocSpec::new().element(
        "a",
        ElementSpec::default()
            .attribute("id", AttributeSpec::default())
            .attribute("lang", AttributeSpec::default())
            .attribute("type", AttributeSpec::default()),
    );
    let mut session = open("<a type='t'/>", spec);
    let root = session.view().root_id();

    assert!(session.new_attribute(root, "id", "1").is_applied());
    assert_eq!(session.to_xml(), "<a id='1' type='t'/>");
    assert!(session.new_attribute(root, "lang", "en").is_applied());
    assert_eq!(session.to_xml(), "<a id='1' lang='en' type='t'/>");
}

#[test]
fn test_wrap_then_unwrap_restores_text() {
    let spec = with_text(with_text(DocSpec::new(), "p"), "b");
    let mut session = open("<p>one two three</p>", spec);
    let text = child(&session, &[0]);

    let Outcome::Applied {
        focus: Some(Focus::OpeningTag(wrapper)),
    } = session.wrap(TextSelection::within(text, 4, 6), "<b>$</b>", "$")
    else {
        panic!("wrap declined");
    };
    assert_eq!(session.view().tree().element(wrapper).unwrap().get_text(), "two");

    assert!(session.unwrap(wrapper).is_applied());
    assert_eq!(session.to_xml(), "<p xml:space='preserve'>one two three</p>");
    assert_eq!(session.view().tree().children(session.view().root_id()).len(), 1);
}

#[test]
fn test_unwrap_coalesces_texts() {
    let spec = with_text(with_text(DocSpec::new(), "p"), "i");
    let mut session = open("<p>a<i>b</i>c</p>", spec);
    let i = child(&session, &[1]);

    assert!(session.unwrap(i).is_applied());
    assert!(no_adjacent_texts(&session));
    assert_eq!(session.to_xml(), "<p xml:space='preserve'>abc</p>");
}

#[test]
fn test_inline_menu_wraps_selection() {
    let mut wrap = xedit_schema::MenuItemSpec::action("Italic", "wrap");
    wrap.action_parameter = Some(json!({ "template": "<i>$</i>", "placeholder": "$" }));
    let spec = with_text(DocSpec::new(), "i").element(
        "p",
        ElementSpec {
            has_text: Some(Prop::value(true)),
            inline_menu: vec![wrap.into()],
            ..Default::default()
        },
    );
    let mut session = open("<p>ab cd</p>", spec);
    let text = child(&session, &[0]);

    assert!(session.select_text(TextSelection::within(text, 3, 4)));
    assert_eq!(session.bubble().unwrap().entries().len(), 1);
    assert!(session.choose(&[0]).is_applied());
    assert_eq!(
        session.to_xml(),
        "<p xml:space='preserve'>ab <i xml:space='preserve'>cd</i></p>"
    );
}

#[test]
fn test_drag_and_drop() {
    let spec = droppable(DocSpec::new(), "c", &["a"]);
    let mut session = open("<a><b/><c/></a>", spec);
    let root = session.view().root_id();
    let b = child(&session, &[0]);
    let c = child(&session, &[1]);

    assert!(!session.start_drag(b));
    assert!(session.start_drag(c));
    assert_eq!(session.drag().unwrap().targets, vec![Gap::new(root, 0)]);
    assert_eq!(session.drop_on(Gap::new(root, 0)), Outcome::Applied { focus: Some(Focus::OpeningTag(c)) });
    assert_eq!(session.to_xml(), "<a><c/><b/></a>");

    assert!(session.start_drag(c));
    assert_eq!(session.drop_on(Gap::new(root, 0)), Outcome::Declined);
    assert!(session.drag().is_none());
}

#[test]
fn test_layby_round_trip() {
    let mut spec = droppable(DocSpec::new(), "b", &["a"]);
    spec.allow_layby = Some(json!(true));
    let mut session = open("<a><b/></a>", spec);
    let root = session.view().root_id();
    let b = child(&session, &[0]);

    assert!(session.start_drag(b));
    assert!(session.drop_on_layby().is_applied());
    assert_eq!(session.to_xml(), "<a/>");
    assert_eq!(session.view().layby(), &[b]);
    assert!(session.view().is_layby_open());

    assert!(session.start_drag(b));
    assert!(session.drop_on(Gap::new(root, 0)).is_applied());
    assert_eq!(session.to_xml(), "<a><b/></a>");
    assert!(session.view().layby().is_empty());

    assert!(session.new_element_layby("<z/>").is_applied());
    assert_eq!(session.view().layby().len(), 1);
    assert!(session.empty_layby().is_applied());
    assert!(session.view().layby().is_empty());
}

#[test]
fn test_layby_needs_permission() {
    let mut session = open("<a/>", DocSpec::new());
    assert_eq!(session.new_element_layby("<z/>"), Outcome::Declined);
}

#[test]
fn test_laic_mode_hides_closing_tags() {
    let mut session = open("<a><b>x</b><c/></a>", DocSpec::new());
    let root = session.view().root_id();
    assert!(units(session.view(), Mode::Nerd).contains(&Focus::ClosingTag(root)));

    session.set_mode(Mode::Laic);
    let laic = units(session.view(), Mode::Laic);
    assert!(!laic.iter().any(|u| matches!(u, Focus::ClosingTag(_))));

    session.handle_key(&KeyEvent::plain(Key::Down));
    assert_eq!(session.focus(), Some(Focus::OpeningTag(root)));
}

#[test]
fn test_lenient_load_uses_placeholder() {
    let config = EditorConfig {
        placeholder_document: "<doc/>".to_string(),
        ..Default::default()
    };
    let (mut session, err) = EditorSession::load("<a><b></a>", Schema::default(), config);
    assert!(err.is_some());
    assert_eq!(session.to_xml(), "<doc/>");
}

#[test]
fn test_remote_asker_is_memoized() {
    let spec = DocSpec::new().element(
        "a",
        ElementSpec::default().attribute(
            "pos",
            AttributeSpec {
                asker: Some(AskerSpec::Named("remote".into())),
                asker_parameter: Some(json!({ "url": "/all", "searchUrl": "/search?q=$" })),
                ..Default::default()
            },
        ),
    );
    let source = StaticSource::new()
        .with("/all", vec![PickOption::new("noun"), PickOption::new("verb")])
        .with("/search?q=no", vec![PickOption::new("noun")]);
    let mut session = open("<a pos=''/>", spec);
    let pos = session.view().tree().attributes(session.view().root_id())[0];

    assert!(session.click(Focus::AttributeValue(pos)));
    assert_eq!(session.asker_options(&source, "").len(), 2);
    assert_eq!(session.asker_options(&source, "no"), vec![PickOption::new("noun")]);
    assert!(session.answer("noun").is_applied());
    assert_eq!(session.to_xml(), "<a pos='noun'/>");
}

#[test]
#[should_panic(expected = "harvest cache used after the view changed")]
fn test_stale_harvest_cache_panics() {
    let doc = parse_document("<a/>", &ResolveByTagName).unwrap();
    let mut view = render_document(&doc, &Schema::default());
    let mut cache = HarvestCache::new(&view);
    let root = view.root_id();
    let text = view.new_text("x");
    view.append_child(root, text);
    cache.harvest(&view, root);
}

#[derive(Debug, Clone)]
enum Insert {
    Child(usize),
    Before(usize, usize),
    After(usize, usize),
}

fn insert() -> impl Strategy<Value = Insert> {
    let kind = 0..3usize;
    prop_oneof![
        kind.clone().prop_map(Insert::Child),
        (kind.clone(), any::<usize>()).prop_map(|(k, at)| Insert::Before(k, at)),
        (kind, any::<usize>()).prop_map(|(k, at)| Insert::After(k, at)),
    ]
}

fn ordered_spec() -> DocSpec {
    DocSpec::new()
        .element(
            "x",
            ElementSpec {
                must_be_before: Some(Prop::value(json!(["y", "z"]))),
                ..Default::default()
            },
        )
        .element(
            "y",
            ElementSpec {
                must_be_before: Some(Prop::value(json!(["z"]))),
                ..Default::default()
            },
        )
}

proptest! {
    #[test]
    fn test_ordering_holds_after_every_insert(ops in prop::collection::vec(insert(), 1..12)) {
        let kinds = ["x", "y", "z"];
        let mut session = open("<a/>", ordered_spec());
        let root = session.view().root_id();

        for op in ops {
            let children = session.view().tree().children(root).to_vec();
            match op {
                Insert::Child(k) => {
                    session.new_element_child(root, &format!("<{}/>", kinds[k]));
                }
                Insert::Before(k, at) if !children.is_empty() => {
                    session.new_element_before(children[at % children.len()], &format!("<{}/>", kinds[k]));
                }
                Insert::After(k, at) if !children.is_empty() => {
                    session.new_element_after(children[at % children.len()], &format!("<{}/>", kinds[k]));
                }
                _ => {}
            }

            let ranks: Vec<usize> = session
                .view()
                .root()
                .child_elements()
                .map(|el| kinds.iter().position(|k| *k == el.name()).unwrap())
                .collect();
            prop_assert!(ranks.windows(2).all(|w| w[0] <= w[1]), "out of order: {:?}", ranks);
        }
    }
}

#[derive(Debug, Clone)]
enum Step {
    Insert(Insert),
    Wrap(usize, usize),
    Unwrap(usize),
    Merge(usize, bool),
    Replace(usize, usize),
    Move(usize, bool),
    SetText(usize, String),
    Delete(usize),
}

fn step() -> impl Strategy<Value = Step> {
    let kind = 0..4usize;
    prop_oneof![
        insert().prop_map(Step::Insert),
        (any::<usize>(), kind.clone()).prop_map(|(at, k)| Step::Wrap(at, k)),
        any::<usize>().prop_map(Step::Unwrap),
        (any::<usize>(), any::<bool>()).prop_map(|(at, up)| Step::Merge(at, up)),
        (any::<usize>(), kind).prop_map(|(at, k)| Step::Replace(at, k)),
        (any::<usize>(), any::<bool>()).prop_map(|(at, up)| Step::Move(at, up)),
        (any::<usize>(), "[a-z ]{0,6}").prop_map(|(at, text)| Step::SetText(at, text)),
        any::<usize>().prop_map(Step::Delete),
    ]
}

/// `x` before `y` before `z`, `g` anywhere; everything moves within `a`
fn mixed_spec() -> DocSpec {
    let mut spec = DocSpec::new();
    for (name, before) in [("x", vec!["y", "z"]), ("y", vec!["z"]), ("z", vec![])] {
        spec = spec.element(
            name,
            ElementSpec {
                must_be_before: Some(Prop::value(json!(before))),
                can_drop_to: Some(Prop::value(json!(["a"]))),
                ..Default::default()
            },
        );
    }
    spec.element(
        "g",
        ElementSpec {
            has_text: Some(Prop::value(true)),
            can_drop_to: Some(Prop::value(json!(["a"]))),
            ..Default::default()
        },
    )
    .element(
        "a",
        ElementSpec {
            has_text: Some(Prop::value(true)),
            ..Default::default()
        },
    )
}

fn pick(ids: &[NodeId], at: usize) -> Option<NodeId> {
    (!ids.is_empty()).then(|| ids[at % ids.len()])
}

proptest! {
    #[test]
    fn test_ordering_and_coalescing_hold_after_mixed_edits(steps in prop::collection::vec(step(), 1..16)) {
        let kinds = ["x", "y", "z", "g"];
        let mut session = open("<a>one <g>two</g> three<y/></a>", mixed_spec());
        let root = session.view().root_id();

        for step in steps {
            let tree = session.view().tree();
            let children = tree.children(root).to_vec();
            let elements: Vec<NodeId> = children.iter().copied().filter(|c| tree.is_element(*c)).collect();
            let texts: Vec<NodeId> = children
                .iter()
                .copied()
                .filter(|c| tree.value(*c).map(|v| !v.is_empty()).unwrap_or(false))
                .collect();
            let all_texts: Vec<NodeId> = children.iter().copied().filter(|c| tree.is_text(*c)).collect();

            match step {
                Step::Insert(Insert::Child(k)) => {
                    session.new_element_child(root, &format!("<{}/>", kinds[k]));
                }
                Step::Insert(Insert::Before(k, at)) => {
                    if let Some(sibling) = pick(&elements, at) {
                        session.new_element_before(sibling, &format!("<{}/>", kinds[k]));
                    }
                }
                Step::Insert(Insert::After(k, at)) => {
                    if let Some(sibling) = pick(&elements, at) {
                        session.new_element_after(sibling, &format!("<{}/>", kinds[k]));
                    }
                }
                Step::Wrap(at, k) => {
                    if let Some(text) = pick(&texts, at) {
                        let template = format!("<{0}>$</{0}>", kinds[k]);
                        session.wrap(TextSelection::within(text, 0, 0), &template, "$");
                    }
                }
                Step::Unwrap(at) => {
                    if let Some(el) = pick(&elements, at) {
                        session.unwrap(el);
                    }
                }
                Step::Merge(at, previous) => {
                    if let Some(el) = pick(&elements, at) {
                        if previous {
                            session.merge_with_previous(el);
                        } else {
                            session.merge_with_next(el);
                        }
                    }
                }
                Step::Replace(at, k) => {
                    if let Some(el) = pick(&elements, at) {
                        session.replace_with_xml(el, &format!("<{}/>", kinds[k]));
                    }
                }
                Step::Move(at, up) => {
                    if let Some(el) = pick(&elements, at) {
                        if up {
                            session.move_element_up(el);
                        } else {
                            session.move_element_down(el);
                        }
                    }
                }
                Step::SetText(at, value) => {
                    if let Some(text) = pick(&all_texts, at) {
                        session.set_text_value(text, &value);
                    }
                }
                Step::Delete(at) => {
                    if let Some(el) = pick(&elements, at) {
                        session.delete_element(el);
                    }
                }
            }

            let ranks: Vec<usize> = session
                .view()
                .root()
                .child_elements()
                .filter_map(|el| kinds[..3].iter().position(|k| *k == el.name()))
                .collect();
            prop_assert!(ranks.windows(2).all(|w| w[0] <= w[1]), "out of order: {}", session.view().to_xml());
            prop_assert!(no_adjacent_texts(&session), "adjacent texts: {}", session.view().to_xml());
        }
    }
}
