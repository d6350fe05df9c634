//! Render passes, observed state and the engine's extension points

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::Page;
use serde_json::json;
use vellum::{
    Directive, DirectiveContext, Document, Error, Function, NodeId, Result, State, Value,
};

#[test]
fn every_write_runs_one_pass() {
    let page = Page::new(r#"<div id="app">${_.a}-${_.b}</div>"#, json!({ "a": 1, "b": 2 }));
    assert_eq!(page.state.render_passes(), 1);

    page.state.set("a", 3).unwrap();
    page.state.set("b", 4).unwrap();
    assert_eq!(page.state.render_passes(), 3);
    assert_eq!(page.html(), "3-4");
}

#[test]
fn writes_during_a_pass_do_not_nest() {
    let page = Page::new(
        r#"<div id="app"><p>${_.double = _.n * 2}</p><i>${_.double}</i></div>"#,
        json!({ "n": 1, "double": 0 }),
    );
    assert_eq!(page.texts("i"), ["2"]);

    let passes = page.state.render_passes();
    page.state.set("n", 3).unwrap();
    assert_eq!(page.state.render_passes(), passes + 1);
    assert_eq!(page.state.render_depth(), 0);
    // Later bindings in the same pass see the write
    assert_eq!(page.texts("p"), ["6"]);
    assert_eq!(page.texts("i"), ["6"]);
}

#[test]
fn earlier_bindings_see_a_write_on_the_next_pass() {
    let page = Page::new(
        r#"<div id="app"><i>${_.double}</i><p>${_.double = _.n * 2}</p></div>"#,
        json!({ "n": 1, "double": 0 }),
    );
    assert_eq!(page.texts("i"), ["0"]);
    assert_eq!(page.texts("p"), ["2"]);

    let passes = page.state.render_passes();
    page.state.set("n", 3).unwrap();
    assert_eq!(page.state.render_passes(), passes + 1);
    assert_eq!(page.texts("i"), ["2"]);
    assert_eq!(page.texts("p"), ["6"]);

    page.state.render().unwrap();
    assert_eq!(page.texts("i"), ["6"]);
}

#[test]
fn meta_fields_never_render() {
    let page = Page::new(r#"<div id="app">${_.$note}</div>"#, json!({ "$note": "a" }));
    let passes = page.state.render_passes();
    page.state.set("$note", "b").unwrap();
    assert_eq!(page.state.render_passes(), passes);
    assert_eq!(page.html(), "a");

    page.state.render().unwrap();
    assert_eq!(page.html(), "b");
}

#[test]
fn a_failed_pass_still_counts() {
    let page = Page::new(r#"<div id="app">${_.a.b}</div>"#, json!({ "a": { "b": 1 } }));
    let passes = page.state.render_passes();
    let error = page.state.set("a", Value::Null).unwrap_err();
    assert!(matches!(error, Error::TemplateEvaluation { .. }));
    assert_eq!(page.state.render_passes(), passes + 1);
    assert_eq!(page.state.render_depth(), 0);
}

#[test]
fn nested_reads_share_one_wrapper() {
    let page = Page::new(
        r#"<div id="app">${_.user.name}</div>"#,
        json!({ "user": { "name": "Ada" }, "tags": ["x"] }),
    );
    let (Value::State(first), Value::State(second)) =
        (page.state.get("user"), page.state.get("user"))
    else {
        panic!("nested maps are observed");
    };
    assert!(first.ptr_eq(&second));
    assert!(State::is_observed(&page.state.get("tags")));
    assert!(!State::is_observed(&page.state.get("missing")));

    let wrapped = page.state.wrap(Value::State(first.clone()));
    assert!(matches!(wrapped, Value::State(ref again) if again.ptr_eq(&first)));

    first.set("name", "Grace").unwrap();
    assert_eq!(page.html(), "Grace");
}

#[test]
fn list_writes_through_the_wrapper_render() {
    let page = Page::new(
        r#"<div id="app">${_.items.length}:${_.items.join(',')}</div>"#,
        json!({ "items": [1, 2] }),
    );
    let Value::State(items) = page.state.get("items") else {
        panic!("lists are observed");
    };
    items.push(vec![Value::from(3)]).unwrap();
    assert_eq!(page.html(), "3:1,2,3");

    items.pop().unwrap();
    items.splice(0, 1, vec![Value::from(9)]).unwrap();
    assert_eq!(page.html(), "2:9,2");
}

#[test]
fn globals_are_visible_to_expressions() {
    let page = Page::try_with(
        r#"<div id="app">${greeting}, ${Math.max(_.a, 4)}</div>"#,
        json!({ "a": 2 }),
        |engine| engine.global("greeting", "hello").global("1st", 1).global("_", 0),
    )
    .unwrap();
    assert_eq!(page.html(), "hello, 4");
}

struct Upper;

impl Directive for Upper {
    fn setup(&self, context: &DirectiveContext<'_>) -> Result<()> {
        let document = context.scope.document();
        let mut document = document.borrow_mut();
        for child in document.children(context.element) {
            document.remove(child);
        }
        let text = document.create_text(&context.value.to_uppercase());
        document.append_child(context.element, text);
        Ok(())
    }
}

#[test]
fn custom_directives_replace_interpolation() {
    let page = Page::try_with(
        r#"<div id="app"><p v-upper="shout">old</p></div>"#,
        json!({}),
        |engine| engine.directive("v-upper", Upper),
    )
    .unwrap();
    assert_eq!(page.texts("p"), ["SHOUT"]);
}

#[test]
fn prefix_directives_claim_unclaimed_names() {
    let page = Page::try_with(
        r#"<div id="app"><p x-shout="hey">old</p><b :title="_.t">${_.t}</b></div>"#,
        json!({ "t": "tip" }),
        |engine| engine.prefix_directive("x-", Upper),
    )
    .unwrap();
    assert_eq!(page.texts("p"), ["HEY"]);
    // The built-in `:` prefix is untouched
    let title = page.document.borrow().attribute(page.tags("b")[0], "title");
    assert_eq!(title.as_deref(), Some("tip"));
}

struct Hook(Rc<RefCell<Vec<(NodeId, Option<NodeId>)>>>);

impl Directive for Hook {
    fn setup(&self, context: &DirectiveContext<'_>) -> Result<()> {
        self.0.borrow_mut().push((context.element, context.parent));
        Ok(())
    }
}

#[test]
fn mount_hook_runs_once_on_the_bootstrap_element() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let hook = Hook(seen.clone());
    let page = Page::try_with(
        r#"<div id="app"><section><p>x</p></section></div>"#,
        json!({}),
        |engine| engine.directive("$", hook),
    )
    .unwrap();
    assert_eq!(*seen.borrow(), [(page.app, None)]);
}

#[test]
fn state_directives_override_the_table() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let recorded = calls.clone();
    let handler = Function::native("track", move |arguments| {
        let name = arguments[1].to_string();
        let value = arguments[2].to_string();
        let has_scope = State::is_observed(&arguments[3]);
        recorded.borrow_mut().push((name, value, has_scope));
        Ok(Value::Undefined)
    });

    let document = vellum::MemoryDocument::parse(
        r#"<div id="app"><b :title="_.nope.nope">x</b></div>"#,
    )
    .unwrap()
    .into_shared();
    let app = document.borrow().element_by_id("app").unwrap();
    let state = Value::map([
        (
            "$directives",
            Value::map([(":title", Value::Function(handler))]),
        ),
    ]);
    vellum::Engine::new(document.clone())
        .bootstrap(app, state)
        .unwrap();

    assert_eq!(
        *calls.borrow(),
        [(":title".to_owned(), "_.nope.nope".to_owned(), true)]
    );
    let b = document.borrow().elements_by_tag("b")[0];
    assert_eq!(document.borrow().attribute(b, "title").as_deref(), Some("_.nope.nope"));
}
