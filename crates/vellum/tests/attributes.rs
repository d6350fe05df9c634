//! `:name`, `:style`, `:class`, `@event` and interpolated attributes

mod common;

use common::Page;
use serde_json::json;
use vellum::{Document, Error, Value};

#[test]
fn bound_attribute_follows_state() {
    let page = Page::new(
        r#"<div id="app"><a id="link" :href="'/users/' + _.id">user</a></div>"#,
        json!({ "id": 7 }),
    );
    let link = page.by_id("link");
    assert_eq!(
        page.document.borrow().attribute(link, "href").as_deref(),
        Some("/users/7")
    );

    page.state.set("id", 8).unwrap();
    assert_eq!(
        page.document.borrow().attribute(link, "href").as_deref(),
        Some("/users/8")
    );
}

#[test]
fn bound_value_and_checked_are_properties() {
    let page = Page::new(
        r#"<div id="app"><input id="name" :value="_.name"><input id="flag" type="checkbox" :checked="_.on"></div>"#,
        json!({ "name": "Ada", "on": true }),
    );
    let document = page.document.borrow();
    assert_eq!(document.property(page.by_id("name"), "value"), Value::from("Ada"));
    assert_eq!(document.property(page.by_id("flag"), "checked"), Value::Bool(true));
    assert_eq!(document.attribute(page.by_id("name"), "value"), None);
}

#[test]
fn this_is_the_element() {
    let page = Page::new(
        r#"<div id="app"><p id="p" data-kind="note" :title="this.getAttribute('data-kind') + '!'"></p></div>"#,
        json!({}),
    );
    assert_eq!(
        page.document.borrow().attribute(page.by_id("p"), "title").as_deref(),
        Some("note!")
    );
}

#[test]
fn style_merges_after_the_original() {
    let page = Page::new(
        r#"<div id="app"><p id="p" style="color:red" :style="{font_size: _.size + 'px', margin: 0}"></p></div>"#,
        json!({ "size": 12 }),
    );
    let p = page.by_id("p");
    assert_eq!(
        page.document.borrow().attribute(p, "style").as_deref(),
        Some("color:red;font-size:12px;margin:0")
    );

    page.state.set("size", 14).unwrap();
    assert_eq!(
        page.document.borrow().attribute(p, "style").as_deref(),
        Some("color:red;font-size:14px;margin:0")
    );
}

#[test]
fn class_joins_after_the_original() {
    let page = Page::new(
        r#"<div id="app"><p id="p" class="base" :class="_.active ? ['on', 'x'] : []"></p><p id="q" :class="['solo']"></p></div>"#,
        json!({ "active": true }),
    );
    assert_eq!(
        page.document.borrow().attribute(page.by_id("p"), "class").as_deref(),
        Some("base on x")
    );
    assert_eq!(
        page.document.borrow().attribute(page.by_id("q"), "class").as_deref(),
        Some("solo")
    );

    page.state.set("active", false).unwrap();
    assert_eq!(
        page.document.borrow().attribute(page.by_id("p"), "class").as_deref(),
        Some("base")
    );
}

#[test]
fn string_class_is_a_type_error_and_leaves_the_element_alone() {
    let document = vellum::MemoryDocument::parse(
        r#"<div id="app"><p class="keep" :class="'oops'"></p></div>"#,
    )
    .unwrap()
    .into_shared();
    let app = document.borrow().element_by_id("app").unwrap();
    let error = vellum::Engine::new(document.clone())
        .bootstrap(app, Value::from_json(&json!({})))
        .unwrap_err();
    assert!(matches!(error, Error::Type { .. }));

    let p = document.borrow().elements_by_tag("p")[0];
    assert_eq!(document.borrow().attribute(p, "class").as_deref(), Some("keep"));
}

#[test]
fn interpolated_attribute_is_rendered() {
    let page = Page::new(
        r#"<div id="app"><img id="img" alt="photo of ${_.who}" src="static.png"></div>"#,
        json!({ "who": "Ada" }),
    );
    assert_eq!(page.html(), r#"<img id="img" alt="photo of Ada" src="static.png">"#);
    assert_eq!(page.state.binding_count(), 1);
}

#[test]
fn event_handler_sees_event_and_renders() {
    let page = Page::new(
        r#"<div id="app"><button id="b" @click="_.count += 1; _.last = event.type">${_.count} ${_.last}</button></div>"#,
        json!({ "count": 0, "last": "" }),
    );
    let passes = page.state.render_passes();
    page.click("b").unwrap();
    assert_eq!(page.texts("button"), ["1 click"]);
    // One pass per write, then the render signal
    assert_eq!(page.state.render_passes(), passes + 3);
}

#[test]
fn failing_handler_propagates() {
    let page = Page::new(
        r#"<div id="app"><button id="b" @click="_.missing.field = 1">x</button></div>"#,
        json!({}),
    );
    let error = page.click("b").unwrap_err();
    assert!(matches!(error, Error::TemplateEvaluation { .. }));
}

#[test]
fn unknown_names_are_not_defined() {
    let error = Page::try_new(
        r#"<div id="app"><p :title="window.location"></p></div>"#,
        json!({}),
    )
    .err()
    .unwrap();
    match error {
        Error::TemplateEvaluation { message, .. } => {
            assert!(message.contains("window is not defined"), "{message}");
        }
        other => panic!("unexpected error {other:?}"),
    }
}
