//! v-mount components, props and slots

mod common;

use common::Page;
use serde_json::json;
use vellum::{Component, Components, Document, Error};

fn counter() -> Components {
    Components::new().with(
        "counter",
        Component::new(
            r#"<b>${_.count + _.start}</b><button id="inc" @click="_.count++">+</button><script>_.count = 10</script>"#,
        )
        .with_field("count", 0),
    )
}

#[test]
fn registered_component_runs_its_script_and_reacts() {
    let page = Page::try_with(
        r#"<div id="app"><div id="c" v-mount="counter" :start="_.base"></div></div>"#,
        json!({ "base": 1 }),
        |engine| engine.components(counter()),
    )
    .unwrap();
    assert_eq!(page.texts("b"), ["11"]);
    assert!(page.tags("script").is_empty());

    let host = page.by_id("c");
    let document = page.document.borrow();
    assert_eq!(document.attribute(host, "v-mount"), None);
    assert_eq!(document.attribute(host, ":start"), None);
    drop(document);

    page.click("inc").unwrap();
    assert_eq!(page.texts("b"), ["12"]);
    // Component writes stay in the component scope
    assert_eq!(page.state.snapshot().to_json(), json!({ "base": 1 }));
}

#[test]
fn props_follow_the_enclosing_state() {
    let page = Page::try_with(
        r#"<div id="app"><div v-mount="counter" :start="_.base * 2"></div></div>"#,
        json!({ "base": 1 }),
        |engine| engine.components(counter()),
    )
    .unwrap();
    assert_eq!(page.texts("b"), ["12"]);

    page.state.set("base", 5).unwrap();
    assert_eq!(page.texts("b"), ["20"]);
}

#[test]
fn templates_are_the_fallback() {
    let page = Page::new(
        r#"<template id="card"><h2>${_.title}</h2></template><div id="app"><section v-mount="card" :title="_.name.toUpperCase()"></section></div>"#,
        json!({ "name": "ada" }),
    );
    assert_eq!(page.html(), "<section><h2>ADA</h2></section>");

    page.state.set("name", "grace").unwrap();
    assert_eq!(page.texts("h2"), ["GRACE"]);
}

#[test]
fn a_component_without_props_is_still_rendered() {
    let page = Page::new(
        r#"<template id="stamp"><em>${_.label}</em><script>_.label = 'new'</script></template><div id="app"><span v-mount="stamp"></span></div>"#,
        json!({}),
    );
    assert_eq!(page.html(), "<span><em>new</em></span>");
}

#[test]
fn components_can_live_in_state() {
    let page = Page::new(
        r#"<div id="app"><span v-mount="badge"></span></div>"#,
        json!({
            "$components": {
                "badge": { "$html": "<em>${_.label}</em>", "label": "beta" }
            }
        }),
    );
    assert_eq!(page.html(), "<span><em>beta</em></span>");
}

#[test]
fn unknown_component_is_structural() {
    let error = Page::try_new(
        r#"<div id="app"><div v-mount="nowhere"></div></div>"#,
        json!({}),
    )
    .err()
    .unwrap();
    assert!(matches!(error, Error::Structural { ref message } if message.contains("nowhere")));
}

#[test]
fn failing_script_aborts_the_mount() {
    let error = Page::try_with(
        r#"<div id="app"><div v-mount="broken"></div></div>"#,
        json!({}),
        |engine| {
            engine.components(Components::new().with(
                "broken",
                Component::new("<p></p><script>_.a.b = 1</script>"),
            ))
        },
    )
    .err()
    .unwrap();
    assert!(matches!(error, Error::TemplateEvaluation { .. }));
}

const PANEL: &str = r#"<template id="panel"><header><slot name="h1">fallback</slot></header><main><slot></slot></main></template>"#;

#[test]
fn slots_receive_children_by_tag_name() {
    let page = Page::new(
        &format!(
            r#"{PANEL}<div id="app"><div v-mount="panel"><h1>${{_.title}}</h1><default>body</default></div></div>"#
        ),
        json!({ "title": "Hi" }),
    );
    assert_eq!(
        page.html(),
        r#"<div><header><slot name="h1">Hi</slot></header><main><slot>body</slot></main></div>"#
    );

    // Slot content keeps the enclosing scope
    page.state.set("title", "Hello").unwrap();
    assert_eq!(page.texts("slot"), ["Hello", "body"]);
}

#[test]
fn unmatched_slots_keep_their_fallback() {
    let page = Page::new(
        &format!(r#"{PANEL}<div id="app"><div v-mount="panel"></div></div>"#),
        json!({}),
    );
    assert_eq!(page.texts("slot"), ["fallback", ""]);
}

#[test]
fn duplicate_slot_children_are_structural() {
    let error = Page::try_new(
        &format!(r#"{PANEL}<div id="app"><div v-mount="panel"><h1>a</h1><h1>b</h1></div></div>"#),
        json!({}),
    )
    .err()
    .unwrap();
    assert!(matches!(error, Error::Structural { ref message } if message.contains("h1")));
}
