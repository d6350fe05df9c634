//! Expression evaluation through `${...}` text bindings

mod common;

use common::Page;
use serde_json::json;
use vellum::Error;

fn eval(source: &str, state: serde_json::Value) -> String {
    Page::new(&format!(r#"<p id="app">${{{source}}}</p>"#), state).html()
}

#[test]
fn arithmetic_precedence() {
    assert_eq!(eval("1 + 2 * 3", json!({})), "7");
    assert_eq!(eval("(1 + 2) * 3", json!({})), "9");
    assert_eq!(eval("2 - 3 - 4", json!({})), "-5");
    assert_eq!(eval("10 % 4 + -_.n", json!({ "n": 1 })), "1");
    assert_eq!(eval("1 / 0", json!({})), "Infinity");
    assert_eq!(eval("0.5 + 0.25", json!({})), "0.75");
}

#[test]
fn strings_concatenate_and_compare() {
    assert_eq!(eval("'a' + 1 + 2", json!({})), "a12");
    assert_eq!(eval("1 + 2 + 'a'", json!({})), "3a");
    assert_eq!(eval("'b' > 'a'", json!({})), "true");
    assert_eq!(eval("_.n == '1'", json!({ "n": 1 })), "true");
    assert_eq!(eval("_.n === '1'", json!({ "n": 1 })), "false");
}

#[test]
fn logical_operators_short_circuit() {
    // The right side would fail if it ran
    assert_eq!(eval("_.missing && _.missing.field", json!({})), "undefined");
    assert_eq!(eval("_.name || _.missing.field", json!({ "name": "Ada" })), "Ada");
    assert_eq!(eval("_.none ?? 'default'", json!({ "none": null })), "default");
    assert_eq!(eval("0 ?? 'default'", json!({})), "0");
    assert_eq!(eval("_.user?.name", json!({ "user": null })), "undefined");
}

#[test]
fn conditionals_nest() {
    let source = "_.n > 10 ? 'big' : _.n > 5 ? 'medium' : 'small'";
    assert_eq!(eval(source, json!({ "n": 20 })), "big");
    assert_eq!(eval(source, json!({ "n": 7 })), "medium");
    assert_eq!(eval(source, json!({ "n": 1 })), "small");
}

#[test]
fn backtick_templates_nest() {
    assert_eq!(
        eval("`a${`b${_.n + 1}`}c`", json!({ "n": 1 })),
        "ab2c"
    );
}

#[test]
fn arrows_drive_list_methods() {
    let state = json!({ "items": [1, 2, 3] });
    assert_eq!(
        eval("_.items.filter(x => x > 1).map(x => x * 10).join('-')", state.clone()),
        "20-30"
    );
    assert_eq!(eval("_.items.reduce((sum, x) => sum + x, 0)", state.clone()), "6");
    assert_eq!(eval("_.items.find(x => x % 2 == 0)", state.clone()), "2");
    assert_eq!(eval("_.items.some(x => x > 2) && _.items.every(x => x > 0)", state.clone()), "true");
    assert_eq!(eval("_.items.slice(-2)", state.clone()), "2,3");
    assert_eq!(eval("_.items.indexOf(4)", state), "-1");
}

#[test]
fn arrows_close_over_their_parameters() {
    assert_eq!(
        eval("((a) => (b) => a + b)(2)(3)", json!({})),
        "5"
    );
}

#[test]
fn string_and_number_methods() {
    assert_eq!(eval("'abc'.toUpperCase().padStart(5, '*')", json!({})), "**ABC");
    assert_eq!(eval("' x '.trim().repeat(3)", json!({})), "xxx");
    assert_eq!(eval("'a,b'.split(',').length", json!({})), "2");
    assert_eq!(eval("(2.5).toFixed(2)", json!({})), "2.50");
    assert_eq!(eval("typeof nothing", json!({})), "undefined");
    assert_eq!(eval("typeof _.n", json!({ "n": 3 })), "number");
}

#[test]
fn ambient_globals() {
    assert_eq!(eval("Math.max(1, 7, 3)", json!({})), "7");
    assert_eq!(eval("JSON.stringify({a: [1, 2]})", json!({})), r#"{"a":[1,2]}"#);
}

#[test]
fn fields_resolve_as_bare_names() {
    assert_eq!(eval("count + _.count", json!({ "count": 2 })), "4");
}

#[test]
fn bare_names_cannot_be_assigned() {
    let error = Page::try_new(r#"<p id="app">${count = 3}</p>"#, json!({ "count": 1 }))
        .err()
        .unwrap();
    match error {
        Error::TemplateEvaluation { message, .. } => {
            assert!(message.contains("_.count"), "{message}");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn assignment_through_nested_wrappers_renders() {
    let page = Page::new(
        r#"<div id="app"><b>${_.user.address.city}</b><button id="move" @click="_.user.address.city = 'Oslo'">go</button></div>"#,
        json!({ "user": { "address": { "city": "Rome" } } }),
    );
    page.click("move").unwrap();
    assert_eq!(page.texts("b"), ["Oslo"]);
    assert_eq!(
        page.state.snapshot().to_json(),
        json!({ "user": { "address": { "city": "Oslo" } } })
    );
}

#[test]
fn oversized_counts_fail_instead_of_allocating() {
    let error = Page::try_new(r#"<p id="app">${'a'.repeat(_.n)}</p>"#, json!({ "n": 1e19 }))
        .err()
        .unwrap();
    match error {
        Error::TemplateEvaluation { message, .. } => {
            assert!(message.contains("invalid count"), "{message}");
        }
        other => panic!("unexpected error {other:?}"),
    }

    let error = Page::try_new(r#"<p id="app">${'a'.padStart(_.n)}</p>"#, json!({ "n": 1e19 }))
        .err()
        .unwrap();
    assert!(matches!(error, Error::TemplateEvaluation { .. }));

    let error = Page::try_new(
        r#"<p id="app">${_.items.length = _.n}</p>"#,
        json!({ "items": [], "n": 1e19 }),
    )
    .err()
    .unwrap();
    assert!(matches!(error, Error::Type { .. }));

    let error = Page::try_new(
        r#"<p id="app">${_.items[_.n] = 1}</p>"#,
        json!({ "items": [], "n": 1e15 }),
    )
    .err()
    .unwrap();
    assert!(matches!(error, Error::Type { .. }));
}

#[test]
fn counts_within_bounds_still_work() {
    assert_eq!(eval("'ab'.repeat(2.7)", json!({})), "abab");
    assert_eq!(eval("'x'.padEnd(-3, '.')", json!({})), "x");

    let page = Page::new(
        r#"<p id="app">${_.items.length = 2}</p>"#,
        json!({ "items": [1, 2, 3] }),
    );
    assert_eq!(page.state.snapshot().to_json(), json!({ "items": [1, 2] }));
}
