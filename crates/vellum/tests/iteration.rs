//! v-for reconciliation

mod common;

use common::Page;
use proptest::prelude::*;
use serde_json::json;
use vellum::{Config, Value};

const LIST: &str = r#"<ul id="app"><li v-for="_.items">${$index}:${$item}</li></ul>"#;

fn items(json: serde_json::Value) -> Value {
    Value::from_json(&json)
}

#[test]
fn grows_and_shrinks_at_the_tail() {
    let page = Page::new(LIST, json!({ "items": [1, 2, 3] }));
    assert_eq!(page.html(), "<li>0:1</li><li>1:2</li><li>2:3</li>");
    // The v-for record plus one record per clone
    assert_eq!(page.state.binding_count(), 4);

    page.state.set("items", items(json!([1]))).unwrap();
    assert_eq!(page.html(), "<li>0:1</li>");
    assert_eq!(page.state.binding_count(), 2);

    let first = page.tags("li")[0];
    page.state.set("items", items(json!([1, 2]))).unwrap();
    assert_eq!(page.html(), "<li>0:1</li><li>1:2</li>");
    assert_eq!(page.tags("li")[0], first);
    assert_eq!(page.state.binding_count(), 3);
}

#[test]
fn reordering_rebinds_instead_of_moving() {
    let page = Page::new(LIST, json!({ "items": ["a", "b", "c"] }));
    let before = page.tags("li");

    page.state.set("items", items(json!(["c", "b", "a"]))).unwrap();
    assert_eq!(page.html(), "<li>0:c</li><li>1:b</li><li>2:a</li>");
    assert_eq!(page.tags("li"), before);
}

#[test]
fn list_methods_drive_the_loop() {
    let page = Page::new(
        r#"<div id="app"><button id="add" @click="_.items.push(_.items.length + 1)">+</button><button id="drop" @click="_.items.shift()">-</button><i v-for="_.items">${$item}</i></div>"#,
        json!({ "items": [1] }),
    );
    page.click("add").unwrap();
    page.click("add").unwrap();
    assert_eq!(page.texts("i"), ["1", "2", "3"]);

    page.click("drop").unwrap();
    assert_eq!(page.texts("i"), ["2", "3"]);
}

#[test]
fn clones_follow_the_anchor() {
    let page = Page::new(
        r#"<div id="app"><h1>head</h1><p v-for="_.items">${$item}</p><footer>foot</footer></div>"#,
        json!({ "items": ["a", "b"] }),
    );
    assert_eq!(
        page.html(),
        "<h1>head</h1><p>a</p><p>b</p><footer>foot</footer>"
    );
}

#[test]
fn consecutive_loops_keep_their_order() {
    let page = Page::new(
        r#"<div id="app"><a v-for="_.xs">${$item}</a><b v-for="_.ys">${$item}</b></div>"#,
        json!({ "xs": [1, 2], "ys": [3] }),
    );
    assert_eq!(page.html(), "<a>1</a><a>2</a><b>3</b>");

    page.state.set("xs", items(json!([1, 2, 9]))).unwrap();
    assert_eq!(page.html(), "<a>1</a><a>2</a><a>9</a><b>3</b>");

    page.state.set("xs", items(json!([]))).unwrap();
    page.state.set("ys", items(json!([]))).unwrap();
    page.state.set("ys", items(json!([4]))).unwrap();
    page.state.set("xs", items(json!([5]))).unwrap();
    assert_eq!(page.html(), "<a>5</a><b>4</b>");
}

#[test]
fn item_writes_reach_the_enclosing_state() {
    let page = Page::new(
        r#"<ul id="app"><li v-for="_.todos" v-for-item="todo" v-for-index="i"><span>${i}.${todo.title}:${todo.done ? 'x' : 'o'}</span><button @click="todo.done = !todo.done">toggle</button></li></ul>"#,
        json!({ "todos": [
            { "title": "a", "done": false },
            { "title": "b", "done": true },
        ] }),
    );
    assert_eq!(page.texts("span"), ["0.a:o", "1.b:x"]);

    let second = page.tags("button")[1];
    page.fire(second, "click").unwrap();
    assert_eq!(page.texts("span"), ["0.a:o", "1.b:o"]);
    assert_eq!(
        page.state.snapshot().to_json(),
        json!({ "todos": [
            { "title": "a", "done": false },
            { "title": "b", "done": false },
        ] })
    );
}

#[test]
fn numbers_strings_and_maps_are_iterable() {
    let page = Page::new(
        r#"<div id="app"><a v-for="3">${$index}</a><b v-for="'xy'">${$item}</b><i v-for="_.map">${$item}</i></div>"#,
        json!({ "map": { "k": "v", "l": "w" } }),
    );
    assert_eq!(page.texts("a"), ["0", "1", "2"]);
    assert_eq!(page.texts("b"), ["x", "y"]);
    assert_eq!(page.texts("i"), ["v", "w"]);
}

#[test]
fn default_names_come_from_the_config() {
    let config = Config {
        default_item_name: "$it".to_owned(),
        default_index_name: "$at".to_owned(),
        ..Config::default()
    };
    let page = Page::try_with(
        r#"<ol id="app"><li v-for="_.items">${$at}=${$it}</li></ol>"#,
        json!({ "items": ["q"] }),
        |engine| engine.with_config(config),
    )
    .unwrap();
    assert_eq!(page.html(), "<li>0=q</li>");
}

#[test]
fn non_iterable_sequence_is_a_type_error() {
    let error = Page::try_new(LIST, json!({ "items": true })).err().unwrap();
    assert!(matches!(error, vellum::Error::Type { .. }));

    let error = Page::try_new(
        r#"<ul id="app"><li v-for="_.n">${$index}</li></ul>"#,
        json!({ "n": 1e19 }),
    )
    .err()
    .unwrap();
    assert!(matches!(error, vellum::Error::Type { .. }));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn clones_track_the_list_length(lengths in prop::collection::vec(0usize..8, 1..12)) {
        let page = Page::new(
            r#"<ul id="app"><li v-for="_.items">${$index}</li></ul>"#,
            json!({ "items": [] }),
        );
        for length in lengths {
            page.state
                .set("items", Value::list((0..length).map(Value::from)))
                .unwrap();
            let expected = (0..length).map(|index| index.to_string()).collect::<Vec<_>>();
            prop_assert_eq!(page.texts("li"), expected);
            prop_assert_eq!(page.state.binding_count(), length + 1);
        }
    }
}
