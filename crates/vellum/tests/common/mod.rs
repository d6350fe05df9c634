//! Shared harness: a parsed page bound to JSON state.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use vellum::{
    Document, DocumentRef, Engine, Event, MemoryDocument, NodeId, Result, State, Value, dispatch,
};

pub struct Page {
    pub document: Rc<RefCell<MemoryDocument>>,
    pub app: NodeId,
    pub state: State,
}

impl Page {
    /// Parse `markup`, which must contain an element with `id="app"`, and
    /// bootstrap it with `state`.
    pub fn new(markup: &str, state: serde_json::Value) -> Self {
        Self::try_with(markup, state, |engine| engine).expect("bootstrap failed")
    }

    pub fn try_new(markup: &str, state: serde_json::Value) -> Result<Self> {
        Self::try_with(markup, state, |engine| engine)
    }

    pub fn try_with(
        markup: &str,
        state: serde_json::Value,
        configure: impl FnOnce(Engine) -> Engine,
    ) -> Result<Self> {
        let document = MemoryDocument::parse(markup)?.into_shared();
        let app = document
            .borrow()
            .element_by_id("app")
            .expect("markup has no #app element");
        let engine = configure(Engine::new(document.clone()));
        let state = engine.bootstrap(app, Value::from_json(&state))?;
        Ok(Self {
            document,
            app,
            state,
        })
    }

    pub fn html(&self) -> String {
        self.document.borrow().inner_markup(self.app)
    }

    pub fn by_id(&self, id: &str) -> NodeId {
        self.document
            .borrow()
            .element_by_id(id)
            .unwrap_or_else(|| panic!("no element #{id}"))
    }

    pub fn tags(&self, tag: &str) -> Vec<NodeId> {
        self.document.borrow().elements_by_tag(tag)
    }

    pub fn texts(&self, tag: &str) -> Vec<String> {
        let document = self.document.borrow();
        document
            .elements_by_tag(tag)
            .into_iter()
            .map(|node| document.text(node).unwrap_or_default())
            .collect()
    }

    pub fn fire(&self, node: NodeId, event: &str) -> Result<()> {
        let document: DocumentRef = self.document.clone();
        dispatch(&document, Event::new(event, node))
    }

    pub fn click(&self, id: &str) -> Result<()> {
        self.fire(self.by_id(id), "click")
    }

    /// Set a control's `value` the way a user would, then fire `input`.
    pub fn type_into(&self, id: &str, value: &str) -> Result<()> {
        let node = self.by_id(id);
        self.document
            .borrow_mut()
            .set_property(node, "value", Value::from(value));
        self.fire(node, "input")
    }

    pub fn toggle(&self, id: &str) -> Result<()> {
        let node = self.by_id(id);
        let checked = self.document.borrow().property(node, "checked").is_truthy();
        self.document
            .borrow_mut()
            .set_property(node, "checked", Value::Bool(!checked));
        self.fire(node, "input")
    }
}
