//! The host tree API the engine drives.
//!
//! The engine never owns nodes; it holds [`NodeId`] handles and calls back
//! into a [`Document`] behind a shared [`DocumentRef`]. Borrows of the
//! document are always released before a listener or binding runs, so a
//! listener may freely mutate state and trigger renders.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::value::Value;

/// Generational handle of a node owned by a [`Document`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId {
    pub index: u32,
    pub generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NodeKind {
    Element,
    Text,
}

/// A named signal delivered to listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub target: NodeId,
    pub detail: Value,
}

impl Event {
    pub fn new(name: impl Into<String>, target: NodeId) -> Self {
        Self {
            name: name.into(),
            target,
            detail: Value::Undefined,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }
}

pub type Listener = Rc<dyn Fn(&Event) -> Result<()>>;

pub type DocumentRef = Rc<RefCell<dyn Document>>;

pub trait Document {
    /// `None` for handles that no longer refer to a live node.
    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Lowercase tag name of an element.
    fn tag_name(&self, node: NodeId) -> Option<String>;

    fn create_element(&mut self, tag: &str) -> NodeId;

    fn create_text(&mut self, text: &str) -> NodeId;

    /// Deep copy of a subtree: attributes, properties and text, not listeners.
    /// The copy is detached.
    fn clone_node(&mut self, node: NodeId) -> NodeId;

    /// Detach a node from its parent. The node stays alive and can be
    /// inserted again.
    fn remove(&mut self, node: NodeId);

    /// Insert `node` right after `anchor` under `parent`, or as the first
    /// child when `anchor` is `None`.
    fn insert_after(&mut self, parent: NodeId, node: NodeId, anchor: Option<NodeId>);

    fn append_child(&mut self, parent: NodeId, node: NodeId);

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> Vec<NodeId>;

    fn previous_element_sibling(&self, node: NodeId) -> Option<NodeId>;

    fn next_element_sibling(&self, node: NodeId) -> Option<NodeId>;

    /// Whether the node is reachable from the document root.
    fn is_connected(&self, node: NodeId) -> bool;

    fn text(&self, node: NodeId) -> Option<String>;

    fn set_text(&mut self, node: NodeId, text: &str);

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Attributes in source order.
    fn attributes(&self, node: NodeId) -> Vec<(String, String)>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    fn remove_attribute(&mut self, node: NodeId, name: &str);

    /// Form-control state (`value`, `checked`) kept apart from attributes.
    fn property(&self, node: NodeId, name: &str) -> Value;

    fn set_property(&mut self, node: NodeId, name: &str, value: Value);

    fn add_listener(&mut self, node: NodeId, event: &str, listener: Listener);

    fn listeners(&self, node: NodeId, event: &str) -> Vec<Listener>;

    /// Detached copies of the content of the document-level template `id`.
    fn template(&mut self, id: &str) -> Option<Vec<NodeId>>;

    /// Parse markup into detached nodes.
    fn parse_fragment(&mut self, markup: &str) -> Result<Vec<NodeId>>;

    /// Detach a subtree that will never be inserted again. Documents that
    /// recycle storage may invalidate its handles.
    fn discard(&mut self, node: NodeId) {
        self.remove(node);
    }
}

/// Deliver `event` to the listeners of its target, in registration order.
/// The first failing listener stops delivery.
pub fn dispatch(document: &DocumentRef, event: Event) -> Result<()> {
    let listeners = document.borrow().listeners(event.target, &event.name);
    for listener in listeners {
        listener(&event)?;
    }
    Ok(())
}

/// Whether the element is a form control whose `value`/`checked` live in
/// properties.
pub(crate) fn is_form_control(document: &dyn Document, node: NodeId) -> bool {
    matches!(
        document.tag_name(node).as_deref(),
        Some("input" | "textarea" | "select")
    )
}

/// Set an attribute, routing `value` and `checked` to properties.
pub(crate) fn set_attribute_or_property(
    document: &mut dyn Document,
    node: NodeId,
    name: &str,
    value: Value,
) {
    match name {
        "value" | "checked" => document.set_property(node, name, value),
        _ => document.set_attribute(node, name, &value.to_string()),
    }
}
