//! An in-memory [`Document`] used by the CLI and by tests.

use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

mod arena;
pub use arena::Arena;

mod markup;
pub use markup::{MarkupNode, escape_attribute, escape_text, is_void};

use crate::document::{Document, Listener, NodeId, NodeKind, is_form_control};
use crate::error::Result;
use crate::value::Value;

const ROOT_TAG: &str = "#document";

#[derive(Clone)]
enum Content {
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
        properties: IndexMap<String, Value>,
        /// Children of a `<template>`, kept out of the tree.
        template_content: Vec<NodeId>,
    },
    Text(String),
}

#[derive(Clone)]
struct NodeData {
    content: Content,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    listeners: Vec<(String, Listener)>,
}

impl NodeData {
    fn new(content: Content) -> Self {
        Self {
            content,
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
        }
    }
}

pub struct MemoryDocument {
    arena: Arena<NodeData>,
    root: NodeId,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.alloc(NodeData::new(element_content(ROOT_TAG)));
        Self { arena, root }
    }

    /// A document whose root holds the parsed markup.
    pub fn parse(markup: &str) -> Result<Self> {
        let mut document = Self::new();
        let root = document.root;
        for node in document.parse_fragment(markup)? {
            document.append_child(root, node);
        }
        Ok(document)
    }

    pub fn into_shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Live nodes, attached or not.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Connected elements in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        let mut elements = Vec::new();
        let mut pending = vec![self.root];
        while let Some(node) = pending.pop() {
            if node != self.root && self.kind(node) == Some(NodeKind::Element) {
                elements.push(node);
            }
            if let Some(data) = self.arena.get(node) {
                pending.extend(data.children.iter().rev());
            }
        }
        elements
    }

    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|node| self.tag_name(*node).as_deref() == Some(tag))
            .collect()
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|node| self.attribute(*node, "id").as_deref() == Some(id))
    }

    /// Serialized node. Form controls show their live `value` and `checked`
    /// rather than the attributes they were parsed with.
    pub fn markup(&self, node: NodeId) -> String {
        let mut output = String::new();
        self.write_markup(node, &mut output);
        output
    }

    /// Serialized children of `node`.
    pub fn inner_markup(&self, node: NodeId) -> String {
        let mut output = String::new();
        for child in self.children(node) {
            self.write_markup(child, &mut output);
        }
        output
    }

    /// The whole document.
    pub fn to_markup(&self) -> String {
        self.inner_markup(self.root)
    }

    fn write_markup(&self, node: NodeId, output: &mut String) {
        let Some(data) = self.arena.get(node) else {
            return;
        };
        match &data.content {
            Content::Text(text) => {
                let raw_parent = data
                    .parent
                    .and_then(|parent| self.tag_name(parent))
                    .is_some_and(|tag| tag == "script" || tag == "style");
                if raw_parent {
                    output.push_str(text);
                } else {
                    output.push_str(&escape_text(text));
                }
            }
            Content::Element {
                tag,
                attributes,
                properties,
                template_content,
            } => {
                output.push('<');
                output.push_str(tag);
                for (name, value) in attributes {
                    if properties.contains_key(name) {
                        continue;
                    }
                    write_attribute(output, name, value);
                }
                for (name, value) in properties {
                    match (name.as_str(), value) {
                        ("checked", Value::Bool(false)) => {}
                        ("checked", _) => write_attribute(output, name, ""),
                        (name, value) => write_attribute(output, name, &value.to_string()),
                    }
                }
                output.push('>');
                if is_void(tag) {
                    return;
                }
                for child in template_content.iter().chain(&data.children) {
                    self.write_markup(*child, output);
                }
                output.push_str("</");
                output.push_str(tag);
                output.push('>');
            }
        }
    }

    fn insert(&mut self, parent: NodeId, node: NodeId, index: usize) {
        if !self.arena.is_valid(parent) || !self.arena.is_valid(node) || parent == node {
            return;
        }
        self.remove(node);
        if let Some(data) = self.arena.get_mut(parent) {
            let index = index.min(data.children.len());
            data.children.insert(index, node);
        }
        if let Some(data) = self.arena.get_mut(node) {
            data.parent = Some(parent);
        }
    }

    fn build(&mut self, node: MarkupNode) -> NodeId {
        match node {
            MarkupNode::Text(text) => self.create_text(&text),
            MarkupNode::Element {
                tag,
                attributes,
                children,
            } => {
                let element = self.create_element(&tag);
                for (name, value) in &attributes {
                    self.set_attribute(element, name, value);
                }
                let children = children
                    .into_iter()
                    .map(|child| self.build(child))
                    .collect::<Vec<_>>();
                if tag == "template" {
                    if let Some(NodeData {
                        content: Content::Element { template_content, .. },
                        ..
                    }) = self.arena.get_mut(element)
                    {
                        *template_content = children;
                    }
                } else {
                    for child in children {
                        self.append_child(element, child);
                    }
                }
                element
            }
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<(&mut IndexMap<String, String>, &mut IndexMap<String, Value>)> {
        match self.arena.get_mut(node) {
            Some(NodeData {
                content:
                    Content::Element {
                        attributes,
                        properties,
                        ..
                    },
                ..
            }) => Some((attributes, properties)),
            _ => None,
        }
    }

    /// Free a detached subtree for good. Handles into it become invalid.
    pub fn discard(&mut self, node: NodeId) {
        self.remove(node);
        let mut pending = vec![node];
        while let Some(node) = pending.pop() {
            if let Some(data) = self.arena.free(node) {
                pending.extend(data.children);
                if let Content::Element {
                    template_content, ..
                } = data.content
                {
                    pending.extend(template_content);
                }
            }
        }
    }
}

fn element_content(tag: &str) -> Content {
    Content::Element {
        tag: tag.to_ascii_lowercase(),
        attributes: IndexMap::new(),
        properties: IndexMap::new(),
        template_content: Vec::new(),
    }
}

fn write_attribute(output: &mut String, name: &str, value: &str) {
    output.push(' ');
    output.push_str(name);
    if !value.is_empty() {
        output.push_str("=\"");
        output.push_str(&escape_attribute(value));
        output.push('"');
    }
}

impl Document for MemoryDocument {
    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.arena.get(node).map(|data| match data.content {
            Content::Element { .. } => NodeKind::Element,
            Content::Text(_) => NodeKind::Text,
        })
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        match &self.arena.get(node)?.content {
            Content::Element { tag, .. } => Some(tag.clone()),
            Content::Text(_) => None,
        }
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.arena.alloc(NodeData::new(element_content(tag)))
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.arena.alloc(NodeData::new(Content::Text(text.to_owned())))
    }

    fn clone_node(&mut self, node: NodeId) -> NodeId {
        let Some(data) = self.arena.get(node) else {
            return node;
        };
        let mut content = data.content.clone();
        let children = data.children.clone();
        if let Content::Element {
            template_content, ..
        } = &mut content
        {
            let originals = std::mem::take(template_content);
            *template_content = originals
                .into_iter()
                .map(|child| self.clone_node(child))
                .collect();
        }
        let copy = self.arena.alloc(NodeData::new(content));
        for child in children {
            let child_copy = self.clone_node(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    fn remove(&mut self, node: NodeId) {
        let Some(parent) = self.arena.get(node).and_then(|data| data.parent) else {
            return;
        };
        if let Some(data) = self.arena.get_mut(parent) {
            data.children.retain(|child| *child != node);
        }
        if let Some(data) = self.arena.get_mut(node) {
            data.parent = None;
        }
    }

    fn insert_after(&mut self, parent: NodeId, node: NodeId, anchor: Option<NodeId>) {
        // Detach first, the anchor index may shift when `node` is a sibling
        self.remove(node);
        let index = anchor
            .and_then(|anchor| {
                self.arena
                    .get(parent)?
                    .children
                    .iter()
                    .position(|child| *child == anchor)
            })
            .map_or(0, |position| position + 1);
        self.insert(parent, node, index);
    }

    fn append_child(&mut self, parent: NodeId, node: NodeId) {
        self.insert(parent, node, usize::MAX);
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.arena.get(node)?.parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.arena
            .get(node)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    fn previous_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(node)?);
        let position = siblings.iter().position(|sibling| *sibling == node)?;
        siblings[..position]
            .iter()
            .rev()
            .find(|sibling| self.kind(**sibling) == Some(NodeKind::Element))
            .copied()
    }

    fn next_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(node)?);
        let position = siblings.iter().position(|sibling| *sibling == node)?;
        siblings[position + 1..]
            .iter()
            .find(|sibling| self.kind(**sibling) == Some(NodeKind::Element))
            .copied()
    }

    fn is_connected(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    fn text(&self, node: NodeId) -> Option<String> {
        match &self.arena.get(node)?.content {
            Content::Text(text) => Some(text.clone()),
            Content::Element { .. } => Some(
                self.children(node)
                    .into_iter()
                    .filter_map(|child| self.text(child))
                    .collect(),
            ),
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        match self.arena.get_mut(node).map(|data| &mut data.content) {
            Some(Content::Text(existing)) => {
                existing.clear();
                existing.push_str(text);
            }
            Some(Content::Element { .. }) => {
                for child in self.children(node) {
                    self.remove(child);
                }
                let child = self.create_text(text);
                self.append_child(node, child);
            }
            None => {}
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        match &self.arena.get(node)?.content {
            Content::Element { attributes, .. } => attributes.get(name).cloned(),
            Content::Text(_) => None,
        }
    }

    fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        match self.arena.get(node).map(|data| &data.content) {
            Some(Content::Element { attributes, .. }) => attributes
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let form_control = is_form_control(self, node);
        let Some((attributes, properties)) = self.element_mut(node) else {
            return;
        };
        attributes.insert(name.to_owned(), value.to_owned());
        // Attributes seed the live state of form controls
        if form_control {
            match name {
                "value" => {
                    properties.insert(name.to_owned(), Value::from(value));
                }
                "checked" => {
                    properties.insert(name.to_owned(), Value::Bool(true));
                }
                _ => {}
            }
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some((attributes, _)) = self.element_mut(node) {
            attributes.shift_remove(name);
        }
    }

    fn property(&self, node: NodeId, name: &str) -> Value {
        let stored = match self.arena.get(node).map(|data| &data.content) {
            Some(Content::Element { properties, .. }) => properties.get(name).cloned(),
            _ => None,
        };
        match (stored, name) {
            (Some(value), _) => value,
            (None, "value") if is_form_control(self, node) => Value::from(""),
            (None, "checked") if is_form_control(self, node) => Value::Bool(false),
            (None, _) => Value::Undefined,
        }
    }

    fn set_property(&mut self, node: NodeId, name: &str, value: Value) {
        let value = match name {
            "checked" => Value::Bool(value.is_truthy()),
            "value" => Value::from(value.to_string()),
            _ => value,
        };
        if let Some((_, properties)) = self.element_mut(node) {
            properties.insert(name.to_owned(), value);
        }
    }

    fn add_listener(&mut self, node: NodeId, event: &str, listener: Listener) {
        if let Some(data) = self.arena.get_mut(node) {
            data.listeners.push((event.to_owned(), listener));
        }
    }

    fn listeners(&self, node: NodeId, event: &str) -> Vec<Listener> {
        self.arena
            .get(node)
            .map(|data| {
                data.listeners
                    .iter()
                    .filter(|(name, _)| name == event)
                    .map(|(_, listener)| listener.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn template(&mut self, id: &str) -> Option<Vec<NodeId>> {
        let template = self
            .elements_by_tag("template")
            .into_iter()
            .find(|node| self.attribute(*node, "id").as_deref() == Some(id))?;
        let content = match &self.arena.get(template)?.content {
            Content::Element {
                template_content, ..
            } => template_content.clone(),
            Content::Text(_) => return None,
        };
        Some(content.into_iter().map(|node| self.clone_node(node)).collect())
    }

    fn parse_fragment(&mut self, markup: &str) -> Result<Vec<NodeId>> {
        let nodes = markup::parse(markup)?;
        Ok(nodes.into_iter().map(|node| self.build(node)).collect())
    }

    fn discard(&mut self, node: NodeId) {
        MemoryDocument::discard(self, node);
    }
}
