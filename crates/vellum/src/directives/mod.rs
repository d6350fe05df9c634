//! Directive handlers, looked up by attribute name.
//!
//! Each handler sets an element up once and registers whatever bindings it
//! needs on the scope. The table resolves exact names before prefixes, and the
//! longest prefix wins, so `:class` beats `:`.

use indexmap::IndexMap;
use std::rc::Rc;

use crate::document::NodeId;
use crate::error::Result;
use crate::expression::call_function;
use crate::state::State;
use crate::value::{Function, Value};

mod attribute;
pub(crate) use attribute::interpolate_attribute;

mod conditional;
pub(crate) use conditional::{ChainLink, ChainSlots, is_conditional};

mod event;
mod iteration;
mod model;

mod placement;
pub(crate) use placement::{Instances, Placements};

mod mount;
pub(crate) use mount::{MOUNT_ATTRIBUTE, mount};

/// Name of the optional directive run on the bootstrap element after its
/// attributes are processed.
pub const MOUNT_HOOK: &str = "$";

pub struct DirectiveContext<'a> {
    pub element: NodeId,
    /// Attribute name, e.g. `@click`.
    pub name: &'a str,
    pub value: &'a str,
    pub scope: &'a State,
    /// Parent node the walker reached the element from, `None` for the
    /// bootstrap element.
    pub parent: Option<NodeId>,
    /// Element siblings the walker met before the element, nearest last.
    pub anchors: &'a [NodeId],
}

pub trait Directive {
    fn setup(&self, context: &DirectiveContext<'_>) -> Result<()>;
}

#[derive(Clone, Default)]
pub struct DirectiveTable {
    exact: IndexMap<String, Rc<dyn Directive>>,
    prefixes: Vec<(String, Rc<dyn Directive>)>,
}

impl DirectiveTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `:style`, `:class`, `v-model`, `v-for`, and the `:` and `@` prefixes.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.insert(":style", Rc::new(attribute::Style));
        table.insert(":class", Rc::new(attribute::Class));
        table.insert("v-model", Rc::new(model::Model));
        table.insert("v-for", Rc::new(iteration::Iteration));
        table.insert_prefix(":", Rc::new(attribute::Bind));
        table.insert_prefix("@", Rc::new(event::On));
        table
    }

    /// Register a handler for an exact attribute name, replacing any previous
    /// one.
    pub fn insert(&mut self, name: impl Into<String>, directive: Rc<dyn Directive>) {
        self.exact.insert(name.into(), directive);
    }

    pub fn insert_prefix(&mut self, prefix: impl Into<String>, directive: Rc<dyn Directive>) {
        let prefix = prefix.into();
        self.prefixes.retain(|(existing, _)| *existing != prefix);
        self.prefixes.push((prefix, directive));
    }

    pub fn resolve(&self, name: &str) -> Option<Rc<dyn Directive>> {
        if let Some(directive) = self.exact.get(name) {
            return Some(directive.clone());
        }
        self.prefixes
            .iter()
            .filter(|(prefix, _)| name.len() > prefix.len() && name.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, directive)| directive.clone())
    }

    pub fn merge(&mut self, other: &DirectiveTable) {
        for (name, directive) in &other.exact {
            self.insert(name.clone(), directive.clone());
        }
        for (prefix, directive) in &other.prefixes {
            self.insert_prefix(prefix.clone(), directive.clone());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.exact.contains_key(name)
    }
}

/// A directive written in the expression language and stored in the state
/// under the `directives` meta field. It is called as
/// `(element, name, value, scope, parent)`.
pub struct FunctionDirective {
    function: Function,
}

impl FunctionDirective {
    pub fn new(function: Function) -> Self {
        Self { function }
    }
}

impl Directive for FunctionDirective {
    fn setup(&self, context: &DirectiveContext<'_>) -> Result<()> {
        let arguments = vec![
            Value::Node(context.element),
            Value::from(context.name),
            Value::from(context.value),
            Value::State(context.scope.clone()),
            context.parent.map_or(Value::Null, Value::Node),
        ];
        call_function(&self.function, arguments).map(|_| ())
    }
}
