//! Observed state.
//!
//! A [`State`] wraps a map or list. Reading a nested map or list through it
//! wraps that value in place, so later reads hand out the same wrapper.
//! Writing a field that is not a meta field notifies the root scope, which
//! runs a render pass unless one is already in progress.
//!
//! Only a root owns a binding registry. Descendants keep a weak link to it;
//! a wrapper outliving its root silently stops notifying.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::component::ComponentSource;
use crate::config::Config;
use crate::directives::{Directive, DirectiveTable, FunctionDirective, Placements};
use crate::document::{DocumentRef, NodeId};
use crate::error::{Error, Result};
use crate::expression::Ambient;
use crate::registry::{self, Binding, Registry};
use crate::value::{Container, MAX_LENGTH, Value, bounded_count};

/// Everything the scopes created by one engine have in common.
pub(crate) struct Shared {
    pub(crate) config: Config,
    pub(crate) document: DocumentRef,
    pub(crate) ambient: Ambient,
    pub(crate) directives: DirectiveTable,
    pub(crate) components: Rc<dyn ComponentSource>,
    pub(crate) placements: Placements,
}

pub(crate) struct RootMeta {
    pub(crate) element: NodeId,
    pub(crate) directives: DirectiveTable,
    pub(crate) registry: RefCell<Registry>,
    pub(crate) depth: Cell<usize>,
    pub(crate) passes: Cell<u64>,
}

enum Link {
    Root(RootMeta),
    Descendant(Weak<StateInner>),
}

struct StateInner {
    container: Container,
    shared: Rc<Shared>,
    link: Link,
}

#[derive(Clone)]
pub struct State(Rc<StateInner>);

/// Non-owning handle, held by listeners so the document never keeps a scope
/// alive.
#[derive(Clone)]
pub struct WeakState(Weak<StateInner>);

impl WeakState {
    pub fn upgrade(&self) -> Option<State> {
        self.0.upgrade().map(State)
    }
}

impl State {
    /// Create a scope root over `node`, bound to `element`.
    ///
    /// An existing root is returned unchanged. Directive handlers stored as
    /// functions under the `directives` meta field of `node` override the
    /// shared table.
    pub(crate) fn new_root(node: Value, element: NodeId, shared: Rc<Shared>) -> Result<Self> {
        let container = match node {
            Value::State(state) if state.is_root() => return Ok(state),
            Value::State(_) => {
                return Err(Error::structural("a nested state cannot become a scope root"));
            }
            other => other.container().ok_or_else(|| {
                Error::structural(format!(
                    "state must be a map or a list, found {}",
                    other.type_of()
                ))
            })?,
        };

        let mut overrides = DirectiveTable::new();
        if let Container::Map(map) = &container {
            let key = format!("{}directives", shared.config.meta_marker);
            if let Some(Value::Map(handlers)) = map.borrow().get(&key) {
                for (name, handler) in handlers.borrow().iter() {
                    if let Value::Function(function) = handler {
                        overrides.insert(name, Rc::new(FunctionDirective::new(function.clone())));
                    }
                }
            }
        }
        let mut directives = shared.directives.clone();
        directives.merge(&overrides);

        Ok(Self(Rc::new(StateInner {
            container,
            shared,
            link: Link::Root(RootMeta {
                element,
                directives,
                registry: RefCell::default(),
                depth: Cell::new(0),
                passes: Cell::new(0),
            }),
        })))
    }

    /// Whether `value` is already observed.
    pub fn is_observed(value: &Value) -> bool {
        matches!(value, Value::State(_))
    }

    pub fn downgrade(&self) -> WeakState {
        WeakState(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &State) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn container(&self) -> &Container {
        &self.0.container
    }

    pub fn is_list(&self) -> bool {
        matches!(self.0.container, Container::List(_))
    }

    pub fn is_root(&self) -> bool {
        matches!(self.0.link, Link::Root(_))
    }

    /// The scope root this state notifies, `None` once the root is gone.
    pub fn root(&self) -> Option<State> {
        match &self.0.link {
            Link::Root(_) => Some(self.clone()),
            Link::Descendant(root) => root.upgrade().map(State),
        }
    }

    pub(crate) fn meta(&self) -> Option<&RootMeta> {
        match &self.0.link {
            Link::Root(meta) => Some(meta),
            Link::Descendant(_) => None,
        }
    }

    pub(crate) fn shared(&self) -> &Rc<Shared> {
        &self.0.shared
    }

    pub fn config(&self) -> &Config {
        &self.0.shared.config
    }

    pub fn ambient(&self) -> &Ambient {
        &self.0.shared.ambient
    }

    pub fn document(&self) -> DocumentRef {
        self.0.shared.document.clone()
    }

    /// Element the root of this state is bound to.
    pub fn element(&self) -> Option<NodeId> {
        self.root()
            .and_then(|root| root.meta().map(|meta| meta.element))
    }

    /// Wrap a map or list so it notifies the root of `self`. Anything else,
    /// wrappers included, comes back unchanged.
    pub fn wrap(&self, node: Value) -> Value {
        let container = match &node {
            Value::Map(map) => Container::Map(map.clone()),
            Value::List(list) => Container::List(list.clone()),
            _ => return node,
        };
        let root = match &self.0.link {
            Link::Root(_) => Rc::downgrade(&self.0),
            Link::Descendant(root) => root.clone(),
        };
        Value::State(Self(Rc::new(StateInner {
            container,
            shared: self.0.shared.clone(),
            link: Link::Descendant(root),
        })))
    }

    fn read_raw(&self, key: &str) -> Value {
        match &self.0.container {
            Container::Map(map) => map.borrow().get(key).cloned().unwrap_or_default(),
            Container::List(list) => {
                let list = list.borrow();
                match key {
                    "length" => Value::from(list.len()),
                    key => key
                        .parse::<usize>()
                        .ok()
                        .and_then(|index| list.get(index).cloned())
                        .unwrap_or_default(),
                }
            }
        }
    }

    fn write_raw(&self, key: &str, value: Value) -> Result<()> {
        match &self.0.container {
            Container::Map(map) => {
                map.borrow_mut().insert(key.to_owned(), value);
            }
            Container::List(list) => {
                let mut list = list.borrow_mut();
                if key == "length" {
                    let Some(length) = bounded_count(value.to_number()) else {
                        return Err(Error::type_error(format!("invalid list length {value}")));
                    };
                    list.resize(length, Value::Undefined);
                    return Ok(());
                }
                let index = key.parse::<usize>().map_err(|_| {
                    Error::type_error(format!("cannot set field `{key}` of a list"))
                })?;
                if index >= MAX_LENGTH {
                    return Err(Error::type_error(format!("invalid list index {key}")));
                }
                if index >= list.len() {
                    list.resize(index + 1, Value::Undefined);
                }
                list[index] = value;
            }
        }
        Ok(())
    }

    /// Whether `key` is an own field (or index) of the wrapped value.
    pub fn has(&self, key: &str) -> bool {
        match &self.0.container {
            Container::Map(map) => map.borrow().contains_key(key),
            Container::List(list) => {
                key == "length"
                    || key
                        .parse::<usize>()
                        .is_ok_and(|index| index < list.borrow().len())
            }
        }
    }

    /// Read a field. Nested maps and lists come back wrapped, and the wrapper
    /// replaces the plain value so repeated reads agree. Meta fields are
    /// returned as stored.
    pub fn get(&self, key: &str) -> Value {
        let value = self.read_raw(key);
        if self.config().is_meta(key) || !matches!(value, Value::Map(_) | Value::List(_)) {
            return value;
        }
        let wrapped = self.wrap(value);
        // The key holds an aggregate, so it is a valid map key or list index
        let _ = self.write_raw(key, wrapped.clone());
        wrapped
    }

    /// Store without notifying anyone.
    pub(crate) fn store(&self, key: &str, value: Value) -> Result<()> {
        self.write_raw(key, value)
    }

    /// Write a field. Unless it is a meta field the root is notified, which
    /// renders when no pass is running yet.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.write_raw(key, value.into())?;
        if self.config().is_meta(key) {
            return Ok(());
        }
        tracing::trace!(key, "state write");
        self.notify()
    }

    fn notify(&self) -> Result<()> {
        match self.root() {
            Some(root) if root.render_depth() == 0 => root.render(),
            _ => Ok(()),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        match &self.0.container {
            Container::Map(map) => map.borrow().keys().cloned().collect(),
            Container::List(list) => (0..list.borrow().len()).map(|index| index.to_string()).collect(),
        }
    }

    pub fn entries(&self) -> Vec<(String, Value)> {
        self.keys()
            .into_iter()
            .map(|key| {
                let value = self.get(&key);
                (key, value)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        match &self.0.container {
            Container::Map(map) => map.borrow().len(),
            Container::List(list) => list.borrow().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// List items, or map values, read through this wrapper.
    pub fn items(&self) -> Vec<Value> {
        self.keys().iter().map(|key| self.get(key)).collect()
    }

    pub fn push(&self, values: Vec<Value>) -> Result<usize> {
        let length = {
            let list = self.list()?;
            let mut list = list.borrow_mut();
            list.extend(values);
            list.len()
        };
        self.notify()?;
        Ok(length)
    }

    pub fn pop(&self) -> Result<Value> {
        let popped = self.list()?.borrow_mut().pop().unwrap_or_default();
        self.notify()?;
        Ok(popped)
    }

    /// Remove `count` items at `start` and insert `inserted` in their place.
    pub fn splice(&self, start: usize, count: usize, inserted: Vec<Value>) -> Result<Vec<Value>> {
        let removed = {
            let list = self.list()?;
            let mut list = list.borrow_mut();
            let start = start.min(list.len());
            let end = start.saturating_add(count).min(list.len());
            list.splice(start..end, inserted).collect()
        };
        self.notify()?;
        Ok(removed)
    }

    fn list(&self) -> Result<&crate::value::ListRef> {
        match &self.0.container {
            Container::List(list) => Ok(list),
            Container::Map(_) => Err(Error::type_error("not a list")),
        }
    }

    /// Plain, unobserved copy of the wrapped value.
    pub fn snapshot(&self) -> Value {
        self.0.container.clone().into_value()
    }

    /// Run a render pass on the root regardless of the nesting depth.
    pub fn render(&self) -> Result<()> {
        match self.root() {
            Some(root) => registry::render_pass(&root),
            None => Ok(()),
        }
    }

    pub fn render_depth(&self) -> usize {
        self.root()
            .and_then(|root| root.meta().map(|meta| meta.depth.get()))
            .unwrap_or(0)
    }

    /// Number of completed render passes of the root.
    pub fn render_passes(&self) -> u64 {
        self.root()
            .and_then(|root| root.meta().map(|meta| meta.passes.get()))
            .unwrap_or(0)
    }

    /// Live bindings in the root's registry.
    pub fn binding_count(&self) -> usize {
        self.root()
            .and_then(|root| root.meta().map(|meta| meta.registry.borrow().len()))
            .unwrap_or(0)
    }

    pub(crate) fn register(&self, binding: Binding) {
        let Some(root) = self.root() else {
            return;
        };
        if let Some(meta) = root.meta() {
            meta.registry.borrow_mut().push(binding);
        }
    }

    /// Drop the bindings owned by `owner`. Outside a pass the registry is
    /// compacted right away, inside it waits for the outermost pass to end.
    pub(crate) fn unregister_owned_by(&self, owner: NodeId) -> usize {
        let Some(root) = self.root() else {
            return 0;
        };
        let Some(meta) = root.meta() else {
            return 0;
        };
        let mut registry = meta.registry.borrow_mut();
        let removed = registry.remove_owned_by(owner);
        if meta.depth.get() == 0 {
            registry.compact();
        }
        removed
    }

    pub(crate) fn directive(&self, name: &str) -> Option<Rc<dyn Directive>> {
        let root = self.root()?;
        root.meta()?.directives.resolve(name)
    }

    pub(crate) fn components(&self) -> Rc<dyn ComponentSource> {
        self.0.shared.components.clone()
    }
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.snapshot())
    }
}
