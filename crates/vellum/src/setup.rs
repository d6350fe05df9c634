//! Walking a subtree once and wiring it to a scope.
//!
//! Attributes go to the directive table, `${...}` text becomes text bindings,
//! conditional elements become chain links and everything else is set up
//! recursively. [`Engine::bootstrap`] is the entry point.

use indexmap::IndexMap;
use std::rc::Rc;

use crate::component::{ComponentSource, Components};
use crate::config::Config;
use crate::diagnostics;
use crate::directives::{
    self, ChainLink, ChainSlots, Directive, DirectiveContext, DirectiveTable, MOUNT_ATTRIBUTE,
    MOUNT_HOOK, Placements, is_conditional,
};
use crate::document::{self, DocumentRef, Event, Listener, NodeId, NodeKind};
use crate::error::{Error, Result};
use crate::expression::{Ambient, Template};
use crate::registry::Binding;
use crate::state::{Shared, State};
use crate::value::Value;

const CHAIN_ATTRIBUTES: [&str; 3] = ["v-if", "v-else-if", "v-else"];

/// Set `element` up against `scope` and return the scope its children were
/// bound to: `scope` itself, or the component scope for `v-mount`.
///
/// `parent` is `None` only for the bootstrap element. `anchors` are the element
/// siblings the walker met before `element`.
pub(crate) fn setup(
    element: NodeId,
    scope: &State,
    parent: Option<NodeId>,
    anchors: &[NodeId],
) -> Result<State> {
    let document = scope.document();
    let mut children_scope = scope.clone();

    let mount_name = document.borrow().attribute(element, MOUNT_ATTRIBUTE);
    let slotted = match mount_name {
        Some(name) => {
            // Original children keep the enclosing scope and become slot content
            let children = document.borrow().children(element);
            let slotted = children
                .iter()
                .copied()
                .filter(|child| document.borrow().kind(*child) == Some(NodeKind::Element))
                .collect::<Vec<_>>();
            for child in &slotted {
                setup(*child, scope, Some(element), &[])?;
            }
            for child in children {
                document.borrow_mut().remove(child);
            }
            children_scope = directives::mount(element, &name, scope)?;
            document.borrow_mut().remove_attribute(element, MOUNT_ATTRIBUTE);
            Some(slotted)
        }
        None => None,
    };

    let was_connected = document.borrow().is_connected(element);
    let attributes = document.borrow().attributes(element);
    for (name, value) in &attributes {
        // A directive such as `v-for` took the element out, the rest is its business
        if was_connected && !document.borrow().is_connected(element) {
            break;
        }
        if CHAIN_ATTRIBUTES.contains(&name.as_str()) {
            continue;
        }
        match scope.directive(name) {
            Some(directive) => directive.setup(&DirectiveContext {
                element,
                name,
                value,
                scope,
                parent,
                anchors,
            })?,
            None => directives::interpolate_attribute(scope, element, name, value)?,
        }
    }

    let hook = parent.is_none().then(|| scope.directive(MOUNT_HOOK)).flatten();
    if let Some(hook) = hook {
        hook.setup(&DirectiveContext {
            element,
            name: MOUNT_HOOK,
            value: "",
            scope,
            parent,
            anchors,
        })?;
    }

    if !was_connected || document.borrow().is_connected(element) {
        walk(element, &children_scope)?;
    }

    if children_scope.element() == Some(element) {
        let weak = children_scope.downgrade();
        let listener: Listener = Rc::new(move |_: &Event| match weak.upgrade() {
            Some(scope) => scope.render(),
            None => Ok(()),
        });
        let signal = scope.config().render_signal.clone();
        document.borrow_mut().add_listener(element, &signal, listener);
    }

    if parent.is_none() {
        let signal = scope.config().mount_signal.clone();
        document::dispatch(&document, Event::new(signal, element))?;
    }

    if let Some(slotted) = slotted {
        distribute_slots(scope, element, &slotted)?;
    }
    Ok(children_scope)
}

fn walk(parent: NodeId, scope: &State) -> Result<()> {
    let document = scope.document();
    let children = document.borrow().children(parent);
    let mut slots = ChainSlots::default();
    let mut anchors = Vec::new();

    for node in children {
        let kind = document.borrow().kind(node);
        match kind {
            Some(NodeKind::Text) => bind_text(scope, node)?,
            Some(NodeKind::Element) => {
                let (script, conditional) = {
                    let document = document.borrow();
                    (
                        document.tag_name(node).as_deref() == Some("script"),
                        is_conditional(&*document, node),
                    )
                };
                if !script {
                    if conditional {
                        ChainLink::new(scope, node, parent, &anchors, &mut slots)?.register(scope);
                        setup(node, scope, Some(parent), &anchors)?;
                        document.borrow_mut().remove(node);
                    } else {
                        setup(node, scope, Some(parent), &anchors)?;
                    }
                }
                anchors.push(node);
            }
            None => {}
        }
    }
    Ok(())
}

fn bind_text(scope: &State, node: NodeId) -> Result<()> {
    let document = scope.document();
    let text = document.borrow().text(node).unwrap_or_default();
    let template = Template::parse(&text).inspect_err(|error| {
        diagnostics::problematic(&*document.borrow(), node, None, error);
    })?;
    if !template.is_dynamic() {
        return Ok(());
    }
    scope.register(Binding::text("text", template, Value::Null, move |text| {
        document.borrow_mut().set_text(node, text);
        Ok(())
    }));
    Ok(())
}

/// Hand the original children of a `v-mount` element to the `<slot>`s of the
/// component, matching slot names against child tag names.
fn distribute_slots(scope: &State, element: NodeId, slotted: &[NodeId]) -> Result<()> {
    let document = scope.document();
    let mut by_name = IndexMap::new();
    for child in slotted {
        let name = document.borrow().tag_name(*child).unwrap_or_default();
        if by_name.insert(name.clone(), *child).is_some() {
            let error = Error::structural(format!("two slots named `{name}`"));
            diagnostics::problematic(&*document.borrow(), *child, None, &error);
            return Err(error);
        }
    }

    let mut document = document.borrow_mut();
    let mut slots = Vec::new();
    collect_slots(&*document, element, &mut slots);
    for slot in slots {
        let name = document
            .attribute(slot, "name")
            .unwrap_or_else(|| "default".to_owned());
        let Some(child) = by_name.get(&name) else {
            continue;
        };
        for previous in document.children(slot) {
            document.remove(previous);
        }
        if let Some(content) = document.children(*child).first().copied() {
            document.append_child(slot, content);
        }
    }
    Ok(())
}

fn collect_slots(document: &dyn document::Document, node: NodeId, slots: &mut Vec<NodeId>) {
    for child in document.children(node) {
        if document.tag_name(child).as_deref() == Some("slot") {
            slots.push(child);
        }
        collect_slots(document, child, slots);
    }
}

/// Builder for everything scopes share: the document, configuration,
/// directives, ambient globals and components.
pub struct Engine {
    document: DocumentRef,
    config: Config,
    directives: DirectiveTable,
    globals: Vec<(String, Value)>,
    components: Rc<dyn ComponentSource>,
}

impl Engine {
    pub fn new(document: DocumentRef) -> Self {
        Self {
            document,
            config: Config::default(),
            directives: DirectiveTable::builtin(),
            globals: Vec::new(),
            components: Rc::new(Components::new()),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Add or replace the handler of an exact attribute name. `$` names the
    /// hook run on the bootstrap element.
    pub fn directive(mut self, name: impl Into<String>, directive: impl Directive + 'static) -> Self {
        let name = name.into();
        if self.directives.contains(&name) {
            tracing::debug!(name = %name, "directive replaced");
        }
        self.directives.insert(name, Rc::new(directive));
        self
    }

    /// Handle every attribute starting with `prefix` that no exact name or
    /// longer prefix claims.
    pub fn prefix_directive(
        mut self,
        prefix: impl Into<String>,
        directive: impl Directive + 'static,
    ) -> Self {
        self.directives.insert_prefix(prefix, Rc::new(directive));
        self
    }

    /// Make `value` visible to every expression as `name`.
    pub fn global(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.globals.push((name.into(), value.into()));
        self
    }

    pub fn components(mut self, components: impl ComponentSource + 'static) -> Self {
        self.components = Rc::new(components);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn document(&self) -> &DocumentRef {
        &self.document
    }

    /// Bind `state` to `element`: set the subtree up, then run the first
    /// render pass. Returns the scope the element's children are bound to.
    pub fn bootstrap(&self, element: NodeId, state: impl Into<Value>) -> Result<State> {
        self.config.validate()?;
        let mut ambient = Ambient::standard(&self.config);
        for (name, value) in &self.globals {
            if !ambient.insert(name.clone(), value.clone()) {
                tracing::warn!(name, "global cannot be referenced and was skipped");
            }
        }
        let shared = Rc::new(Shared {
            config: self.config.clone(),
            document: self.document.clone(),
            ambient,
            directives: self.directives.clone(),
            components: self.components.clone(),
            placements: Placements::default(),
        });

        let root = State::new_root(state.into(), element, shared)?;
        let scope = setup(element, &root, None, &[])?;
        tracing::debug!(bindings = scope.binding_count(), "setup complete");
        scope.render()?;
        Ok(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::dom::MemoryDocument;
    use serde_json::json;

    fn bootstrap(markup: &str, state: serde_json::Value) -> (Rc<std::cell::RefCell<MemoryDocument>>, NodeId, State) {
        let document = MemoryDocument::parse(markup).unwrap().into_shared();
        let app = document.borrow().element_by_id("app").unwrap();
        let state = Engine::new(document.clone())
            .bootstrap(app, Value::from_json(&state))
            .unwrap();
        (document, app, state)
    }

    #[test]
    fn static_text_is_not_registered() {
        let (document, app, state) = bootstrap(
            r#"<div id="app"><p>plain</p><p title="static">${_.name}</p></div>"#,
            json!({ "name": "Ada" }),
        );
        assert_eq!(state.binding_count(), 1);
        assert_eq!(
            document.borrow().inner_markup(app),
            r#"<p>plain</p><p title="static">Ada</p>"#
        );
    }

    #[test]
    fn script_elements_are_not_walked() {
        let (document, app, state) = bootstrap(
            r#"<div id="app"><script>${_.name}</script></div>"#,
            json!({ "name": "Ada" }),
        );
        assert_eq!(state.binding_count(), 0);
        assert_eq!(
            document.borrow().inner_markup(app),
            "<script>${_.name}</script>"
        );
    }

    #[test]
    fn mount_signal_fires_before_the_first_render() {
        let document = MemoryDocument::parse(r#"<div id="app">${_.n}</div>"#)
            .unwrap()
            .into_shared();
        let app = document.borrow().element_by_id("app").unwrap();
        let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
        let recorded = seen.clone();
        let listener: Listener = Rc::new(move |event: &Event| {
            recorded.borrow_mut().push(event.name.clone());
            Ok(())
        });
        document.borrow_mut().add_listener(app, "mount", listener);

        let state = Engine::new(document.clone())
            .bootstrap(app, Value::from_json(&json!({ "n": 1 })))
            .unwrap();
        assert_eq!(*seen.borrow(), ["mount"]);
        assert_eq!(state.render_passes(), 1);
        assert_eq!(document.borrow().inner_markup(app), "1");
    }
}
