//! `v-mount="name"`: instantiate a component into an element.
//!
//! The component gets its own scope root over `{$parent, $root}`. Every `:prop`
//! on the element is evaluated in the enclosing scope and refreshed from the
//! enclosing registry, followed by a record rendering the component, so the
//! component re-renders whenever its host does.

use std::rc::Rc;

use super::attribute::report;
use crate::component::Component;
use crate::diagnostics;
use crate::document::NodeId;
use crate::error::{Error, Result};
use crate::expression::{Code, Env};
use crate::registry::Binding;
use crate::state::State;
use crate::value::{Container, Value};

pub(crate) const MOUNT_ATTRIBUTE: &str = "v-mount";

/// Create the component scope for `element` and fill the element with the
/// component's markup. Returns the component scope; the caller sets the new
/// children up against it.
pub(crate) fn mount(element: NodeId, name: &str, enclosing: &State) -> Result<State> {
    let config = enclosing.config();
    let marker = config.meta_marker;
    let host = enclosing.element().map_or(Value::Null, Value::Node);
    let target = Value::map([
        (format!("{marker}parent"), Value::Node(element)),
        (format!("{marker}root"), host),
    ]);
    let component = State::new_root(target, element, enclosing.shared().clone())?;

    pass_props(element, enclosing, &component)?;
    let rendered = component.clone();
    enclosing.register(Binding::structural(MOUNT_ATTRIBUTE, move |_| rendered.render()));

    let document = enclosing.document();
    let nodes = match resolve(enclosing, name) {
        Some(definition) => {
            for (field, value) in definition.fields {
                component.store(&field, value)?;
            }
            let parsed = document.borrow_mut().parse_fragment(&definition.markup);
            parsed.inspect_err(|error| report(enclosing, element, MOUNT_ATTRIBUTE, name, error))?
        }
        None => {
            let template = document.borrow_mut().template(name);
            template.ok_or_else(|| {
                let error = Error::structural(format!("no component or template named `{name}`"));
                report(enclosing, element, MOUNT_ATTRIBUTE, name, &error);
                error
            })?
        }
    };

    let mut script = None;
    {
        let mut document = document.borrow_mut();
        for node in nodes {
            if document.tag_name(node).as_deref() == Some("script") {
                script = document.text(node);
                document.discard(node);
            } else {
                document.append_child(element, node);
            }
        }
    }

    if let Some(script) = script {
        let run = Code::compile(&script).and_then(|code| code.evaluate(&Rc::new(Env::new(&component))));
        if let Err(error) = run {
            diagnostics::problematic(&*document.borrow(), element, None, &error);
            return Err(error);
        }
    }
    tracing::debug!(component = name, "mounted");
    Ok(component)
}

/// Move every `:prop` of the element onto the component scope.
fn pass_props(element: NodeId, enclosing: &State, component: &State) -> Result<()> {
    let document = enclosing.document();
    let attributes = document.borrow().attributes(element);
    for (attribute, source) in attributes {
        let Some(prop) = attribute.strip_prefix(':').filter(|prop| !prop.is_empty()) else {
            continue;
        };
        let code = Code::compile(&source)
            .inspect_err(|error| report(enclosing, element, &attribute, &source, error))?;
        let evaluate = {
            let attribute = attribute.clone();
            move |scope: &State| {
                code.evaluate(&Rc::new(Env::new(scope)))
                    .inspect_err(|error| report(scope, element, &attribute, code.source(), error))
            }
        };
        component.store(prop, evaluate(enclosing)?)?;

        let prop = prop.to_owned();
        let target = component.clone();
        enclosing.register(Binding::structural(attribute.as_str(), move |scope| {
            target.store(&prop, evaluate(scope)?)
        }));
        document.borrow_mut().remove_attribute(element, &attribute);
    }
    Ok(())
}

/// Components registered in the enclosing state under the `components` meta
/// field come first, then the engine's component source.
fn resolve(enclosing: &State, name: &str) -> Option<Component> {
    let marker = enclosing.config().meta_marker;
    let registered = enclosing.get(&format!("{marker}components"));
    if let Some(Container::Map(components)) = registered.container() {
        let entry = components.borrow().get(name).cloned();
        if let Some(Container::Map(entry)) = entry.and_then(|entry| entry.container()) {
            let markup_key = format!("{marker}html");
            let entry = entry.borrow();
            if let Some(markup) = entry.get(&markup_key).and_then(Value::as_text) {
                let mut component = Component::new(markup);
                for (field, value) in entry.iter() {
                    if *field != markup_key {
                        component.fields.push((field.clone(), value.clone()));
                    }
                }
                return Some(component);
            }
        }
    }
    enclosing.components().component(name)
}
