//! Attribute bindings: `:name`, `:style`, `:class` and `${...}` in plain
//! attribute values.

use std::rc::Rc;

use super::{Directive, DirectiveContext};
use crate::diagnostics;
use crate::document::{self, NodeId};
use crate::error::{Error, Result};
use crate::expression::{Code, Env, Template};
use crate::registry::Binding;
use crate::state::State;
use crate::value::{Container, Value};

/// Log a failure of the attribute `name="value"` on `element`.
pub(super) fn report(scope: &State, element: NodeId, name: &str, value: &str, error: &Error) {
    let document = scope.document();
    diagnostics::problematic(&*document.borrow(), element, Some((name, value)), error);
}

pub(super) fn compile(context: &DirectiveContext<'_>) -> Result<Code> {
    Code::compile(context.value).inspect_err(|error| {
        report(context.scope, context.element, context.name, context.value, error)
    })
}

/// Evaluate attribute code with `this` bound to the element.
fn evaluate(scope: &State, element: NodeId, name: &str, code: &Code) -> Result<Value> {
    let env = Rc::new(Env::new(scope).with_this(Value::Node(element)));
    code.evaluate(&env)
        .inspect_err(|error| report(scope, element, name, code.source(), error))
}

/// `:name="code"`, re-evaluated on every pass.
pub(super) struct Bind;

impl Directive for Bind {
    fn setup(&self, context: &DirectiveContext<'_>) -> Result<()> {
        let code = compile(context)?;
        let element = context.element;
        let name = context.name.to_owned();
        context
            .scope
            .register(Binding::structural(context.name, move |scope| {
                let value = evaluate(scope, element, &name, &code)?;
                let document = scope.document();
                document::set_attribute_or_property(
                    &mut *document.borrow_mut(),
                    element,
                    &name[1..],
                    value,
                );
                Ok(())
            }));
        Ok(())
    }
}

/// `:style="{font_size: '2em'}"`, appended to the original inline style.
pub(super) struct Style;

impl Directive for Style {
    fn setup(&self, context: &DirectiveContext<'_>) -> Result<()> {
        let code = compile(context)?;
        let element = context.element;
        let original = context
            .scope
            .document()
            .borrow()
            .attribute(element, "style")
            .unwrap_or_default();
        let dash = context.scope.config().style_dash();
        context
            .scope
            .register(Binding::structural(context.name, move |scope| {
                let value = evaluate(scope, element, ":style", &code)?;
                let Some(Container::Map(map)) = value.container() else {
                    let error = Error::type_error(format!(
                        ":style must evaluate to a map, not {}",
                        value.type_of()
                    ));
                    report(scope, element, ":style", code.source(), &error);
                    return Err(error);
                };
                let declarations = map
                    .borrow()
                    .iter()
                    .map(|(property, value)| {
                        let property = match dash {
                            Some(dash) => property.replace(dash, "-"),
                            None => property.clone(),
                        };
                        format!("{property}:{value}")
                    })
                    .collect::<Vec<_>>();
                let style = join(&original, declarations, ";");
                scope
                    .document()
                    .borrow_mut()
                    .set_attribute(element, "style", &style);
                Ok(())
            }));
        Ok(())
    }
}

/// `:class="['active', kind]"`, appended to the original class list.
pub(super) struct Class;

impl Directive for Class {
    fn setup(&self, context: &DirectiveContext<'_>) -> Result<()> {
        let code = compile(context)?;
        let element = context.element;
        let original = context
            .scope
            .document()
            .borrow()
            .attribute(element, "class")
            .unwrap_or_default();
        context
            .scope
            .register(Binding::structural(context.name, move |scope| {
                let value = evaluate(scope, element, ":class", &code)?;
                let classes = match (&value, value.container()) {
                    (Value::Text(_), _) => Err(Error::type_error(
                        ":class must evaluate to a list of strings, not a string",
                    )),
                    (_, Some(Container::List(list))) => Ok(list
                        .borrow()
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()),
                    _ => Err(Error::type_error(format!(
                        ":class must evaluate to a list of strings, not {}",
                        value.type_of()
                    ))),
                };
                let classes = classes
                    .inspect_err(|error| report(scope, element, ":class", code.source(), error))?;
                let class = join(&original, classes, " ");
                scope
                    .document()
                    .borrow_mut()
                    .set_attribute(element, "class", &class);
                Ok(())
            }));
        Ok(())
    }
}

fn join(original: &str, additions: Vec<String>, separator: &str) -> String {
    let mut parts = Vec::with_capacity(additions.len() + 1);
    if !original.is_empty() {
        parts.push(original.to_owned());
    }
    parts.extend(additions);
    parts.join(separator)
}

/// An attribute no directive claims. Registered only when its value contains
/// a `${...}` substitution, static values are left alone.
pub(crate) fn interpolate_attribute(
    scope: &State,
    element: NodeId,
    name: &str,
    value: &str,
) -> Result<()> {
    let template = Template::parse(value)
        .inspect_err(|error| report(scope, element, name, value, error))?;
    if !template.is_dynamic() {
        return Ok(());
    }
    let document = scope.document();
    let attribute = name.to_owned();
    scope.register(Binding::text(
        name,
        template,
        Value::Node(element),
        move |text| {
            document::set_attribute_or_property(
                &mut *document.borrow_mut(),
                element,
                &attribute,
                Value::from(text),
            );
            Ok(())
        },
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_skips_empty_original() {
        assert_eq!(join("", vec!["a".into(), "b".into()], " "), "a b");
        assert_eq!(join("base", vec!["a".into()], " "), "base a");
        assert_eq!(join("color:red", vec![], ";"), "color:red");
    }
}
