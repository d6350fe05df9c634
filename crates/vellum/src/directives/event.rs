use std::rc::Rc;

use super::attribute::{compile, report};
use super::{Directive, DirectiveContext};
use crate::document::{self, Event, Listener};
use crate::error::Result;
use crate::expression::Env;
use crate::value::Value;

/// `@name="code"`: run the code when the element receives `name`, then ask
/// the scope's element to render.
pub(super) struct On;

impl Directive for On {
    fn setup(&self, context: &DirectiveContext<'_>) -> Result<()> {
        let code = compile(context)?;
        let element = context.element;
        let attribute = context.name.to_owned();
        let scope = context.scope.downgrade();
        let listener: Listener = Rc::new(move |event: &Event| {
            let Some(scope) = scope.upgrade() else {
                return Ok(());
            };
            let env = Rc::new(
                Env::new(&scope)
                    .with_this(Value::Node(element))
                    .with_parameter("event", Value::Event(Rc::new(event.clone()))),
            );
            code.evaluate(&env)
                .inspect_err(|error| report(&scope, element, &attribute, code.source(), error))?;
            request_render(&scope)
        });
        context
            .scope
            .document()
            .borrow_mut()
            .add_listener(element, &context.name[1..], listener);
        Ok(())
    }
}

/// Dispatch the render signal on the scope's element.
pub(super) fn request_render(scope: &crate::state::State) -> Result<()> {
    let Some(target) = scope.element() else {
        return Ok(());
    };
    let document = scope.document();
    let signal = scope.config().render_signal.clone();
    document::dispatch(&document, Event::new(signal, target))
}
