use std::rc::Rc;

use super::attribute::report;
use super::event::request_render;
use super::{Directive, DirectiveContext};
use crate::document::{Event, Listener, NodeId, is_form_control};
use crate::error::{Error, Result};
use crate::registry::Binding;
use crate::state::State;

/// `v-model="field"`: two-way binding between a form control and a field of
/// the scope. Checkboxes bind `checked`, every other control binds `value`.
pub(super) struct Model;

impl Directive for Model {
    fn setup(&self, context: &DirectiveContext<'_>) -> Result<()> {
        let element = context.element;
        let field = context.value.trim().to_owned();
        if !context.scope.has(&field) {
            let error = Error::MissingProperty { name: field };
            report(context.scope, element, context.name, context.value, &error);
            return Err(error);
        }

        let document = context.scope.document();
        let property = {
            let document = document.borrow();
            if !is_form_control(&*document, element) {
                return Ok(());
            }
            match document.attribute(element, "type").as_deref() {
                Some("checkbox") => "checked",
                _ => "value",
            }
        };

        let scope = context.scope.downgrade();
        let listener_field = field.clone();
        let listener: Listener = Rc::new(move |_: &Event| {
            let Some(scope) = scope.upgrade() else {
                return Ok(());
            };
            let value = scope.document().borrow().property(element, property);
            scope.set(&listener_field, value)?;
            request_render(&scope)
        });
        document.borrow_mut().add_listener(element, "input", listener);

        let record_field = field.clone();
        context.scope.register(Binding::structural(context.name, move |scope| {
            push_to_control(scope, element, &record_field, property);
            Ok(())
        }));
        push_to_control(context.scope, element, &field, property);
        Ok(())
    }
}

fn push_to_control(scope: &State, element: NodeId, field: &str, property: &str) {
    let value = scope.get(field);
    scope
        .document()
        .borrow_mut()
        .set_property(element, property, value);
}
