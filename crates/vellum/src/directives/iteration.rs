//! `v-for`: one clone of the template element per item, grown and shrunk at
//! the tail.
//!
//! Clones are never reordered. Each clone has its own scope whose item and
//! index are rebound from the current sequence on every pass, so moving items
//! around in the list rebinds clones instead of moving elements.

use std::cell::RefCell;
use std::rc::Rc;

use super::attribute::{compile, report};
use super::{Directive, DirectiveContext, Instances};
use crate::document::NodeId;
use crate::error::{Error, Result};
use crate::expression::{Code, Env};
use crate::registry::Binding;
use crate::setup;
use crate::state::State;
use crate::value::Value;

const ITEM_ATTRIBUTE: &str = "v-for-item";
const INDEX_ATTRIBUTE: &str = "v-for-index";

pub(super) struct Iteration;

struct IterationProps {
    source: Code,
    item_name: String,
    index_name: String,
    template: NodeId,
    parent: NodeId,
    /// Element siblings preceding the template, nearest last. The first clone
    /// goes after the last of them still in the document.
    anchors: Vec<NodeId>,
    instances: Instances,
}

impl Directive for Iteration {
    fn setup(&self, context: &DirectiveContext<'_>) -> Result<()> {
        let element = context.element;
        let source = compile(context)?;
        let config = context.scope.config();
        let document = context.scope.document();

        let (parent, item_name, index_name) = {
            let document = document.borrow();
            let Some(parent) = document.parent(element) else {
                let error = Error::structural("a v-for element needs a parent");
                report(context.scope, element, context.name, context.value, &error);
                return Err(error);
            };
            (
                parent,
                document
                    .attribute(element, ITEM_ATTRIBUTE)
                    .unwrap_or_else(|| config.default_item_name.clone()),
                document
                    .attribute(element, INDEX_ATTRIBUTE)
                    .unwrap_or_else(|| config.default_index_name.clone()),
            )
        };

        {
            let mut document = document.borrow_mut();
            document.remove_attribute(element, context.name);
            document.remove_attribute(element, ITEM_ATTRIBUTE);
            document.remove_attribute(element, INDEX_ATTRIBUTE);
            document.remove(element);
        }

        let props = Rc::new(RefCell::new(IterationProps {
            source,
            item_name,
            index_name,
            template: element,
            parent,
            anchors: context.anchors.to_vec(),
            instances: context.scope.shared().placements.track(element),
        }));
        context.scope.register(Binding::structural(context.name, move |scope| {
            reconcile(scope, &props)
        }));
        Ok(())
    }
}

/// Evaluate the sequence and snapshot its items.
fn sequence(scope: &State, source: &Code, template: NodeId) -> Result<Vec<Value>> {
    let env = Rc::new(Env::new(scope));
    let value = source
        .evaluate(&env)
        .inspect_err(|error| report(scope, template, "v-for", source.source(), error))?;
    value.iterate().ok_or_else(|| {
        let error = match value {
            Value::Number(_) => Error::type_error(format!("cannot iterate {value} times")),
            _ => Error::type_error(format!("{} is not iterable", value.type_of())),
        };
        report(scope, template, "v-for", source.source(), &error);
        error
    })
}

fn reconcile(scope: &State, props: &Rc<RefCell<IterationProps>>) -> Result<()> {
    let (source, template) = {
        let props = props.borrow();
        (props.source.clone(), props.template)
    };
    let items = sequence(scope, &source, template)?;
    let instances = props.borrow().instances.clone();
    let existing = instances.borrow().len();

    for index in existing..items.len() {
        let clone = {
            let props = props.borrow();
            let document = scope.document();
            let mut document = document.borrow_mut();
            let clone = document.clone_node(props.template);
            let last = instances.borrow().last().copied();
            let anchor = last.or_else(|| {
                scope
                    .shared()
                    .placements
                    .after(&*document, props.parent, &props.anchors)
            });
            document.insert_after(props.parent, clone, anchor);
            instances.borrow_mut().push(clone);
            clone
        };
        instantiate(scope, props, clone, index, items[index].clone())?;
    }

    for _ in items.len()..existing {
        let Some(clone) = instances.borrow_mut().pop() else {
            break;
        };
        scope.unregister_owned_by(clone);
        scope.document().borrow_mut().discard(clone);
    }

    if items.len() != existing {
        tracing::debug!(from = existing, to = items.len(), "v-for reconciled");
    }
    Ok(())
}

/// Give a fresh clone its scope, its per-item binding and its own bindings.
fn instantiate(
    scope: &State,
    props: &Rc<RefCell<IterationProps>>,
    clone: NodeId,
    index: usize,
    item: Value,
) -> Result<()> {
    let (source, template, parent, item_name, index_name) = {
        let props = props.borrow();
        (
            props.source.clone(),
            props.template,
            props.parent,
            props.item_name.clone(),
            props.index_name.clone(),
        )
    };

    let mut fields = scope.entries();
    fields.retain(|(key, _)| *key != item_name && *key != index_name);
    fields.push((index_name.clone(), Value::from(index)));
    fields.push((item_name.clone(), item));
    let item_scope = State::new_root(Value::map(fields), clone, scope.shared().clone())?;

    let record_scope = item_scope.clone();
    let rebind = move |scope: &State| -> Result<()> {
        let items = sequence(scope, &source, template)?;
        if let Some(item) = items.get(index) {
            record_scope.store(&item_name, item.clone())?;
        }
        record_scope.store(&index_name, Value::from(index))?;
        record_scope.render()
    };
    let rebind = Rc::new(rebind);
    let record = rebind.clone();
    scope.register(Binding::structural("v-for item", move |scope| record(scope)).owned_by(clone));

    setup::setup(clone, &item_scope, Some(parent), &[])?;
    rebind(scope)
}
