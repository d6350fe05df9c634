//! Bindings a scope root re-applies on every render pass.
//!
//! The registry only ever grows at the end. Removal marks a binding dead and
//! the dead entries are dropped once no pass is running, so a pass can walk
//! the live vector by index while bindings append to or remove from it.

use std::cell::Cell;
use std::rc::Rc;

use crate::document::NodeId;
use crate::error::Result;
use crate::expression::{Env, Template};
use crate::state::State;
use crate::value::Value;

pub(crate) type Apply = Box<dyn Fn(&State) -> Result<()>>;
pub(crate) type ApplyText = Box<dyn Fn(&str) -> Result<()>>;

pub(crate) enum Update {
    /// Render the template and hand the text over.
    Text {
        template: Template,
        this: Value,
        apply: ApplyText,
    },
    /// Arbitrary re-application: conditionals, loops, bound attributes.
    Structural(Apply),
}

pub(crate) struct Binding {
    owner: Option<NodeId>,
    label: String,
    live: Cell<bool>,
    update: Update,
}

impl Binding {
    pub(crate) fn text(
        label: impl Into<String>,
        template: Template,
        this: Value,
        apply: impl Fn(&str) -> Result<()> + 'static,
    ) -> Self {
        Self {
            owner: None,
            label: label.into(),
            live: Cell::new(true),
            update: Update::Text {
                template,
                this,
                apply: Box::new(apply),
            },
        }
    }

    pub(crate) fn structural(
        label: impl Into<String>,
        apply: impl Fn(&State) -> Result<()> + 'static,
    ) -> Self {
        Self {
            owner: None,
            label: label.into(),
            live: Cell::new(true),
            update: Update::Structural(Box::new(apply)),
        }
    }

    /// Tie the binding to a node so it can be removed along with it.
    pub(crate) fn owned_by(mut self, owner: NodeId) -> Self {
        self.owner = Some(owner);
        self
    }

    fn apply(&self, scope: &State) -> Result<()> {
        match &self.update {
            Update::Text {
                template,
                this,
                apply,
            } => {
                let env = Rc::new(Env::new(scope).with_this(this.clone()));
                let text = template.render(&env)?;
                apply(&text)
            }
            Update::Structural(apply) => apply(scope),
        }
    }
}

#[derive(Default)]
pub(crate) struct Registry {
    bindings: Vec<Rc<Binding>>,
    dead: usize,
}

impl Registry {
    pub(crate) fn push(&mut self, binding: Binding) {
        self.bindings.push(Rc::new(binding));
    }

    fn get(&self, index: usize) -> Option<Rc<Binding>> {
        self.bindings.get(index).cloned()
    }

    /// Live bindings.
    pub(crate) fn len(&self) -> usize {
        self.bindings.len() - self.dead
    }

    pub(crate) fn remove_owned_by(&mut self, owner: NodeId) -> usize {
        let mut removed = 0;
        for binding in &self.bindings {
            if binding.owner == Some(owner) && binding.live.get() {
                binding.live.set(false);
                removed += 1;
            }
        }
        self.dead += removed;
        removed
    }

    pub(crate) fn compact(&mut self) {
        if self.dead > 0 {
            self.bindings.retain(|binding| binding.live.get());
            self.dead = 0;
        }
    }
}

/// Apply every live binding of `root` in registration order, including the
/// ones appended while the pass runs. The first failure aborts the pass.
pub(crate) fn render_pass(root: &State) -> Result<()> {
    let Some(meta) = root.meta() else {
        return Ok(());
    };
    meta.depth.set(meta.depth.get() + 1);
    let result = apply_all(root);
    meta.depth.set(meta.depth.get() - 1);
    meta.passes.set(meta.passes.get() + 1);
    if meta.depth.get() == 0 {
        meta.registry.borrow_mut().compact();
    }
    result
}

fn apply_all(root: &State) -> Result<()> {
    let Some(meta) = root.meta() else {
        return Ok(());
    };
    let mut index = 0;
    loop {
        // The registry must not stay borrowed while a binding runs
        let binding = meta.registry.borrow().get(index);
        let Some(binding) = binding else {
            return Ok(());
        };
        index += 1;
        if !binding.live.get() {
            continue;
        }
        if let Err(error) = binding.apply(root) {
            tracing::warn!(binding = %binding.label, %error, "render pass aborted");
            return Err(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(index: u32) -> NodeId {
        NodeId {
            index,
            generation: 0,
        }
    }

    #[test]
    fn removal_is_deferred_until_compaction() {
        let mut registry = Registry::default();
        registry.push(Binding::structural("a", |_| Ok(())).owned_by(node(1)));
        registry.push(Binding::structural("b", |_| Ok(())).owned_by(node(2)));
        registry.push(Binding::structural("c", |_| Ok(())).owned_by(node(1)));

        assert_eq!(registry.remove_owned_by(node(1)), 2);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.bindings.len(), 3);

        registry.compact();
        assert_eq!(registry.bindings.len(), 1);
        assert_eq!(registry.get(0).unwrap().label, "b");
        assert_eq!(registry.remove_owned_by(node(1)), 0);
    }
}
