//! `v-if` / `v-else-if` / `v-else` chains.
//!
//! Each conditional element becomes a link registered on the scope. A link
//! reads the result carried over from the link before it and writes one for
//! the link after it, so a chain is decided in registration order within a
//! single pass.

use smallvec::SmallVec;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use super::attribute::report;
use crate::document::{Document, NodeId};
use crate::error::Result;
use crate::expression::{Code, Env};
use crate::registry::Binding;
use crate::state::State;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum ChainTag {
    Primary,
    ElseIf,
    Else,
}

impl ChainTag {
    fn of(document: &dyn Document, node: NodeId) -> Option<Self> {
        [Self::Primary, Self::ElseIf, Self::Else]
            .into_iter()
            .find(|tag| document.attribute(node, tag.attribute()).is_some())
    }

    fn attribute(self) -> &'static str {
        match self {
            Self::Primary => "v-if",
            Self::ElseIf => "v-else-if",
            Self::Else => "v-else",
        }
    }
}

pub(crate) fn is_conditional(document: &dyn Document, node: NodeId) -> bool {
    ChainTag::of(document, node).is_some()
}

/// Carried results of the conditional elements met while walking one parent.
#[derive(Default)]
pub(crate) struct ChainSlots {
    slots: HashMap<NodeId, Rc<Cell<bool>>>,
}

impl ChainSlots {
    fn slot(&mut self, node: NodeId) -> Rc<Cell<bool>> {
        self.slots.entry(node).or_default().clone()
    }
}

pub(crate) struct ChainLink {
    tag: ChainTag,
    condition: Option<Code>,
    element: NodeId,
    parent: NodeId,
    /// Element siblings preceding the element when it was set up, nearest last.
    anchors: SmallVec<[NodeId; 4]>,
    carried: Rc<Cell<bool>>,
    next: Option<(ChainTag, Rc<Cell<bool>>)>,
}

impl ChainLink {
    pub(crate) fn new(
        scope: &State,
        element: NodeId,
        parent: NodeId,
        anchors: &[NodeId],
        slots: &mut ChainSlots,
    ) -> Result<Self> {
        let document = scope.document();
        let (tag, source, next) = {
            let document = document.borrow();
            let tag = ChainTag::of(&*document, element).unwrap_or(ChainTag::Primary);
            let source = document.attribute(element, tag.attribute()).unwrap_or_default();
            let next = document
                .next_element_sibling(element)
                .and_then(|next| ChainTag::of(&*document, next).map(|tag| (next, tag)));
            (tag, source, next)
        };

        let condition = match tag {
            ChainTag::Else => None,
            _ => Some(Code::compile(&source).inspect_err(|error| {
                report(scope, element, tag.attribute(), &source, error)
            })?),
        };

        Ok(Self {
            tag,
            condition,
            element,
            parent,
            anchors: anchors.iter().copied().collect(),
            carried: slots.slot(element),
            next: next.map(|(next, tag)| (tag, slots.slot(next))),
        })
    }

    pub(crate) fn register(self, scope: &State) {
        scope.register(Binding::structural(self.tag.attribute(), move |scope| {
            self.apply(scope)
        }));
    }

    fn apply(&self, scope: &State) -> Result<()> {
        let condition = match &self.condition {
            Some(code) => {
                let env = Rc::new(Env::new(scope));
                code.evaluate(&env)
                    .inspect_err(|error| {
                        report(scope, self.element, self.tag.attribute(), code.source(), error)
                    })?
                    .is_truthy()
            }
            None => false,
        };
        let previous = self.carried.get();
        let matched = match self.tag {
            ChainTag::Primary => condition,
            ChainTag::ElseIf => condition && !previous,
            ChainTag::Else => !previous,
        };

        if let Some((next_tag, next)) = &self.next {
            let carry = match (next_tag, self.tag) {
                (ChainTag::Primary, _) => true,
                (_, ChainTag::Primary) => condition,
                (_, ChainTag::ElseIf) => matched || condition || previous,
                (_, ChainTag::Else) => true,
            };
            next.set(carry);
        }

        let document = scope.document();
        let mut document = document.borrow_mut();
        let attached = document.parent(self.element) == Some(self.parent);
        if matched && !attached {
            let anchor = scope
                .shared()
                .placements
                .after(&*document, self.parent, &self.anchors);
            document.insert_after(self.parent, self.element, anchor);
        } else if !matched && attached {
            document.remove(self.element);
        }
        tracing::trace!(tag = self.tag.attribute(), matched, "conditional applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDocument;

    #[test]
    fn chain_tags_are_read_from_attributes() {
        let document = MemoryDocument::parse(
            r#"<p v-if="a">1</p><p v-else-if="b">2</p><p v-else>3</p><p>4</p>"#,
        )
        .unwrap();
        let tags = document
            .elements_by_tag("p")
            .into_iter()
            .map(|node| ChainTag::of(&document, node))
            .collect::<Vec<_>>();
        assert_eq!(
            tags,
            [
                Some(ChainTag::Primary),
                Some(ChainTag::ElseIf),
                Some(ChainTag::Else),
                None
            ]
        );
    }
}
