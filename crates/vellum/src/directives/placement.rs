//! Insertion points for elements that leave and re-enter the document.
//!
//! A `v-for` template never returns to the document, its clones stand in for
//! it. A conditional link or a loop placed after such a template resolves its
//! insertion point through the clones, and skips detached siblings until it
//! finds one that is attached.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::document::{Document, NodeId};

/// Clones of one `v-for` template, in document order.
pub(crate) type Instances = Rc<RefCell<Vec<NodeId>>>;

#[derive(Default)]
pub(crate) struct Placements {
    stand_ins: RefCell<HashMap<NodeId, Weak<RefCell<Vec<NodeId>>>>>,
}

impl Placements {
    /// Start tracking the clones of `template`. Entries whose loop is gone are
    /// dropped on the way.
    pub(crate) fn track(&self, template: NodeId) -> Instances {
        let instances = Instances::default();
        let mut stand_ins = self.stand_ins.borrow_mut();
        stand_ins.retain(|_, instances| instances.strong_count() > 0);
        stand_ins.insert(template, Rc::downgrade(&instances));
        instances
    }

    /// The node to insert after so that an element whose preceding siblings
    /// were `anchors` (nearest last) keeps its document order under `parent`.
    /// `None` means the front of `parent`.
    pub(crate) fn after(
        &self,
        document: &dyn Document,
        parent: NodeId,
        anchors: &[NodeId],
    ) -> Option<NodeId> {
        let stand_ins = self.stand_ins.borrow();
        anchors.iter().rev().find_map(|anchor| {
            if document.parent(*anchor) == Some(parent) {
                return Some(*anchor);
            }
            let instances = stand_ins.get(anchor)?.upgrade()?;
            let last = instances
                .borrow()
                .iter()
                .rev()
                .copied()
                .find(|clone| document.parent(*clone) == Some(parent));
            last
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDocument;

    #[test]
    fn detached_templates_resolve_to_their_last_clone() {
        let mut document = MemoryDocument::parse(r#"<ul><li>t</li><li>x</li></ul>"#).unwrap();
        let list = document.elements_by_tag("ul")[0];
        let items = document.elements_by_tag("li");
        let (template, detached) = (items[0], items[1]);
        document.remove(template);
        document.remove(detached);

        let placements = Placements::default();
        let instances = placements.track(template);
        assert_eq!(placements.after(&document, list, &[template, detached]), None);

        let clone = document.clone_node(template);
        document.insert_after(list, clone, None);
        instances.borrow_mut().push(clone);
        assert_eq!(placements.after(&document, list, &[template, detached]), Some(clone));

        drop(instances);
        assert_eq!(placements.after(&document, list, &[template]), None);
    }
}
