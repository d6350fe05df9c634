use crate::document::NodeId;

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Generational arena. A freed slot is reused with a bumped generation, so
/// stale ids are detected instead of aliasing the new occupant.
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }

    pub fn alloc(&mut self, value: T) -> NodeId {
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    pub fn free(&mut self, id: NodeId) -> Option<T> {
        if !self.is_valid(id) {
            return None;
        }
        let slot = &mut self.slots[id.index as usize];
        // Bump right away so the freed id is invalid even before reuse
        slot.generation += 1;
        self.free_list.push(id.index);
        slot.value.take()
    }

    pub fn is_valid(&self, id: NodeId) -> bool {
        self.slots
            .get(id.index as usize)
            .is_some_and(|slot| slot.generation == id.generation && slot.value.is_some())
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        if self.is_valid(id) {
            self.slots[id.index as usize].value.as_ref()
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        if self.is_valid(id) {
            self.slots[id.index as usize].value.as_mut()
        } else {
            None
        }
    }

    /// Occupied slots.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
