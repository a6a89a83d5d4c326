//! Slot+generation handle table backing [`MockWorld`](crate::MockWorld)
//! entity handles.
//!
//! Removed handles have stale generation counters and resolve to `None`,
//! so a handle kept past its entity's removal is detected instead of
//! silently aliasing a newer entity in the same slot.

use revolve_core::EntityHandle;

/// Handle encoding: upper 32 bits = slot index, lower 32 bits = generation.
fn encode(slot: u32, generation: u32) -> EntityHandle {
    EntityHandle::from_raw(((slot as u64) << 32) | (generation as u64))
}

fn decode(handle: EntityHandle) -> (u32, u32) {
    let raw = handle.raw();
    ((raw >> 32) as u32, raw as u32)
}

struct Slot<T> {
    generation: u32,
    data: Option<T>,
}

/// Maps [`EntityHandle`]s to owned values, reusing slots via a free list.
pub struct HandleTable<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    live: usize,
}

impl<T> HandleTable<T> {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Insert a value and return its handle.
    pub fn insert(&mut self, value: T) -> EntityHandle {
        self.live += 1;
        if let Some(slot_idx) = self.free_list.pop() {
            let slot = &mut self.slots[slot_idx as usize];
            slot.data = Some(value);
            encode(slot_idx, slot.generation)
        } else {
            let slot_idx = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                data: Some(value),
            });
            encode(slot_idx, 0)
        }
    }

    /// The value behind a handle, or `None` if the handle is stale.
    pub fn get(&self, handle: EntityHandle) -> Option<&T> {
        let (slot_idx, generation) = decode(handle);
        let slot = self.slots.get(slot_idx as usize)?;
        if slot.generation != generation {
            return None;
        }
        slot.data.as_ref()
    }

    /// Remove the value behind a handle, returning it.
    ///
    /// A slot whose generation wraps to 0 is retired rather than reused.
    /// Returns `None` for a stale handle, so double removal is harmless.
    pub fn remove(&mut self, handle: EntityHandle) -> Option<T> {
        let (slot_idx, generation) = decode(handle);
        let slot = self.slots.get_mut(slot_idx as usize)?;
        if slot.generation != generation {
            return None;
        }
        let value = slot.data.take()?;
        self.live -= 1;
        slot.generation = slot.generation.wrapping_add(1);
        if slot.generation != 0 {
            self.free_list.push(slot_idx);
        }
        Some(value)
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether the table holds no live values.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
