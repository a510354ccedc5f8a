//! Node storage for the maps. All nodes of one container live in a single
//! contiguous Vec and are addressed by their slot position. Removed slots are
//! freelisted and reused by later inserts.
//!
//! Each slot carries a generation that is bumped whenever the slot is
//! vacated, so a `Handle` taken before a removal can never be confused with a
//! node that later reuses the same slot.

use std::ops::{Index, IndexMut};

/// A position in the arena plus the generation it was issued at.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Handle {
    idx: usize,
    gen: u32,
}

impl Handle {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.idx
    }
}

#[derive(Clone)]
struct Slot<T> {
    gen: u32,
    item: Option<T>,
}

#[derive(Clone)]
pub(crate) struct Arena<T> {
    store: Vec<Slot<T>>,
    /// Slots which aren't in use anymore. These will be reused.
    free: Vec<usize>,
    len: usize,
}

impl<T> Arena<T> {
    pub(crate) fn new() -> Self {
        Arena {
            store: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Arena {
            store: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of live nodes.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn insert(&mut self, item: T) -> Handle {
        self.len += 1;
        match self.free.pop() {
            Some(idx) => {
                let slot = &mut self.store[idx];
                debug_assert!(slot.item.is_none());
                slot.item = Some(item);
                Handle { idx, gen: slot.gen }
            }
            None => {
                let idx = self.store.len();
                self.store.push(Slot {
                    gen: 0,
                    item: Some(item),
                });
                Handle { idx, gen: 0 }
            }
        }
    }

    /// Release the node behind `h`. Returns `None` if the handle is stale.
    pub(crate) fn remove(&mut self, h: Handle) -> Option<T> {
        let slot = self.store.get_mut(h.idx)?;
        if slot.gen != h.gen {
            return None;
        }
        let item = slot.item.take()?;
        slot.gen = slot.gen.wrapping_add(1);
        self.free.push(h.idx);
        self.len -= 1;
        Some(item)
    }

    #[inline]
    pub(crate) fn contains(&self, h: Handle) -> bool {
        self.get(h).is_some()
    }

    #[inline]
    pub(crate) fn get(&self, h: Handle) -> Option<&T> {
        self.store
            .get(h.idx)
            .filter(|slot| slot.gen == h.gen)
            .and_then(|slot| slot.item.as_ref())
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, h: Handle) -> Option<&mut T> {
        self.store
            .get_mut(h.idx)
            .filter(|slot| slot.gen == h.gen)
            .and_then(|slot| slot.item.as_mut())
    }

    /// Drop every node. Outstanding handles all become stale, and the
    /// buffers are kept for reuse.
    pub(crate) fn clear(&mut self) {
        self.free.clear();
        for (idx, slot) in self.store.iter_mut().enumerate() {
            if slot.item.take().is_some() {
                slot.gen = slot.gen.wrapping_add(1);
            }
            self.free.push(idx);
        }
        // Pop order hands out the lowest slots first.
        self.free.reverse();
        self.len = 0;
    }

    /// Mutable access to every live node, laid out by slot index so callers
    /// can hand the references out in their own structural order.
    pub(crate) fn slots_mut(&mut self) -> Vec<Option<&mut T>> {
        self.store.iter_mut().map(|slot| slot.item.as_mut()).collect()
    }

    /// Consume the arena, yielding nodes laid out by slot index.
    pub(crate) fn into_slots(self) -> Vec<Option<T>> {
        self.store.into_iter().map(|slot| slot.item).collect()
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Handles stored inside the structure's own links are always live, so a miss
// here means the links are corrupt.
impl<T> Index<Handle> for Arena<T> {
    type Output = T;

    fn index(&self, h: Handle) -> &T {
        match self.get(h) {
            Some(t) => t,
            None => panic!("arena link to released slot {}", h.idx),
        }
    }
}

impl<T> IndexMut<Handle> for Arena<T> {
    fn index_mut(&mut self, h: Handle) -> &mut T {
        let idx = h.idx;
        match self.get_mut(h) {
            Some(t) => t,
            None => panic!("arena link to released slot {}", idx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Arena;

    #[test]
    fn test_arena_insert_remove_reuse() {
        let mut a: Arena<usize> = Arena::new();
        let h0 = a.insert(0);
        let h1 = a.insert(1);
        assert!(a.len() == 2);
        assert!(a[h0] == 0);
        assert!(a[h1] == 1);

        assert!(a.remove(h0) == Some(0));
        assert!(a.len() == 1);
        // Double remove is refused.
        assert!(a.remove(h0).is_none());

        // The slot is reused, but the old handle stays dead.
        let h2 = a.insert(2);
        assert!(h2.index() == h0.index());
        assert!(h2 != h0);
        assert!(a.get(h0).is_none());
        assert!(a.get(h2) == Some(&2));
    }

    #[test]
    fn test_arena_clear_invalidates() {
        let mut a: Arena<&'static str> = Arena::with_capacity(4);
        let handles: Vec<_> = ["a", "b", "c"].into_iter().map(|s| a.insert(s)).collect();
        a.clear();
        assert!(a.len() == 0);
        for h in handles.iter() {
            assert!(!a.contains(*h));
        }
        let h = a.insert("d");
        assert!(h.index() == 0);
        assert!(a[h] == "d");
    }

    #[test]
    fn test_arena_slots_mut() {
        let mut a: Arena<usize> = Arena::new();
        let h0 = a.insert(10);
        let _h1 = a.insert(20);
        a.remove(h0);
        let slots = a.slots_mut();
        assert!(slots.len() == 2);
        assert!(slots[0].is_none());
        assert!(slots[1].as_deref() == Some(&20));
    }
}
