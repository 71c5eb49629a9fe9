//! Node identifiers and allocation.
//!
//! A [`NodeId`] is a 64-bit handle that packs a *generation* counter in the
//! high 32 bits and a slot *index* in the low 32 bits. Disposing a node bumps
//! the generation of its slot, so handles that outlive their node are
//! detected instead of silently aliasing whatever reuses the slot.

use std::collections::VecDeque;
use std::fmt;

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

/// A generational graph node identifier.
///
/// Layout: `[generation: u32 | index: u32]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    #[inline]
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    /// The slot index (low 32 bits).
    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// The generation (high 32 bits).
    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// NodeAllocator
// ---------------------------------------------------------------------------

/// Hands out [`NodeId`]s and recycles disposed slots.
///
/// Free slots are reused FIFO so generations spread across slots.
#[derive(Debug, Default)]
pub(crate) struct NodeAllocator {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: VecDeque<u32>,
}

impl NodeAllocator {
    pub(crate) fn allocate(&mut self) -> NodeId {
        if let Some(index) = self.free.pop_front() {
            self.alive[index as usize] = true;
            NodeId::new(index, self.generations[index as usize])
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.alive.push(true);
            NodeId::new(index, 0)
        }
    }

    /// Returns `false` when `id` was already dead or stale.
    #[cfg(test)]
    pub(crate) fn deallocate(&mut self, id: NodeId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let idx = id.index() as usize;
        self.alive[idx] = false;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free.push_back(id.index());
        true
    }

    pub(crate) fn is_alive(&self, id: NodeId) -> bool {
        let idx = id.index() as usize;
        idx < self.generations.len()
            && self.alive[idx]
            && self.generations[idx] == id.generation()
    }

    pub(crate) fn alive_count(&self) -> usize {
        self.alive.iter().filter(|a| **a).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_packs_index_and_generation() {
        let id = NodeId::new(7, 3);
        assert_eq!(id.index(), 7);
        assert_eq!(id.generation(), 3);
        assert_eq!(format!("{id:?}"), "NodeId(7v3)");
    }

    #[test]
    fn recycled_slot_gets_new_generation() {
        let mut alloc = NodeAllocator::default();
        let a = alloc.allocate();
        let _b = alloc.allocate();
        assert!(alloc.deallocate(a));
        assert!(!alloc.is_alive(a));
        assert!(!alloc.deallocate(a));

        let c = alloc.allocate();
        assert_eq!(c.index(), a.index());
        assert_eq!(c.generation(), a.generation() + 1);
        assert!(alloc.is_alive(c));
        assert_eq!(alloc.alive_count(), 2);
    }
}
