//! Fixed-capacity particle storage with a free-slot allocator
//!
//! Free slots are tracked by an explicit stack plus a "fresh" pointer:
//! every index at or above `fresh` is free and not on the stack. The
//! stack is rebuilt by [`ParticleStore::rebuild_free`] so the lowest free
//! index is handed out first after a reconcile, and killed slots are
//! reused most-recent-first in between.

use std::ops::{Index, IndexMut};

use powdersim_simulation::{NPART, PT_NUM, Particle};

pub struct ParticleStore {
    parts: Vec<Particle>,
    free: Vec<usize>,
    fresh: usize,
    /// High-water mark: every slot above it is empty
    last_active: usize,
    element_count: Vec<u32>,
    capacity: usize,
}

impl ParticleStore {
    pub fn new() -> Self {
        Self::with_capacity(NPART)
    }

    /// A store holding at most `capacity` particles
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            parts: vec![Particle::EMPTY; capacity],
            free: Vec::new(),
            fresh: 0,
            last_active: 0,
            element_count: vec![0; PT_NUM],
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pop a free slot, raising the high-water mark if needed
    pub fn allocate(&mut self) -> Option<usize> {
        let index = match self.free.pop() {
            Some(index) => index,
            None if self.fresh < self.capacity => {
                self.fresh += 1;
                self.fresh - 1
            }
            None => return None,
        };
        if index > self.last_active {
            self.last_active = index;
        }
        Some(index)
    }

    /// Claim a specific slot for direct writes (save loading, replace)
    pub fn claim(&mut self, index: usize) {
        if index >= self.fresh {
            // Slots skipped over by the fresh pointer become ordinary free slots
            for skipped in (self.fresh..index).rev() {
                self.free.push(skipped);
            }
            self.fresh = index + 1;
        } else if let Some(pos) = self.free.iter().rposition(|&f| f == index) {
            self.free.remove(pos);
        }
        if index > self.last_active {
            self.last_active = index;
        }
    }

    /// Mark a slot free and make it the next one handed out
    pub fn release(&mut self, index: usize) {
        if index >= self.capacity {
            return;
        }
        self.parts[index] = Particle::EMPTY;
        self.free.push(index);
    }

    /// Rebuild the free stack from slot contents up to `scan_end` (inclusive)
    ///
    /// Returns the highest live index seen, which becomes the new
    /// high-water mark. Slots above `scan_end` are left to the fresh pointer.
    pub fn rebuild_free(&mut self, scan_end: usize) -> usize {
        let scan_end = scan_end.min(self.capacity.saturating_sub(1));
        let mut last_used = 0;
        self.free.clear();
        for i in (0..=scan_end).rev() {
            if self.parts[i].is_empty() {
                self.free.push(i);
            } else if last_used == 0 {
                last_used = i;
            }
        }
        // Reverse scan pushed the highest index first, so the stack pops lowest-first
        self.fresh = scan_end + 1;
        self.last_active = last_used;
        last_used
    }

    pub fn last_active(&self) -> usize {
        self.last_active
    }

    /// Number of free slots left
    pub fn free_count(&self) -> usize {
        self.free.len() + (self.capacity - self.fresh)
    }

    pub fn is_free_listed(&self, index: usize) -> bool {
        index >= self.fresh || self.free.contains(&index)
    }

    /// Reset every slot and counter
    pub fn clear(&mut self) {
        self.parts.fill(Particle::EMPTY);
        self.free.clear();
        self.fresh = 0;
        self.last_active = 0;
        self.element_count.fill(0);
    }

    pub fn element_count(&self, element: u16) -> u32 {
        self.element_count
            .get(element as usize)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn count_added(&mut self, element: u16) {
        if let Some(count) = self.element_count.get_mut(element as usize) {
            *count += 1;
        }
    }

    pub(crate) fn count_removed(&mut self, element: u16) {
        if let Some(count) = self.element_count.get_mut(element as usize) {
            *count = count.saturating_sub(1);
        }
    }

    pub fn get(&self, index: usize) -> Option<&Particle> {
        self.parts.get(index)
    }

    /// Iterate live particles up to the high-water mark
    pub fn iter_live(&self) -> impl Iterator<Item = (usize, &Particle)> {
        self.parts[..=self.last_active.min(self.capacity.saturating_sub(1))]
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_empty())
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl Default for ParticleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<usize> for ParticleStore {
    type Output = Particle;

    fn index(&self, index: usize) -> &Particle {
        &self.parts[index]
    }
}

impl IndexMut<usize> for ParticleStore {
    fn index_mut(&mut self, index: usize) -> &mut Particle {
        &mut self.parts[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(element: u16) -> Particle {
        Particle::new(element, 1.0, 1.0)
    }

    #[test]
    fn test_allocate_in_order_when_fresh() {
        let mut store = ParticleStore::with_capacity(4);
        assert_eq!(store.allocate(), Some(0));
        assert_eq!(store.allocate(), Some(1));
        assert_eq!(store.last_active(), 1);
    }

    #[test]
    fn test_allocate_full() {
        let mut store = ParticleStore::with_capacity(2);
        assert!(store.allocate().is_some());
        assert!(store.allocate().is_some());
        assert_eq!(store.allocate(), None);
        assert_eq!(store.free_count(), 0);
    }

    #[test]
    fn test_release_reuses_slot() {
        let mut store = ParticleStore::with_capacity(8);
        for _ in 0..3 {
            let i = store.allocate().unwrap();
            store[i] = live(1);
        }
        store.release(1);
        assert!(store[1].is_empty());
        assert_eq!(store.allocate(), Some(1));
    }

    #[test]
    fn test_rebuild_free_hands_out_lowest_first() {
        let mut store = ParticleStore::with_capacity(8);
        for _ in 0..5 {
            let i = store.allocate().unwrap();
            store[i] = live(1);
        }
        store[1] = Particle::EMPTY;
        store[3] = Particle::EMPTY;
        let last = store.rebuild_free(store.last_active());
        assert_eq!(last, 4);
        assert_eq!(store.allocate(), Some(1));
        assert_eq!(store.allocate(), Some(3));
        assert_eq!(store.allocate(), Some(5));
    }

    #[test]
    fn test_rebuild_free_shrinks_high_water_mark() {
        let mut store = ParticleStore::with_capacity(8);
        for _ in 0..4 {
            let i = store.allocate().unwrap();
            store[i] = live(1);
        }
        store[3] = Particle::EMPTY;
        store[2] = Particle::EMPTY;
        store.rebuild_free(store.last_active());
        assert_eq!(store.last_active(), 1);
        assert!(store.is_free_listed(2));
        assert!(store.is_free_listed(3));
        assert!(store.is_free_listed(7));
        assert!(!store.is_free_listed(0));
    }

    #[test]
    fn test_claim_specific_slot() {
        let mut store = ParticleStore::with_capacity(8);
        store.claim(3);
        assert_eq!(store.last_active(), 3);
        assert!(!store.is_free_listed(3));
        assert!(store.is_free_listed(0));
        assert_eq!(store.allocate(), Some(0));
    }

    #[test]
    fn test_element_counts() {
        let mut store = ParticleStore::with_capacity(4);
        store.count_added(2);
        store.count_added(2);
        store.count_removed(2);
        assert_eq!(store.element_count(2), 1);
        store.count_removed(5);
        assert_eq!(store.element_count(5), 0);
        assert_eq!(store.element_count(9999), 0);
    }
}
