use crate::profiling::profile_function;
use std::num::NonZeroU64;

/// Generation-checked key into a [`SparseSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexSlot(NonZeroU64);

impl IndexSlot {
    pub fn new(generation: u32, idx: u32) -> Self {
        // The low half stores `idx + 1`, so it is never zero.
        let raw = ((generation as u64) << 32) | (idx as u64 + 1);
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    pub fn generation(&self) -> u32 {
        (self.0.get() >> 32) as u32
    }

    pub fn index(&self) -> u32 {
        (self.0.get() & u32::MAX as u64) as u32 - 1
    }
}

struct Slot<T> {
    generation: u32,
    data: Option<T>,
}

/// Slot storage that hands out generational keys and reuses freed slots.
pub struct SparseSet<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SparseSet<T> {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub fn push(&mut self, data: T) -> IndexSlot {
        profile_function!();
        if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.data = Some(data);
            IndexSlot::new(slot.generation, idx)
        } else {
            let idx = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                data: Some(data),
            });
            IndexSlot::new(0, idx)
        }
    }

    fn live_slot(&self, idx: IndexSlot) -> Option<&Slot<T>> {
        self.slots
            .get(idx.index() as usize)
            .filter(|slot| slot.generation == idx.generation() && slot.data.is_some())
    }

    pub fn contains(&self, idx: IndexSlot) -> bool {
        self.live_slot(idx).is_some()
    }

    pub fn try_get(&self, idx: IndexSlot) -> Option<&T> {
        self.live_slot(idx).and_then(|slot| slot.data.as_ref())
    }

    pub fn try_get_mut(&mut self, idx: IndexSlot) -> Option<&mut T> {
        self.slots
            .get_mut(idx.index() as usize)
            .filter(|slot| slot.generation == idx.generation())
            .and_then(|slot| slot.data.as_mut())
    }

    /// Panics if `idx` refers to a removed or reused slot.
    pub fn get(&self, idx: IndexSlot) -> &T {
        profile_function!();
        self.try_get(idx)
            .unwrap_or_else(|| panic!("invalid generation, use after free! ({idx:?})"))
    }

    /// Panics if `idx` refers to a removed or reused slot.
    pub fn get_mut(&mut self, idx: IndexSlot) -> &mut T {
        profile_function!();
        self.try_get_mut(idx)
            .unwrap_or_else(|| panic!("invalid generation, use after free! ({idx:?})"))
    }

    pub fn try_remove(&mut self, idx: IndexSlot) -> Option<T> {
        profile_function!();
        let index = idx.index();
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != idx.generation() {
            return None;
        }
        let data = slot.data.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        Some(data)
    }

    /// Panics if `idx` refers to a removed or reused slot.
    pub fn remove(&mut self, idx: IndexSlot) -> T {
        self.try_remove(idx)
            .unwrap_or_else(|| panic!("invalid generation, use after free! ({idx:?})"))
    }

    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.data.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(|slot| slot.data.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().filter_map(|slot| slot.data.as_mut())
    }

    /// Iterate live values together with the key that addresses them.
    pub fn iter_with_index(&self) -> impl Iterator<Item = (IndexSlot, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.data
                .as_ref()
                .map(|data| (IndexSlot::new(slot.generation, index as u32), data))
        })
    }
}

static_assertions::assert_eq_size!(IndexSlot, Option<IndexSlot>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_set_push() {
        let mut set = SparseSet::<u8>::new();
        let idx = set.push(15);
        assert_eq!(idx.generation(), 0);
        assert_eq!(idx.index(), 0);
        assert_eq!(*set.get(idx), 15);
    }

    #[test]
    #[should_panic]
    fn test_sparse_set_uaf() {
        let mut set = SparseSet::<u8>::new();
        let _ = set.push(15);
        let idx = IndexSlot::new(1, 0);
        let _ = set.get(idx);
    }

    #[test]
    fn test_sparse_set_remove_reuses_slot() {
        let mut set = SparseSet::<u8>::new();
        let idx = set.push(15);
        assert_eq!(set.remove(idx), 15);
        let new_idx = set.push(45);
        assert_eq!(idx.index(), new_idx.index());
        assert_ne!(idx.generation(), new_idx.generation());
        assert!(!set.contains(idx));
        assert!(set.contains(new_idx));
    }

    #[test]
    fn test_try_remove_stale_is_none() {
        let mut set = SparseSet::<u8>::new();
        let idx = set.push(1);
        assert_eq!(set.try_remove(idx), Some(1));
        assert_eq!(set.try_remove(idx), None);
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_iter_with_index_skips_removed() {
        let mut set = SparseSet::<u8>::new();
        let a = set.push(1);
        let b = set.push(2);
        let c = set.push(3);
        set.remove(b);
        let pairs: Vec<_> = set.iter_with_index().collect();
        assert_eq!(pairs, vec![(a, &1), (c, &3)]);
    }

    #[test]
    fn test_clear_invalidates_keys() {
        let mut set = SparseSet::<u8>::new();
        let a = set.push(1);
        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.try_get(a), None);
        let b = set.push(2);
        assert_eq!(b.index(), a.index());
        assert_eq!(b.generation(), 1);
    }
}
