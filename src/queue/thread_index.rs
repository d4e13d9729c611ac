//! Compact multi-value index from context to pending requests.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

/// Values recorded under one key.
///
/// `Many` is only used while a key holds two or more values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<V> {
    One(V),
    Many(Vec<V>),
}

impl<V> Slot<V> {
    pub fn len(&self) -> usize {
        match self {
            Slot::One(_) => 1,
            Slot::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, V> {
        match self {
            Slot::One(value) => std::slice::from_ref(value).iter(),
            Slot::Many(values) => values.iter(),
        }
    }
}

/// Multi-value map that avoids allocating a collection for single values.
#[derive(Debug)]
pub struct ThreadIndex<K, V> {
    entries: HashMap<K, Slot<V>>,
}

impl<K: Hash + Eq, V: PartialEq> ThreadIndex<K, V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Associate `value` with `key`, promoting to `Slot::Many` on the second value.
    pub fn record(&mut self, key: K, value: V) {
        match self.entries.entry(key) {
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::One(value));
            }
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                *slot = match std::mem::replace(slot, Slot::Many(Vec::new())) {
                    Slot::One(first) => Slot::Many(vec![first, value]),
                    Slot::Many(mut values) => {
                        values.push(value);
                        Slot::Many(values)
                    }
                };
            }
        }
    }

    /// Remove one association, demoting to `Slot::One` when a single value remains.
    pub fn forget(&mut self, key: &K, value: &V) {
        let Some(slot) = self.entries.get_mut(key) else {
            return;
        };

        match slot {
            Slot::One(stored) => {
                if stored == value {
                    self.entries.remove(key);
                }
            }
            Slot::Many(values) => {
                if let Some(pos) = values.iter().position(|v| v == value) {
                    values.swap_remove(pos);
                }
                match values.len() {
                    0 => {
                        self.entries.remove(key);
                    }
                    1 => {
                        if let Some(last) = values.pop() {
                            *slot = Slot::One(last);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    /// Drop every value recorded under `key`.
    pub fn forget_all(&mut self, key: &K) {
        self.entries.remove(key);
    }

    pub fn lookup(&self, key: &K) -> Option<&Slot<V>> {
        self.entries.get(key)
    }

    /// Number of keys with at least one value.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Hash + Eq, V: PartialEq> Default for ThreadIndex<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_lookup() {
        let index: ThreadIndex<u32, u32> = ThreadIndex::new();
        assert!(index.lookup(&1).is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn test_single_value_is_not_a_vec() {
        let mut index = ThreadIndex::new();
        index.record(1, 2);
        assert_eq!(index.lookup(&1), Some(&Slot::One(2)));
    }

    #[test]
    fn test_second_value_promotes() {
        let mut index = ThreadIndex::new();
        index.record(1, 2);
        index.record(1, 3);
        assert_eq!(index.lookup(&1), Some(&Slot::Many(vec![2, 3])));
        assert_eq!(index.lookup(&1).map(Slot::len), Some(2));
    }

    #[test]
    fn test_forget_last_value_removes_key() {
        let mut index = ThreadIndex::new();
        index.record(1, 2);
        index.forget(&1, &2);
        assert!(index.lookup(&1).is_none());
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn test_forget_demotes_to_single() {
        let mut index = ThreadIndex::new();
        index.record(1, 2);
        index.record(1, 3);
        index.forget(&1, &2);
        assert_eq!(index.lookup(&1), Some(&Slot::One(3)));
    }

    #[test]
    fn test_forget_keeps_many_when_several_remain() {
        let mut index = ThreadIndex::new();
        index.record(1, 2);
        index.record(1, 3);
        index.record(1, 4);
        index.forget(&1, &2);
        let mut rest: Vec<u32> = index.lookup(&1).map(|s| s.iter().copied().collect()).unwrap_or_default();
        rest.sort();
        assert_eq!(rest, vec![3, 4]);
    }

    #[test]
    fn test_draining_in_record_order_empties_key() {
        let mut index = ThreadIndex::new();
        for v in 0..50 {
            index.record(1, v);
        }
        for v in 0..49 {
            index.forget(&1, &v);
            assert_eq!(index.lookup(&1).map(Slot::len), Some(49 - v as usize));
        }
        assert_eq!(index.lookup(&1), Some(&Slot::One(49)));
        index.forget(&1, &49);
        assert!(index.is_empty());
    }

    #[test]
    fn test_forget_unknown_value_is_noop() {
        let mut index = ThreadIndex::new();
        index.record(1, 2);
        index.forget(&1, &9);
        index.forget(&7, &2);
        assert_eq!(index.lookup(&1), Some(&Slot::One(2)));
    }

    #[test]
    fn test_forget_all() {
        let mut index = ThreadIndex::new();
        index.record(1, 2);
        index.record(1, 3);
        index.forget_all(&1);
        assert!(index.lookup(&1).is_none());
    }

    #[test]
    fn test_slot_iter_covers_both_forms() {
        assert_eq!(Slot::One(5).iter().copied().collect::<Vec<_>>(), vec![5]);
        assert_eq!(Slot::Many(vec![1, 2]).iter().copied().collect::<Vec<_>>(), vec![1, 2]);
    }
}
