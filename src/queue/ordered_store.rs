//! Lazily sorted store of pending items.
//!
//! Items are kept in a deque. An item that sorts at or before the current
//! front is pushed to the front; anything else is appended and the store is
//! marked unsorted. This keeps `peek_nearest` correct without sorting:
//! appended items are never smaller than the front, and `remove_while`
//! sorts before it scans, leaving the store fully sorted afterwards.

use std::cmp::Ordering;
use std::collections::VecDeque;

/// Receives add/remove notifications from an [`OrderedStore`].
///
/// Notifications are delivered synchronously, inside the mutating call.
pub trait StoreObserver<T> {
    fn added(&mut self, item: &T);
    fn removed(&mut self, item: &T);
}

/// Observer that ignores every notification.
impl<T> StoreObserver<T> for () {
    fn added(&mut self, _item: &T) {}
    fn removed(&mut self, _item: &T) {}
}

/// Mutation-ordered, lazily sorted collection.
#[derive(Debug)]
pub struct OrderedStore<T, O = ()> {
    items: VecDeque<T>,
    unsorted: bool,
    observer: O,
}

impl<T: Ord> OrderedStore<T, ()> {
    pub fn new() -> Self {
        Self::with_observer(())
    }
}

impl<T: Ord> Default for OrderedStore<T, ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord, O: StoreObserver<T>> OrderedStore<T, O> {
    /// Create an empty store reporting mutations to `observer`.
    pub fn with_observer(observer: O) -> Self {
        Self {
            items: VecDeque::new(),
            unsorted: false,
            observer,
        }
    }

    /// Insert an item.
    ///
    /// Returns `true` if the item became the new nearest one, i.e. the store
    /// was empty or the item is strictly less than the previous front.
    pub fn insert(&mut self, item: T) -> bool {
        self.observer.added(&item);

        match self.items.front().map(|front| item.cmp(front)) {
            Some(Ordering::Greater) => {
                self.items.push_back(item);
                self.unsorted = true;
                false
            }
            Some(Ordering::Equal) => {
                self.items.push_front(item);
                false
            }
            Some(Ordering::Less) | None => {
                self.items.push_front(item);
                true
            }
        }
    }

    /// The current minimum, without sorting.
    pub fn peek_nearest(&self) -> Option<&T> {
        self.items.front()
    }

    /// Remove items from the front while `predicate` holds.
    ///
    /// The store is sorted first if needed and the scan stops at the first
    /// item the predicate rejects, so `predicate` must be prefix-closed over
    /// the sort order (e.g. "deadline <= now").
    pub fn remove_while<P>(&mut self, mut predicate: P) -> Vec<T>
    where
        P: FnMut(&T) -> bool,
    {
        self.sort_if_needed();

        let mut removed = Vec::new();
        while let Some(front) = self.items.front() {
            if !predicate(front) {
                break;
            }
            if let Some(item) = self.items.pop_front() {
                self.observer.removed(&item);
                removed.push(item);
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `false` while appended items are waiting for a sort.
    pub fn is_sorted_hint(&self) -> bool {
        !self.unsorted
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    fn sort_if_needed(&mut self) {
        if !self.unsorted {
            return;
        }
        // Stable: equal items keep their relative order.
        self.items.make_contiguous().sort();
        self.unsorted = false;
    }
}
