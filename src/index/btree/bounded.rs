//! Fixed-capacity ordered sequence.
//!
//! [`BoundedVec`] backs the key and child arrays of a node. Its capacity is
//! fixed at construction from the tree degree, so a node can never grow past
//! what its page can hold. Every shifting operation a split, merge or borrow
//! needs is a single named method here instead of hand-written index loops.

use std::ops::Index;

/// A `Vec` that refuses to grow past a fixed capacity.
///
/// # Panics
/// Growing methods panic when the sequence is full, and positional methods
/// panic on an out-of-bounds index, the same way `Vec` does. Callers in the
/// tree check occupancy before mutating, so a panic here is a logic bug.
///
/// # Example
/// ```
/// use pagetree::index::btree::BoundedVec;
///
/// let mut v = BoundedVec::with_capacity(3);
/// v.push(10);
/// v.push(30);
/// v.insert(1, 20);
/// assert_eq!(v.as_slice(), &[10, 20, 30]);
/// assert!(v.is_full());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedVec<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T: Copy> BoundedVec<T> {
    /// Create an empty sequence that can hold `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Build from existing items, or `None` if they exceed `capacity`.
    pub fn from_vec(items: Vec<T>, capacity: usize) -> Option<Self> {
        if items.len() > capacity {
            return None;
        }
        Some(Self { items, capacity })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Overwrite the item at `index`.
    pub fn set(&mut self, index: usize, value: T) {
        self.items[index] = value;
    }

    /// Append an item.
    pub fn push(&mut self, value: T) {
        self.assert_room(1);
        self.items.push(value);
    }

    /// Insert at `index`, shifting later items one slot right.
    pub fn insert(&mut self, index: usize, value: T) {
        self.assert_room(1);
        self.items.insert(index, value);
    }

    /// Remove at `index`, shifting later items one slot left.
    pub fn remove(&mut self, index: usize) -> T {
        self.items.remove(index)
    }

    /// Move items `[at..]` into a new sequence of the same capacity.
    pub fn split_off(&mut self, at: usize) -> Self {
        Self {
            items: self.items.split_off(at),
            capacity: self.capacity,
        }
    }

    /// Move every item of `other` onto the end of `self`.
    pub fn append(&mut self, other: &mut Self) {
        self.assert_room(other.len());
        self.items.append(&mut other.items);
    }

    fn assert_room(&self, extra: usize) {
        assert!(
            self.items.len() + extra <= self.capacity,
            "bounded sequence overflow: {} + {} > {}",
            self.items.len(),
            extra,
            self.capacity
        );
    }
}

impl<T: Ord + Copy> BoundedVec<T> {
    /// Binary search a sorted sequence. `Err(i)` is the first slot whose
    /// item is greater than `value`.
    #[inline]
    pub fn search(&self, value: &T) -> Result<usize, usize> {
        self.items.binary_search(value)
    }
}

impl<T> Index<usize> for BoundedVec<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}
