//! In-memory B-tree node and the array surgery that keeps it balanced.
//!
//! A [`Node`] is a value copy of one page. It never holds another node,
//! only [`PageId`]s of its children, so every operation here is pure and
//! the engine decides what to persist and in which order.

use crate::common::config::validate_degree;
use crate::common::{PageId, Result, StorageError, StorageResult};
use crate::index::btree::BoundedVec;

/// Key type stored in the tree (`int32` on disk).
pub type Key = i32;

/// One decoded B-tree node.
///
/// # Invariants
/// - keys are strictly increasing
/// - a leaf has no children; an internal node has `len() + 1`
/// - `len() <= 2t - 1`, and outside the root `len() >= t - 1`
///
/// Every key in subtree `child(i)` is less than `key(i)`, and every key
/// in subtree `child(i + 1)` is greater.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    degree: u32,
    keys: BoundedVec<Key>,
    children: BoundedVec<PageId>,
    is_leaf: bool,
}

impl Node {
    /// Create an empty node for a tree of branching parameter `degree`.
    ///
    /// # Errors
    /// Returns `TreeError::InvalidDegree` if a full node of this degree
    /// would not fit in a page.
    pub fn new(degree: u32, is_leaf: bool) -> Result<Self> {
        validate_degree(degree)?;
        Ok(Self::empty(degree, is_leaf))
    }

    fn empty(degree: u32, is_leaf: bool) -> Self {
        let t = degree as usize;
        Self {
            degree,
            keys: BoundedVec::with_capacity(2 * t - 1),
            children: BoundedVec::with_capacity(2 * t),
            is_leaf,
        }
    }

    /// Rebuild a node from decoded page fields, checking structural limits.
    pub(crate) fn from_parts(
        degree: u32,
        keys: Vec<Key>,
        children: Vec<PageId>,
        is_leaf: bool,
    ) -> StorageResult<Self> {
        if validate_degree(degree).is_err() {
            return Err(StorageError::corrupt_page(format!("degree {degree} out of range")));
        }
        let t = degree as usize;
        let expected_children = if is_leaf { 0 } else { keys.len() + 1 };
        if children.len() != expected_children {
            return Err(StorageError::corrupt_page(format!(
                "{} children for {} keys (leaf: {})",
                children.len(),
                keys.len(),
                is_leaf
            )));
        }
        let key_count = keys.len();
        let keys = BoundedVec::from_vec(keys, 2 * t - 1).ok_or_else(|| {
            StorageError::corrupt_page(format!("{key_count} keys exceed degree {degree}"))
        })?;
        let children = BoundedVec::from_vec(children, 2 * t)
            .ok_or_else(|| StorageError::corrupt_page("too many children"))?;
        Ok(Self {
            degree,
            keys,
            children,
            is_leaf,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn degree(&self) -> u32 {
        self.degree
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    /// Number of keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    pub fn keys(&self) -> &[Key] {
        self.keys.as_slice()
    }

    #[inline]
    pub fn children(&self) -> &[PageId] {
        self.children.as_slice()
    }

    #[inline]
    pub fn key(&self, index: usize) -> Key {
        self.keys[index]
    }

    #[inline]
    pub fn child(&self, index: usize) -> PageId {
        self.children[index]
    }

    /// Smallest key count allowed outside the root (`t - 1`).
    #[inline]
    pub fn min_keys(&self) -> usize {
        self.degree as usize - 1
    }

    /// Holds `2t - 1` keys and must be split before anything descends into it.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.keys.is_full()
    }

    /// Holds at least `t` keys, so it can give one away and stay legal.
    #[inline]
    pub fn can_lend(&self) -> bool {
        self.keys.len() > self.min_keys()
    }

    /// Locate `key`: `Ok(i)` if it is `key(i)`, `Err(i)` if it belongs in
    /// subtree `child(i)` (the first slot whose key is greater).
    #[inline]
    pub fn search(&self, key: Key) -> std::result::Result<usize, usize> {
        self.keys.search(&key)
    }

    // ========================================================================
    // Single-slot edits
    // ========================================================================

    pub fn insert_key_at(&mut self, index: usize, key: Key) {
        self.keys.insert(index, key);
    }

    pub fn remove_key_at(&mut self, index: usize) -> Key {
        self.keys.remove(index)
    }

    pub fn set_key(&mut self, index: usize, key: Key) {
        self.keys.set(index, key);
    }

    pub fn push_child(&mut self, child: PageId) {
        debug_assert!(!self.is_leaf, "leaf nodes have no children");
        self.children.push(child);
    }

    // ========================================================================
    // Split / merge / borrow
    // ========================================================================

    /// Split a full node around its median.
    ///
    /// `self` keeps the lower `t - 1` keys (and `t` children). The returned
    /// sibling holds the upper `t - 1` keys (and `t` children). The median,
    /// originally at index `t - 1`, is returned for the parent.
    pub fn split(&mut self) -> (Key, Node) {
        debug_assert!(self.is_full(), "only full nodes are split");
        let t = self.degree as usize;

        let mut sibling = Node::empty(self.degree, self.is_leaf);
        sibling.keys = self.keys.split_off(t);
        let median = self.keys.remove(t - 1);
        if !self.is_leaf {
            sibling.children = self.children.split_off(t);
        }
        (median, sibling)
    }

    /// Record a split of `child(index)`: the median lands at key slot
    /// `index` and the new sibling at child slot `index + 1`.
    pub fn attach_split(&mut self, index: usize, median: Key, sibling: PageId) {
        self.keys.insert(index, median);
        self.children.insert(index + 1, sibling);
    }

    /// Concatenate `separator` and all of `right` onto `self`.
    pub fn absorb(&mut self, separator: Key, mut right: Node) {
        debug_assert_eq!(self.is_leaf, right.is_leaf);
        self.keys.push(separator);
        self.keys.append(&mut right.keys);
        self.children.append(&mut right.children);
    }

    /// Remove the separator at `index` and the child slot to its right,
    /// after `child(index + 1)` was absorbed into `child(index)`.
    pub fn detach_merged(&mut self, index: usize) -> Key {
        self.children.remove(index + 1);
        self.keys.remove(index)
    }

    /// Rotate one key from `left` (at child slot `index`) through the parent
    /// separator `key(index)` into the front of `child` (at slot `index + 1`).
    pub fn rotate_from_left(&mut self, index: usize, left: &mut Node, child: &mut Node) {
        debug_assert!(left.can_lend(), "left sibling must hold at least t keys");
        let lent = left.keys.remove(left.keys.len() - 1);
        let separator = self.keys[index];
        self.keys.set(index, lent);
        child.keys.insert(0, separator);
        if !child.is_leaf {
            let moved = left.children.remove(left.children.len() - 1);
            child.children.insert(0, moved);
        }
    }

    /// Rotate one key from `right` (at child slot `index + 1`) through the
    /// parent separator `key(index)` onto the end of `child` (at slot `index`).
    pub fn rotate_from_right(&mut self, index: usize, child: &mut Node, right: &mut Node) {
        debug_assert!(right.can_lend(), "right sibling must hold at least t keys");
        let lent = right.keys.remove(0);
        let separator = self.keys[index];
        self.keys.set(index, lent);
        child.keys.push(separator);
        if !child.is_leaf {
            let moved = right.children.remove(0);
            child.children.push(moved);
        }
    }
}
