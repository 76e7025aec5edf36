//! B-tree engine - search, insert and delete over a [`BlockStore`].
//!
//! Every public operation starts from the root page named in the header
//! and walks down one page at a time. Nodes are decoded copies; the engine
//! edits them in memory and writes them back through the codec.
//!
//! # Write ordering
//! Every mutation orders its page writes so that a failure between any two
//! of them loses no committed key:
//! - A root split leaves the old root page untouched. Both halves and the
//!   new root go to fresh pages and the header switches over last.
//! - A child split allocates the upper half, writes the parent that points
//!   at it, and only then truncates the child in place.
//! - A borrow writes the receiving child, then the parent, then the sibling
//!   that gave up a key.
//! - A merge writes the merged child before the parent. A root collapse
//!   rewrites only the header.
//!
//! An interrupted operation can leave a key copied into two nodes or a page
//! nothing references. It never leaves a key in no node at all.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, trace};

use crate::common::config::{SyncPolicy, TreeConfig};
use crate::common::{PageId, Result, StorageError, TreeError};
use crate::index::btree::{Key, Node, TreeStats};
use crate::storage::page::codec;
use crate::storage::{BlockStore, IoStats, TreeHeader};

/// Position of a key: the page holding it and its slot in that node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub page: PageId,
    pub slot: usize,
}

/// A disk-resident B-tree of `i32` keys.
///
/// # Thread Safety
/// `BTree` is single-threaded: every method takes `&mut self` and runs to
/// completion before returning. Share it across threads through
/// [`SharedBTree`](crate::SharedBTree).
///
/// # Example
/// ```no_run
/// use pagetree::BTree;
///
/// let mut tree = BTree::init("keys.db", 3).unwrap();
/// tree.insert(42).unwrap();
/// assert!(tree.search(42).unwrap().is_some());
/// tree.delete(42).unwrap();
/// assert!(tree.search(42).unwrap().is_none());
/// tree.close().unwrap();
/// ```
pub struct BTree {
    store: BlockStore,
    /// Branching parameter from the header; every page must agree.
    degree: u32,
}

impl BTree {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Initialize a new tree of branching parameter `degree` at `path`.
    ///
    /// # Errors
    /// - `TreeError::InvalidDegree` if `degree` is outside `2..=31`
    /// - `TreeError::AlreadyInitialized` if the file already holds pages
    pub fn init<P: AsRef<Path>>(path: P, degree: u32) -> Result<Self> {
        Self::init_with(path, TreeConfig::new(degree))
    }

    /// Initialize a new tree with explicit options.
    pub fn init_with<P: AsRef<Path>>(path: P, config: TreeConfig) -> Result<Self> {
        config.validate()?;
        let mut store = BlockStore::open_or_create(path, config.sync)?;
        if store.page_count() > 0 {
            return Err(TreeError::AlreadyInitialized);
        }

        store.write_header(&TreeHeader::new(PageId::new(0), config.degree))?;
        let root = store.allocate(&codec::encode(&Node::new(config.degree, true)?))?;
        debug!(degree = config.degree, root = root.0, "initialized tree");

        Ok(Self {
            store,
            degree: config.degree,
        })
    }

    /// Open an existing tree with durable writes.
    ///
    /// # Errors
    /// Returns `TreeError::NotInitialized` if the file is missing, has no
    /// header, or holds no root page.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, SyncPolicy::EveryWrite)
    }

    /// Open an existing tree with the given sync policy.
    pub fn open_with<P: AsRef<Path>>(path: P, sync: SyncPolicy) -> Result<Self> {
        if !path.as_ref().exists() {
            return Err(TreeError::NotInitialized);
        }
        let mut store = BlockStore::open(path, sync)?;
        let header = store.read_header()?.ok_or(TreeError::NotInitialized)?;
        if store.page_count() == 0 {
            return Err(TreeError::NotInitialized);
        }
        if header.root_page.0 >= store.page_count() {
            return Err(StorageError::corrupt_header(format!(
                "root {} beyond {} pages",
                header.root_page,
                store.page_count()
            ))
            .into());
        }
        debug!(
            degree = header.degree,
            root = header.root_page.0,
            pages = store.page_count(),
            "opened tree"
        );

        Ok(Self {
            store,
            degree: header.degree,
        })
    }

    /// Open the tree at `path`, initializing it first if needed.
    pub fn open_or_init<P: AsRef<Path>>(path: P, config: TreeConfig) -> Result<Self> {
        match Self::open_with(&path, config.sync) {
            Err(TreeError::NotInitialized) => Self::init_with(path, config),
            other => other,
        }
    }

    /// Flush everything to stable storage and release the file.
    pub fn close(mut self) -> Result<()> {
        self.store.sync()?;
        debug!(pages = self.store.page_count(), "closed tree");
        Ok(())
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Find the page and slot holding `key`.
    pub fn search(&mut self, key: Key) -> Result<Option<Location>> {
        let mut page = self.header()?.root_page;
        for _ in 0..self.store.page_count() {
            let node = self.read_node(page)?;
            match node.search(key) {
                Ok(slot) => return Ok(Some(Location { page, slot })),
                Err(_) if node.is_leaf() => return Ok(None),
                Err(index) => {
                    trace!(page = page.0, key, index, "search descend");
                    page = node.child(index);
                }
            }
        }
        Err(cycle(page))
    }

    pub fn contains(&mut self, key: Key) -> Result<bool> {
        Ok(self.search(key)?.is_some())
    }

    /// Smallest key, or `None` for an empty tree.
    pub fn min(&mut self) -> Result<Option<Key>> {
        let root = self.header()?.root_page;
        let leaf = self.edge_leaf(root, |_| 0)?;
        Ok(leaf.keys().first().copied())
    }

    /// Largest key, or `None` for an empty tree.
    pub fn max(&mut self) -> Result<Option<Key>> {
        let root = self.header()?.root_page;
        let leaf = self.edge_leaf(root, |node| node.len())?;
        Ok(leaf.keys().last().copied())
    }

    /// All keys in ascending order.
    pub fn traverse(&mut self) -> Result<Vec<Key>> {
        let root = self.header()?.root_page;
        let mut keys = Vec::new();
        self.collect_keys(root, 1, &mut keys)?;
        Ok(keys)
    }

    /// Number of keys in the tree.
    pub fn len(&mut self) -> Result<usize> {
        let root = self.header()?.root_page;
        self.count_keys(root, 1)
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        let root = self.header()?.root_page;
        Ok(self.read_node(root)?.is_empty())
    }

    /// Number of levels from the root down to the leaves.
    pub fn height(&mut self) -> Result<usize> {
        let mut page = self.header()?.root_page;
        for height in 1..=self.store.page_count() as usize {
            let node = self.read_node(page)?;
            if node.is_leaf() {
                return Ok(height);
            }
            page = node.child(0);
        }
        Err(cycle(page))
    }

    // ========================================================================
    // Insert
    // ========================================================================

    /// Insert `key`.
    ///
    /// # Errors
    /// Returns `TreeError::DuplicateKey` if `key` is already present. The
    /// tree is checked before any node is split, so a rejected insert
    /// writes nothing.
    pub fn insert(&mut self, key: Key) -> Result<()> {
        if self.search(key)?.is_some() {
            return Err(TreeError::DuplicateKey(key));
        }

        let mut page = self.header()?.root_page;
        let mut node = self.read_node(page)?;

        if node.is_full() {
            // The tree grows in height. The old root page stays as it is
            // until the header stops naming it.
            let (median, upper) = node.split();
            let lower_page = self.store.allocate(&codec::encode(&node))?;
            let upper_page = self.store.allocate(&codec::encode(&upper))?;

            let mut root = Node::new(self.degree, false)?;
            root.push_child(lower_page);
            root.attach_split(0, median, upper_page);
            let root_page = self.store.allocate(&codec::encode(&root))?;
            self.store
                .write_header(&TreeHeader::new(root_page, self.degree))?;
            debug!(old_root = page.0, new_root = root_page.0, median, "root split");

            page = root_page;
            node = root;
        }

        self.insert_nonfull(page, node, key)
    }

    /// Insert into the subtree rooted at a node known not to be full,
    /// splitting full children on the way down.
    fn insert_nonfull(&mut self, mut page: PageId, mut node: Node, key: Key) -> Result<()> {
        for _ in 0..self.store.page_count() {
            let mut index = match node.search(key) {
                Ok(_) => return Err(TreeError::DuplicateKey(key)),
                Err(index) => index,
            };

            if node.is_leaf() {
                node.insert_key_at(index, key);
                self.write_node(page, &node)?;
                trace!(page = page.0, key, slot = index, "inserted into leaf");
                return Ok(());
            }

            let mut child_page = node.child(index);
            let mut child = self.read_node(child_page)?;
            if child.is_full() {
                let (median, sibling_page, sibling) =
                    self.split_child(page, &mut node, index, child_page, &mut child)?;

                if key > median {
                    index += 1;
                    child_page = sibling_page;
                    child = sibling;
                } else if key == median {
                    return Err(TreeError::DuplicateKey(key));
                }
                debug_assert_eq!(node.child(index), child_page);
            }

            page = child_page;
            node = child;
        }
        Err(cycle(page))
    }

    /// Split the full `child` at slot `index` of `parent`.
    ///
    /// Allocates the new sibling and writes `parent` with the median before
    /// `child` is truncated, so the upper half is never absent from disk.
    fn split_child(
        &mut self,
        parent_page: PageId,
        parent: &mut Node,
        index: usize,
        child_page: PageId,
        child: &mut Node,
    ) -> Result<(Key, PageId, Node)> {
        let (median, sibling) = child.split();
        let sibling_page = self.store.allocate(&codec::encode(&sibling))?;
        parent.attach_split(index, median, sibling_page);
        self.write_node(parent_page, parent)?;
        self.write_node(child_page, child)?;

        trace!(
            child = child_page.0,
            sibling = sibling_page.0,
            median,
            "split node"
        );
        Ok((median, sibling_page, sibling))
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// Delete `key`.
    ///
    /// Descends once from the root, topping up every child below `t` keys
    /// before entering it (borrowing from a sibling or merging with one),
    /// so the leaf that finally loses a key never underflows.
    ///
    /// # Errors
    /// Returns `TreeError::NotFound` if `key` is absent. The tree is checked
    /// before any node is rebalanced, so a rejected delete writes nothing.
    pub fn delete(&mut self, mut key: Key) -> Result<()> {
        if self.search(key)?.is_none() {
            return Err(TreeError::NotFound(key));
        }

        let mut root = self.header()?.root_page;
        let mut page = root;
        let mut node = self.read_node(page)?;

        for _ in 0..self.store.page_count() {
            match node.search(key) {
                // Key in a leaf: remove it outright.
                Ok(index) if node.is_leaf() => {
                    node.remove_key_at(index);
                    self.write_node(page, &node)?;
                    trace!(page = page.0, key, "removed from leaf");
                    return Ok(());
                }

                // Key in an internal node.
                Ok(index) => {
                    let left_page = node.child(index);
                    let left = self.read_node(left_page)?;
                    if left.can_lend() {
                        let pred = self
                            .edge_leaf(left_page, |n| n.len())?
                            .keys()
                            .last()
                            .copied()
                            .ok_or_else(|| StorageError::corrupt_page("empty predecessor leaf"))?;
                        node.set_key(index, pred);
                        self.write_node(page, &node)?;
                        trace!(page = page.0, key, pred, "replaced with predecessor");

                        key = pred;
                        page = left_page;
                        node = left;
                        continue;
                    }

                    let right_page = node.child(index + 1);
                    let right = self.read_node(right_page)?;
                    if right.can_lend() {
                        let succ = self
                            .edge_leaf(right_page, |_| 0)?
                            .keys()
                            .first()
                            .copied()
                            .ok_or_else(|| StorageError::corrupt_page("empty successor leaf"))?;
                        node.set_key(index, succ);
                        self.write_node(page, &node)?;
                        trace!(page = page.0, key, succ, "replaced with successor");

                        key = succ;
                        page = right_page;
                        node = right;
                        continue;
                    }

                    // Both neighbours hold t - 1 keys: fold key and right
                    // child into the left child and delete from there.
                    let mut merged = left;
                    self.merge_children(&mut node, index, left_page, &mut merged, right_page, right)?;
                    self.persist_after_merge(&mut root, page, &node, left_page)?;

                    page = left_page;
                    node = merged;
                }

                Err(_) if node.is_leaf() => return Err(TreeError::NotFound(key)),

                // Key below this node: make sure the child can spare a key.
                Err(index) => {
                    let (child_page, child) = self.fill_child(&mut root, page, &mut node, index)?;
                    page = child_page;
                    node = child;
                }
            }
        }
        Err(cycle(page))
    }

    /// Ensure `child(index)` of `node` holds at least `t` keys, then return
    /// the (possibly merged) child to descend into.
    fn fill_child(
        &mut self,
        root: &mut PageId,
        page: PageId,
        node: &mut Node,
        index: usize,
    ) -> Result<(PageId, Node)> {
        let child_page = node.child(index);
        let mut child = self.read_node(child_page)?;
        if child.can_lend() {
            return Ok((child_page, child));
        }

        let left = if index > 0 {
            let left_page = node.child(index - 1);
            let mut left = self.read_node(left_page)?;
            if left.can_lend() {
                node.rotate_from_left(index - 1, &mut left, &mut child);
                self.write_node(child_page, &child)?;
                self.write_node(page, node)?;
                self.write_node(left_page, &left)?;
                trace!(child = child_page.0, sibling = left_page.0, "borrowed from left");
                return Ok((child_page, child));
            }
            Some((left_page, left))
        } else {
            None
        };

        let right = if index < node.len() {
            let right_page = node.child(index + 1);
            let mut right = self.read_node(right_page)?;
            if right.can_lend() {
                node.rotate_from_right(index, &mut child, &mut right);
                self.write_node(child_page, &child)?;
                self.write_node(page, node)?;
                self.write_node(right_page, &right)?;
                trace!(child = child_page.0, sibling = right_page.0, "borrowed from right");
                return Ok((child_page, child));
            }
            Some((right_page, right))
        } else {
            None
        };

        match (right, left) {
            (Some((right_page, right)), _) => {
                self.merge_children(node, index, child_page, &mut child, right_page, right)?;
                self.persist_after_merge(root, page, node, child_page)?;
                Ok((child_page, child))
            }
            (None, Some((left_page, mut left))) => {
                self.merge_children(node, index - 1, left_page, &mut left, child_page, child)?;
                self.persist_after_merge(root, page, node, left_page)?;
                Ok((left_page, left))
            }
            (None, None) => Err(StorageError::corrupt_page(format!(
                "{page} has a child but no siblings to rebalance with"
            ))
            .into()),
        }
    }

    /// Merge `child(index + 1)` and the separator `key(index)` of `parent`
    /// into `child(index)`, writing the merged child.
    fn merge_children(
        &mut self,
        parent: &mut Node,
        index: usize,
        left_page: PageId,
        left: &mut Node,
        right_page: PageId,
        right: Node,
    ) -> Result<()> {
        let separator = parent.detach_merged(index);
        left.absorb(separator, right);
        self.write_node(left_page, left)?;
        trace!(
            into = left_page.0,
            retired = right_page.0,
            separator,
            "merged siblings"
        );
        Ok(())
    }

    /// Write the parent of a merge. A root that just lost its last key is
    /// not rewritten; the header moves to the merged child instead.
    fn persist_after_merge(
        &mut self,
        root: &mut PageId,
        page: PageId,
        node: &Node,
        merged_page: PageId,
    ) -> Result<()> {
        if page == *root && node.is_empty() {
            self.store
                .write_header(&TreeHeader::new(merged_page, self.degree))?;
            debug!(old_root = page.0, new_root = merged_page.0, "root collapse");
            *root = merged_page;
            return Ok(());
        }
        self.write_node(page, node)
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Read the header from disk.
    pub fn header(&mut self) -> Result<TreeHeader> {
        self.store.read_header()?.ok_or(TreeError::NotInitialized)
    }

    /// Branching parameter `t` of this tree.
    pub fn degree(&self) -> u32 {
        self.degree
    }

    /// Decode the node stored at `page`.
    pub fn node_at(&mut self, page: PageId) -> Result<Node> {
        self.read_node(page)
    }

    /// Page I/O performed through this handle.
    pub fn io_stats(&self) -> IoStats {
        self.store.io_stats()
    }

    /// Walk the whole tree and check every structural invariant.
    ///
    /// Checks that keys are strictly increasing within each node and lie
    /// between the separators of the parent, that internal nodes have
    /// `len() + 1` children, that no node other than the root holds fewer
    /// than `t - 1` keys, that all leaves sit at the same depth and that
    /// no page is reachable twice.
    ///
    /// # Errors
    /// Returns `StorageError::CorruptPage` describing the first violation.
    pub fn validate(&mut self) -> Result<TreeStats> {
        let header = self.header()?;
        let mut walk = Validation {
            root: header.root_page,
            visited: HashSet::new(),
            leaf_depth: None,
            stats: TreeStats {
                pages: self.store.page_count(),
                ..TreeStats::default()
            },
        };
        walk.visit(self, header.root_page, None, None, 1)?;
        Ok(walk.stats)
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    /// Decode `page`, rejecting nodes built for another degree.
    fn read_node(&mut self, page: PageId) -> Result<Node> {
        let raw = self.store.read_page(page)?;
        let node = codec::decode(&raw)?;
        if node.degree() != self.degree {
            return Err(violation(
                page,
                &format!("degree {} differs from header {}", node.degree(), self.degree),
            ));
        }
        Ok(node)
    }

    fn write_node(&mut self, page: PageId, node: &Node) -> Result<()> {
        self.store.write_page(page, &codec::encode(node))?;
        Ok(())
    }

    /// Follow `pick(node)` from `page` down to a leaf.
    fn edge_leaf(&mut self, mut page: PageId, pick: impl Fn(&Node) -> usize) -> Result<Node> {
        for _ in 0..self.store.page_count() {
            let node = self.read_node(page)?;
            if node.is_leaf() {
                return Ok(node);
            }
            page = node.child(pick(&node));
        }
        Err(cycle(page))
    }

    fn collect_keys(&mut self, page: PageId, depth: u32, out: &mut Vec<Key>) -> Result<()> {
        if depth > self.store.page_count() {
            return Err(cycle(page));
        }
        let node = self.read_node(page)?;
        if node.is_leaf() {
            out.extend_from_slice(node.keys());
            return Ok(());
        }
        for (index, &key) in node.keys().iter().enumerate() {
            self.collect_keys(node.child(index), depth + 1, out)?;
            out.push(key);
        }
        self.collect_keys(node.child(node.len()), depth + 1, out)
    }

    fn count_keys(&mut self, page: PageId, depth: u32) -> Result<usize> {
        if depth > self.store.page_count() {
            return Err(cycle(page));
        }
        let node = self.read_node(page)?;
        let mut count = node.len();
        for &child in node.children() {
            count += self.count_keys(child, depth + 1)?;
        }
        Ok(count)
    }
}

/// State carried through [`BTree::validate`].
struct Validation {
    root: PageId,
    visited: HashSet<PageId>,
    leaf_depth: Option<usize>,
    stats: TreeStats,
}

impl Validation {
    /// Check the subtree at `page`, whose keys must lie strictly between
    /// `lower` and `upper`.
    fn visit(
        &mut self,
        tree: &mut BTree,
        page: PageId,
        lower: Option<Key>,
        upper: Option<Key>,
        depth: usize,
    ) -> Result<()> {
        if !self.visited.insert(page) {
            return Err(violation(page, "reachable more than once"));
        }
        let node = tree.read_node(page)?;

        if node.keys().windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(violation(page, "keys not strictly increasing"));
        }
        let below = |k: Key| lower.is_some_and(|lo| k <= lo);
        let above = |k: Key| upper.is_some_and(|hi| k >= hi);
        if node.keys().iter().any(|&k| below(k) || above(k)) {
            return Err(violation(page, "key outside parent separators"));
        }
        if page != self.root && node.len() < node.min_keys() {
            return Err(violation(
                page,
                &format!("{} keys, below minimum {}", node.len(), node.min_keys()),
            ));
        }
        if page == self.root && !node.is_leaf() && node.is_empty() {
            return Err(violation(page, "internal root without keys"));
        }

        self.stats.nodes += 1;
        self.stats.keys += node.len();
        self.stats.height = self.stats.height.max(depth);

        if node.is_leaf() {
            self.stats.leaves += 1;
            match self.leaf_depth {
                None => self.leaf_depth = Some(depth),
                Some(expected) if expected != depth => {
                    return Err(violation(
                        page,
                        &format!("leaf at depth {depth}, expected {expected}"),
                    ));
                }
                Some(_) => {}
            }
            return Ok(());
        }

        for (index, &child) in node.children().iter().enumerate() {
            let lo = if index == 0 { lower } else { Some(node.key(index - 1)) };
            let hi = if index == node.len() { upper } else { Some(node.key(index)) };
            self.visit(tree, child, lo, hi, depth + 1)?;
        }
        Ok(())
    }
}

fn violation(page: PageId, reason: &str) -> TreeError {
    StorageError::corrupt_page(format!("{page}: {reason}")).into()
}

/// A walk from the root visited more nodes than the file holds pages.
fn cycle(page: PageId) -> TreeError {
    violation(page, "descent longer than the page count")
}
