//! Structural statistics gathered by [`BTree::validate`](crate::BTree::validate).

use std::fmt;

/// Shape of a tree that passed validation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    /// Number of levels (a lone root leaf has height 1).
    pub height: usize,
    /// Nodes reachable from the root.
    pub nodes: usize,
    /// Leaves reachable from the root.
    pub leaves: usize,
    /// Keys stored in the tree.
    pub keys: usize,
    /// Pages in the file, reachable or not.
    pub pages: u32,
}

impl TreeStats {
    /// Pages no longer referenced by the tree (old roots replaced by a
    /// split or a collapse, right halves absorbed by merges).
    pub fn orphaned_pages(&self) -> u32 {
        self.pages.saturating_sub(self.nodes as u32)
    }
}

impl fmt::Display for TreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TreeStats {{ height: {}, nodes: {}, leaves: {}, keys: {}, orphaned: {} }}",
            self.height,
            self.nodes,
            self.leaves,
            self.keys,
            self.orphaned_pages()
        )
    }
}
