//! B-tree index implementation.
//!
//! # Components
//! - [`BoundedVec`] - Fixed-capacity key/child arrays
//! - [`Node`] - One decoded page plus split/merge/borrow primitives
//! - [`BTree`] - The engine: search, insert, delete
//! - [`SharedBTree`] - Thread-safe handle
//! - [`TreeStats`] - Shape reported by validation

mod bounded;
mod node;
mod shared;
mod stats;
mod tree;

pub use bounded::BoundedVec;
pub use node::{Key, Node};
pub use shared::SharedBTree;
pub use stats::TreeStats;
pub use tree::{BTree, Location};
