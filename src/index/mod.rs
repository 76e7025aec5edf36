//! Index structures.
//!
//! - [`btree`] - Disk-resident B-tree

pub mod btree;
