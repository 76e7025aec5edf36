//! pagetree - a disk-resident B-tree index.
//!
//! Nodes live in fixed 512-byte pages of a single file rather than in
//! memory, so key sets far larger than RAM are searched, inserted into and
//! deleted from with a logarithmic number of page reads.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           pagetree                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Index Layer (index/btree/)                  │   │
//! │  │   BTree: search · insert (split) · delete (borrow/merge) │   │
//! │  │   Node + BoundedVec          SharedBTree (Mutex handle)  │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │   BlockStore + TreeHeader + Page + node codec            │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, errors, config)
//! - [`storage`] - File I/O, header and page formats
//! - [`index`] - The B-tree engine
//!
//! # Logging
//! The engine emits `tracing` events (`debug` for root splits and
//! collapses, `trace` for descents, splits, borrows and merges). Install a
//! subscriber in the embedding application to see them.
//!
//! # Quick Start
//! ```no_run
//! use pagetree::BTree;
//!
//! let mut tree = BTree::init("keys.db", 3).unwrap();
//! for key in [32, 16, 48, 128, 8] {
//!     tree.insert(key).unwrap();
//! }
//! assert!(tree.search(48).unwrap().is_some());
//! tree.close().unwrap();
//!
//! let mut tree = BTree::open("keys.db").unwrap();
//! assert_eq!(tree.traverse().unwrap(), vec![8, 16, 32, 48, 128]);
//! ```

pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{SyncPolicy, TreeConfig, PAGE_SIZE};
pub use common::{PageId, Result, StorageError, TreeError};

pub use index::btree::{BTree, Key, Location, Node, SharedBTree, TreeStats};
pub use storage::{BlockStore, IoStats, TreeHeader};
