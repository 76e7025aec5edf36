//! Storage layer - disk I/O and page formats.
//!
//! This module handles persistent storage:
//! - [`BlockStore`] - Page-addressed file I/O
//! - [`TreeHeader`] - The record at file offset 0
//! - [`IoStats`] - Page I/O counters
//! - [`page`] - Page types and the node codec

mod block_store;
mod header;
mod io_stats;
pub mod page;

pub use block_store::BlockStore;
pub use header::TreeHeader;
pub use io_stats::IoStats;
