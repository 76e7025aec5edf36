//! Configuration for pagetree.
//!
//! Two kinds of settings live here:
//! - Compile-time layout constants that fix the on-disk format
//! - [`TreeConfig`], the runtime options chosen when a tree is initialized

use crate::common::error::{Result, TreeError};

/// Size of a page in bytes.
///
/// One page holds exactly one serialized B-tree node. 512 bytes fits
/// 62 keys and 63 child pointers plus the node metadata.
pub const PAGE_SIZE: usize = 512;

/// Size of the tree header at file offset 0 (`root_page:i32`, `degree:i32`).
pub const HEADER_SIZE: usize = 8;

/// Number of key slots in a page.
pub const MAX_KEYS: usize = 62;

/// Number of child pointer slots in a page.
pub const MAX_CHILDREN: usize = MAX_KEYS + 1;

/// Smallest usable branching parameter `t`.
pub const MIN_DEGREE: u32 = 2;

/// Largest branching parameter whose full node (`2t - 1` keys) fits in a page.
pub const MAX_DEGREE: u32 = ((MAX_KEYS + 1) / 2) as u32;

/// Bytes used by the node layout before padding:
/// `degree + count + keys + children + is_leaf`.
pub const NODE_LAYOUT_SIZE: usize = 4 + 4 + 4 * MAX_KEYS + 4 * MAX_CHILDREN + 1;

const _: () = assert!(NODE_LAYOUT_SIZE <= PAGE_SIZE);
const _: () = assert!(2 * MAX_DEGREE as usize - 1 <= MAX_KEYS);

/// When the block store forces written data to stable storage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// `fsync` after every page write, allocation and header write.
    #[default]
    EveryWrite,
    /// Hand writes to the OS without `fsync`.
    ///
    /// Writes are still unbuffered in user space, so every read observes
    /// them, but a power loss may drop them. Useful for tests and bulk loads.
    OsBuffered,
}

/// Options used when initializing or opening a tree.
///
/// # Example
/// ```
/// use pagetree::{SyncPolicy, TreeConfig};
///
/// let config = TreeConfig::new(4).with_sync(SyncPolicy::OsBuffered);
/// assert!(config.validate().is_ok());
/// assert!(TreeConfig::new(1).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    /// Branching parameter `t`. Ignored when opening an existing file,
    /// whose header carries its own degree.
    pub degree: u32,
    /// Durability of individual writes.
    pub sync: SyncPolicy,
}

impl TreeConfig {
    /// Default branching parameter.
    pub const DEFAULT_DEGREE: u32 = 3;

    /// Config with the given degree and the durable sync policy.
    pub fn new(degree: u32) -> Self {
        Self {
            degree,
            sync: SyncPolicy::EveryWrite,
        }
    }

    /// Replace the sync policy.
    pub fn with_sync(mut self, sync: SyncPolicy) -> Self {
        self.sync = sync;
        self
    }

    /// Check that `degree` lies in `MIN_DEGREE..=MAX_DEGREE`.
    pub fn validate(&self) -> Result<()> {
        validate_degree(self.degree)
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DEGREE)
    }
}

/// Reject a degree that is below 2 or whose full node would not fit a page.
pub fn validate_degree(degree: u32) -> Result<()> {
    if (MIN_DEGREE..=MAX_DEGREE).contains(&degree) {
        Ok(())
    } else {
        Err(TreeError::InvalidDegree(degree))
    }
}
