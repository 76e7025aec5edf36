//! Block store I/O counters.

use std::fmt;

/// Page-level I/O performed by a [`BlockStore`](crate::storage::BlockStore).
///
/// Header reads and writes are not counted.
///
/// # Example
/// ```
/// use pagetree::storage::IoStats;
///
/// let stats = IoStats { pages_read: 3, pages_written: 1, pages_allocated: 1 };
/// assert_eq!(stats.total(), 5);
/// println!("{}", stats);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IoStats {
    /// Pages read with `read_page`.
    pub pages_read: u64,
    /// Pages overwritten with `write_page`.
    pub pages_written: u64,
    /// Pages appended with `allocate`.
    pub pages_allocated: u64,
}

impl IoStats {
    /// Total page operations of any kind.
    pub fn total(&self) -> u64 {
        self.pages_read + self.pages_written + self.pages_allocated
    }

    /// Counters accumulated since `earlier` was taken.
    pub fn since(&self, earlier: &IoStats) -> IoStats {
        IoStats {
            pages_read: self.pages_read.saturating_sub(earlier.pages_read),
            pages_written: self.pages_written.saturating_sub(earlier.pages_written),
            pages_allocated: self.pages_allocated.saturating_sub(earlier.pages_allocated),
        }
    }
}

impl fmt::Display for IoStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IoStats {{ read: {}, written: {}, allocated: {} }}",
            self.pages_read, self.pages_written, self.pages_allocated
        )
    }
}
