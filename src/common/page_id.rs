//! Page identifier type.

use std::fmt;

/// Identifies a page in the tree file.
///
/// Page `N` lives at byte offset `HEADER_SIZE + N * PAGE_SIZE`. On disk it is
/// written as a little-endian `int32`, so only the lower 2^31 values are
/// representable by other readers of the format.
///
/// # Example
/// ```
/// use pagetree::PageId;
///
/// let page_id = PageId::new(42);
/// assert_eq!(page_id.0, 42);
/// assert_eq!(page_id.offset(), 8 + 42 * 512);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Byte offset of this page in the tree file.
    #[inline]
    pub fn offset(&self) -> u64 {
        crate::common::config::HEADER_SIZE as u64
            + (self.0 as u64) * (crate::common::config::PAGE_SIZE as u64)
    }

    #[inline]
    pub(crate) fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    #[inline]
    pub(crate) fn from_le_bytes(bytes: [u8; 4]) -> Self {
        PageId(u32::from_le_bytes(bytes))
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_new() {
        let pid = PageId::new(42);
        assert_eq!(pid.0, 42);
    }

    #[test]
    fn test_page_id_offset() {
        assert_eq!(PageId::new(0).offset(), 8);
        assert_eq!(PageId::new(1).offset(), 520);
        assert_eq!(PageId::new(u32::MAX).offset(), 8 + (u32::MAX as u64) * 512);
    }

    #[test]
    fn test_page_id_ordering() {
        assert!(PageId::new(1) < PageId::new(2));
        assert!(PageId::new(5) > PageId::new(3));
    }

    #[test]
    fn test_page_id_display() {
        assert_eq!(format!("{}", PageId::new(42)), "Page(42)");
    }
}
