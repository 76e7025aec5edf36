//! Page - the fixed-size unit of storage.
//!
//! A [`Page`] is a raw 512-byte block that serves as the unit of I/O
//! between the tree file and memory. Each page holds one encoded node.

use crate::common::config::PAGE_SIZE;

/// A page of data (512 bytes, sector-aligned).
///
/// # Clone Implementation
/// `Page` does NOT implement `Clone` in production code; copies should be
/// explicit. A `#[cfg(test)]` Clone is provided for tests.
///
/// # Example
/// ```
/// use pagetree::storage::page::Page;
///
/// let mut page = Page::new();
/// page.as_mut_slice()[0] = 0xFF;
/// assert_eq!(page.as_slice()[0], 0xFF);
/// ```
#[repr(align(512))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    /// Get immutable slice of page data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of page data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Read a little-endian `i32` at `offset`.
    #[inline]
    pub(crate) fn read_i32(&self, offset: usize) -> i32 {
        i32::from_le_bytes(self.read_word(offset))
    }

    /// Read the four raw bytes at `offset`.
    #[inline]
    pub(crate) fn read_word(&self, offset: usize) -> [u8; 4] {
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.data[offset..offset + 4]);
        word
    }

    /// Write four raw bytes at `offset`.
    #[inline]
    pub(crate) fn write_word(&mut self, offset: usize, word: [u8; 4]) {
        self.data[offset..offset + 4].copy_from_slice(&word);
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

// Clone only available in tests - forces explicit copying in production
#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        let mut new_page = Page::new();
        new_page.data.copy_from_slice(&self.data);
        new_page
    }
}

// ============================================================================
// TESTS
// ============================================================================
