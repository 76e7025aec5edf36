//! Tree header stored at file offset 0.

use crate::common::config::{validate_degree, HEADER_SIZE};
use crate::common::{PageId, StorageError, StorageResult};

/// The two-field record preceding all pages.
///
/// # Layout (8 bytes, little-endian)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     root_page (int32)
/// 4       4     degree    (int32)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeHeader {
    /// Page holding the current root node.
    pub root_page: PageId,
    /// Branching parameter `t`.
    pub degree: u32,
}

impl TreeHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = HEADER_SIZE;

    pub const OFFSET_ROOT_PAGE: usize = 0;
    pub const OFFSET_DEGREE: usize = 4;

    pub fn new(root_page: PageId, degree: u32) -> Self {
        Self { root_page, degree }
    }

    /// Decode a header.
    ///
    /// # Errors
    /// Returns `StorageError::CorruptHeader` for a negative root page or a
    /// degree no tree could have been initialized with.
    pub fn from_bytes(data: &[u8; HEADER_SIZE]) -> StorageResult<Self> {
        let root = i32::from_le_bytes(word(data, Self::OFFSET_ROOT_PAGE));
        let degree = i32::from_le_bytes(word(data, Self::OFFSET_DEGREE));

        let root_page = u32::try_from(root)
            .map(PageId::new)
            .map_err(|_| StorageError::corrupt_header(format!("negative root page {root}")))?;
        let degree = u32::try_from(degree)
            .ok()
            .filter(|&d| validate_degree(d).is_ok())
            .ok_or_else(|| StorageError::corrupt_header(format!("degree {degree} out of range")))?;

        Ok(Self { root_page, degree })
    }

    /// Encode the header.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut data = [0u8; HEADER_SIZE];
        data[Self::OFFSET_ROOT_PAGE..Self::OFFSET_ROOT_PAGE + 4]
            .copy_from_slice(&self.root_page.to_le_bytes());
        data[Self::OFFSET_DEGREE..Self::OFFSET_DEGREE + 4]
            .copy_from_slice(&(self.degree as i32).to_le_bytes());
        data
    }
}

fn word(data: &[u8; HEADER_SIZE], offset: usize) -> [u8; 4] {
    [
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ]
}
