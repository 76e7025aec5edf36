//! Error types for pagetree.
//!
//! Errors are split by layer:
//! - [`StorageError`] - faults from the block store and page codec
//! - [`TreeError`] - everything a caller of the B-tree can observe

use thiserror::Error;

use crate::common::PageId;
use crate::index::btree::Key;

/// Convenient Result type alias for tree operations.
///
/// Instead of writing `Result<T, TreeError>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, TreeError>;

/// Result type for the storage layer.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Faults raised below the tree engine.
///
/// None of these are retried. A local file has no transient-failure model,
/// so they abort the current tree operation immediately.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Page index beyond the allocated extent of the file.
    ///
    /// The tree only follows page references it wrote itself, so this
    /// indicates corruption or a bookkeeping bug, never a user error.
    #[error("{page} out of range (file holds {page_count} pages)")]
    OutOfRange { page: PageId, page_count: u32 },

    /// A page did not decode into a well-formed node.
    #[error("corrupt page: {reason}")]
    CorruptPage { reason: String },

    /// The header region holds values no tree could have written.
    #[error("corrupt header: {reason}")]
    CorruptHeader { reason: String },
}

/// Errors returned by [`BTree`](crate::BTree) operations.
#[derive(Debug, Error)]
pub enum TreeError {
    /// A storage fault aborted the operation.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// `init` was called on a file that already holds pages.
    #[error("tree file is already initialized")]
    AlreadyInitialized,

    /// `open` was called on a file without a header or root page.
    #[error("tree file is not initialized")]
    NotInitialized,

    /// `insert` was called with a key that is already present.
    #[error("key {0} is already present")]
    DuplicateKey(Key),

    /// `delete` was called with a key that is not present.
    #[error("key {0} not found")]
    NotFound(Key),

    /// The requested degree is below 2 or too large for a page.
    #[error("invalid degree {0}")]
    InvalidDegree(u32),
}

impl From<std::io::Error> for TreeError {
    fn from(err: std::io::Error) -> Self {
        TreeError::Storage(StorageError::Io(err))
    }
}

impl StorageError {
    pub(crate) fn corrupt_page(reason: impl Into<String>) -> Self {
        StorageError::CorruptPage {
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt_header(reason: impl Into<String>) -> Self {
        StorageError::CorruptHeader {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::OutOfRange {
            page: PageId::new(7),
            page_count: 3,
        };
        assert_eq!(format!("{}", err), "Page(7) out of range (file holds 3 pages)");

        assert_eq!(format!("{}", TreeError::DuplicateKey(42)), "key 42 is already present");
        assert_eq!(format!("{}", TreeError::NotFound(-1)), "key -1 not found");
    }

    #[test]
    fn test_storage_error_is_transparent() {
        let err: TreeError = StorageError::corrupt_page("bad count").into();
        assert_eq!(format!("{}", err), "corrupt page: bad count");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TreeError = io_err.into();

        match err {
            TreeError::Storage(StorageError::Io(_)) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_result_type_alias() {
        fn might_fail() -> Result<u32> {
            Ok(42)
        }

        assert_eq!(might_fail().unwrap(), 42);
    }
}
