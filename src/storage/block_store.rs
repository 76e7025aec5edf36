//! Block Store - page-addressed file I/O for the tree.
//!
//! The [`BlockStore`] handles all direct file operations:
//! - Reading and writing the header region
//! - Reading and overwriting allocated pages
//! - Allocating new pages by appending to the file

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::config::{SyncPolicy, HEADER_SIZE, PAGE_SIZE};
use crate::common::{PageId, StorageError, StorageResult};
use crate::storage::page::Page;
use crate::storage::{IoStats, TreeHeader};

/// Manages disk I/O for a single tree file.
///
/// # File Layout
/// ```text
/// ┌────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Header │ Page 0  │ Page 1  │  ...    │ Page N  │
/// │ (8B)   │ (512B)  │ (512B)  │         │ (512B)  │
/// └────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset: 0   8       520       ...   8 + N×512
/// ```
///
/// # Range checks
/// The number of allocated pages is `(file_size - HEADER_SIZE) / PAGE_SIZE`
/// computed in unsigned, saturating arithmetic: a file shorter than the
/// header holds zero pages, and a trailing partial page is not counted.
/// Page `page_count - 1` is the last readable page; `page_count` is out of
/// range for both reads and writes. Only [`allocate`](Self::allocate) grows
/// the file.
///
/// # Durability
/// Every call writes straight to the file with no user-space buffering.
/// Under [`SyncPolicy::EveryWrite`] each write is followed by `fsync()`.
pub struct BlockStore {
    file: File,
    /// Number of whole pages in the file.
    page_count: u32,
    sync: SyncPolicy,
    stats: IoStats,
    /// Writes left before every further write fails.
    #[cfg(test)]
    write_budget: Option<u64>,
}

impl BlockStore {
    /// Create a new, empty tree file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, sync: SyncPolicy) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            page_count: 0,
            sync,
            stats: IoStats::default(),
            #[cfg(test)]
            write_budget: None,
        })
    }

    /// Open an existing tree file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P, sync: SyncPolicy) -> StorageResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let page_count = pages_in(file.metadata()?.len());

        Ok(Self {
            file,
            page_count,
            sync,
            stats: IoStats::default(),
            #[cfg(test)]
            write_budget: None,
        })
    }

    /// Open an existing tree file, or create it if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P, sync: SyncPolicy) -> StorageResult<Self> {
        if path.as_ref().exists() {
            Self::open(path, sync)
        } else {
            Self::create(path, sync)
        }
    }

    /// Read the header, or `None` if the file is shorter than the header.
    pub fn read_header(&mut self) -> StorageResult<Option<TreeHeader>> {
        if self.file.metadata()?.len() < HEADER_SIZE as u64 {
            return Ok(None);
        }

        let mut data = [0u8; HEADER_SIZE];
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_exact(&mut data)?;

        TreeHeader::from_bytes(&data).map(Some)
    }

    /// Overwrite the header.
    pub fn write_header(&mut self, header: &TreeHeader) -> StorageResult<()> {
        self.begin_write()?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&header.to_bytes())?;
        self.sync_if_needed()
    }

    /// Read a page from disk.
    ///
    /// # Errors
    /// Returns `StorageError::OutOfRange` if the page hasn't been allocated.
    pub fn read_page(&mut self, page_id: PageId) -> StorageResult<Page> {
        self.check_range(page_id)?;

        self.file.seek(SeekFrom::Start(page_id.offset()))?;
        let mut page = Page::new();
        self.file.read_exact(page.as_mut_slice())?;
        self.stats.pages_read += 1;

        Ok(page)
    }

    /// Overwrite an allocated page.
    ///
    /// # Errors
    /// Returns `StorageError::OutOfRange` if the page hasn't been allocated.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> StorageResult<()> {
        self.check_range(page_id)?;
        self.begin_write()?;

        self.file.seek(SeekFrom::Start(page_id.offset()))?;
        self.file.write_all(page.as_slice())?;
        self.stats.pages_written += 1;
        self.sync_if_needed()
    }

    /// Append `page` at the end of the file and return its index.
    pub fn allocate(&mut self, page: &Page) -> StorageResult<PageId> {
        let page_id = PageId::new(self.page_count);
        self.begin_write()?;

        self.file.seek(SeekFrom::Start(page_id.offset()))?;
        self.file.write_all(page.as_slice())?;
        self.sync_if_needed()?;

        self.page_count += 1;
        self.stats.pages_allocated += 1;
        Ok(page_id)
    }

    /// Force everything written so far to stable storage.
    pub fn sync(&mut self) -> StorageResult<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Get the number of allocated pages.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Page I/O performed through this handle.
    #[inline]
    pub fn io_stats(&self) -> IoStats {
        self.stats
    }

    fn check_range(&self, page_id: PageId) -> StorageResult<()> {
        if page_id.0 >= self.page_count {
            return Err(StorageError::OutOfRange {
                page: page_id,
                page_count: self.page_count,
            });
        }
        Ok(())
    }

    /// Let the next `n` header or page writes through, then fail the rest.
    #[cfg(test)]
    pub(crate) fn fail_writes_after(&mut self, n: u64) {
        self.write_budget = Some(n);
    }

    #[cfg(test)]
    fn begin_write(&mut self) -> StorageResult<()> {
        if let Some(left) = self.write_budget.as_mut() {
            if *left == 0 {
                return Err(std::io::Error::other("write budget exhausted").into());
            }
            *left -= 1;
        }
        Ok(())
    }

    #[cfg(not(test))]
    #[inline]
    fn begin_write(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn sync_if_needed(&mut self) -> StorageResult<()> {
        if self.sync == SyncPolicy::EveryWrite {
            self.file.sync_all()?;
        }
        Ok(())
    }
}

/// Whole pages contained in a file of `file_len` bytes.
fn pages_in(file_len: u64) -> u32 {
    let pages = file_len.saturating_sub(HEADER_SIZE as u64) / PAGE_SIZE as u64;
    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn page_with(byte: u8) -> Page {
        let mut page = Page::new();
        page.as_mut_slice()[0] = byte;
        page.as_mut_slice()[PAGE_SIZE - 1] = byte;
        page
    }

    #[test]
    fn test_pages_in_saturates() {
        assert_eq!(pages_in(0), 0);
        assert_eq!(pages_in(7), 0);
        assert_eq!(pages_in(8), 0);
        assert_eq!(pages_in(8 + 511), 0);
        assert_eq!(pages_in(8 + 512), 1);
        assert_eq!(pages_in(8 + 3 * 512 + 100), 3);
        assert_eq!(pages_in(u64::MAX), u32::MAX);
    }

    #[test]
    fn test_create_new_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tree.db");

        let mut store = BlockStore::create(&path, SyncPolicy::EveryWrite).unwrap();
        assert_eq!(store.page_count(), 0);
        assert!(store.read_header().unwrap().is_none());
    }

    #[test]
    fn test_create_existing_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tree.db");

        BlockStore::create(&path, SyncPolicy::EveryWrite).unwrap();
        assert!(BlockStore::create(&path, SyncPolicy::EveryWrite).is_err());
    }

    #[test]
    fn test_open_nonexistent_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.db");

        assert!(BlockStore::open(&path, SyncPolicy::EveryWrite).is_err());
    }

    #[test]
    fn test_header_roundtrip_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tree.db");

        let mut store = BlockStore::create(&path, SyncPolicy::EveryWrite).unwrap();
        let header = TreeHeader::new(PageId::new(4), 3);
        store.write_header(&header).unwrap();

        assert_eq!(store.read_header().unwrap(), Some(header));
        assert_eq!(store.page_count(), 0);
    }

    #[test]
    fn test_allocate_and_read_page() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tree.db");

        let mut store = BlockStore::create(&path, SyncPolicy::EveryWrite).unwrap();
        store.write_header(&TreeHeader::new(PageId::new(0), 3)).unwrap();

        let first = store.allocate(&page_with(0xAB)).unwrap();
        let second = store.allocate(&page_with(0xCD)).unwrap();
        assert_eq!(first, PageId::new(0));
        assert_eq!(second, PageId::new(1));
        assert_eq!(store.page_count(), 2);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 8 + 2 * 512);

        assert_eq!(store.read_page(first).unwrap().as_slice()[0], 0xAB);
        assert_eq!(store.read_page(second).unwrap().as_slice()[511], 0xCD);

        let stats = store.io_stats();
        assert_eq!(stats.pages_allocated, 2);
        assert_eq!(stats.pages_read, 2);
        assert_eq!(stats.pages_written, 0);
    }

    #[test]
    fn test_write_page_overwrites_in_place() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tree.db");

        let mut store = BlockStore::create(&path, SyncPolicy::OsBuffered).unwrap();
        store.write_header(&TreeHeader::new(PageId::new(0), 3)).unwrap();
        let pid = store.allocate(&page_with(1)).unwrap();

        store.write_page(pid, &page_with(2)).unwrap();

        assert_eq!(store.read_page(pid).unwrap().as_slice()[0], 2);
        assert_eq!(store.page_count(), 1);
    }

    #[test]
    fn test_failed_write_leaves_file_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tree.db");

        let mut store = BlockStore::create(&path, SyncPolicy::OsBuffered).unwrap();
        store.write_header(&TreeHeader::new(PageId::new(0), 3)).unwrap();
        let pid = store.allocate(&page_with(1)).unwrap();

        store.fail_writes_after(1);
        store.write_page(pid, &page_with(2)).unwrap();
        assert!(matches!(
            store.allocate(&page_with(3)),
            Err(StorageError::Io(_))
        ));
        assert!(store.write_page(pid, &page_with(4)).is_err());
        assert!(store
            .write_header(&TreeHeader::new(PageId::new(0), 4))
            .is_err());

        assert_eq!(store.page_count(), 1);
        assert_eq!(store.read_page(pid).unwrap().as_slice()[0], 2);
        assert_eq!(store.read_header().unwrap().map(|h| h.degree), Some(3));
    }

    #[test]
    fn test_range_boundary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tree.db");

        let mut store = BlockStore::create(&path, SyncPolicy::OsBuffered).unwrap();
        store.write_header(&TreeHeader::new(PageId::new(0), 3)).unwrap();
        for i in 0..3 {
            store.allocate(&page_with(i)).unwrap();
        }

        // page_count - 1 is valid, page_count is not
        assert!(store.read_page(PageId::new(2)).is_ok());
        assert!(store.write_page(PageId::new(2), &Page::new()).is_ok());
        assert!(matches!(
            store.read_page(PageId::new(3)),
            Err(StorageError::OutOfRange { page_count: 3, .. })
        ));
        assert!(matches!(
            store.write_page(PageId::new(3), &Page::new()),
            Err(StorageError::OutOfRange { .. })
        ));
        assert!(store.read_page(PageId::new(u32::MAX)).is_err());
    }

    #[test]
    fn test_write_before_allocate_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tree.db");

        let mut store = BlockStore::create(&path, SyncPolicy::EveryWrite).unwrap();
        assert!(store.write_page(PageId::new(0), &Page::new()).is_err());
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tree.db");

        {
            let mut store = BlockStore::create(&path, SyncPolicy::EveryWrite).unwrap();
            store.write_header(&TreeHeader::new(PageId::new(1), 4)).unwrap();
            store.allocate(&page_with(0x11)).unwrap();
            store.allocate(&page_with(0x22)).unwrap();
        }

        {
            let mut store = BlockStore::open(&path, SyncPolicy::EveryWrite).unwrap();
            assert_eq!(store.page_count(), 2);
            assert_eq!(
                store.read_header().unwrap(),
                Some(TreeHeader::new(PageId::new(1), 4))
            );
            assert_eq!(store.read_page(PageId::new(1)).unwrap().as_slice()[0], 0x22);
        }
    }

    #[test]
    fn test_partial_trailing_page_is_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tree.db");

        {
            let mut store = BlockStore::create(&path, SyncPolicy::EveryWrite).unwrap();
            store.write_header(&TreeHeader::new(PageId::new(0), 3)).unwrap();
            store.allocate(&page_with(1)).unwrap();
        }
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&[0xFF; 100]).unwrap();
        }

        let mut store = BlockStore::open(&path, SyncPolicy::EveryWrite).unwrap();
        assert_eq!(store.page_count(), 1);

        // the next allocation reclaims the torn tail
        let pid = store.allocate(&page_with(2)).unwrap();
        assert_eq!(pid, PageId::new(1));
        assert_eq!(store.read_page(pid).unwrap().as_slice()[0], 2);
    }

    #[test]
    fn test_open_or_create() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tree.db");

        {
            let mut store = BlockStore::open_or_create(&path, SyncPolicy::EveryWrite).unwrap();
            store.write_header(&TreeHeader::new(PageId::new(0), 3)).unwrap();
            store.allocate(&Page::new()).unwrap();
        }

        let store = BlockStore::open_or_create(&path, SyncPolicy::EveryWrite).unwrap();
        assert_eq!(store.page_count(), 1);
    }
}
