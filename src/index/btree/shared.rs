//! Thread-safe handle to a [`BTree`].

use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::Result;
use crate::index::btree::{BTree, Key, Location, TreeStats};

/// Cloneable handle that serializes every operation on one tree.
///
/// The tree itself supports a single caller at a time; this wraps it in a
/// `parking_lot::Mutex` so each operation runs to completion before the
/// next one starts, whichever thread issues it.
///
/// # Example
/// ```no_run
/// use pagetree::{BTree, SharedBTree};
///
/// let shared = SharedBTree::new(BTree::init("keys.db", 4).unwrap());
/// let worker = shared.clone();
/// std::thread::spawn(move || worker.insert(7).unwrap()).join().unwrap();
/// assert!(shared.contains(7).unwrap());
/// ```
#[derive(Clone)]
pub struct SharedBTree {
    inner: Arc<Mutex<BTree>>,
}

impl SharedBTree {
    pub fn new(tree: BTree) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tree)),
        }
    }

    pub fn insert(&self, key: Key) -> Result<()> {
        self.inner.lock().insert(key)
    }

    pub fn delete(&self, key: Key) -> Result<()> {
        self.inner.lock().delete(key)
    }

    pub fn search(&self, key: Key) -> Result<Option<Location>> {
        self.inner.lock().search(key)
    }

    pub fn contains(&self, key: Key) -> Result<bool> {
        self.inner.lock().contains(key)
    }

    pub fn len(&self) -> Result<usize> {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.inner.lock().is_empty()
    }

    pub fn traverse(&self) -> Result<Vec<Key>> {
        self.inner.lock().traverse()
    }

    pub fn validate(&self) -> Result<TreeStats> {
        self.inner.lock().validate()
    }

    /// Run several operations under one lock acquisition.
    pub fn with<R>(&self, f: impl FnOnce(&mut BTree) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Recover the tree once this is the last handle.
    pub fn into_inner(self) -> Option<BTree> {
        Arc::try_unwrap(self.inner).ok().map(Mutex::into_inner)
    }
}

impl From<BTree> for SharedBTree {
    fn from(tree: BTree) -> Self {
        Self::new(tree)
    }
}
