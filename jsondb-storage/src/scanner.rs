//! Forward-only scanner over a store's entries.
//!
//! A scanner snapshots the store's id list once, at construction, then reads
//! entries lazily as it advances. Ids created or deleted during the scan do
//! not change its length; a record deleted after the snapshot surfaces as
//! `NotFound` when its turn comes.

use std::marker::PhantomData;

use jsondb_core::{Entry, EntryId, StorageError, StorageResult};

use crate::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Unstarted,
    Positioned(usize),
    Exhausted,
}

/// Record scanner. Used for iterating over all the records in a store.
///
/// ```ignore
/// let mut scanner = store.scanner()?;
/// while scanner.scan() {
///     let entry = scanner.read()?;
/// }
/// ```
pub struct Scanner<'a, E, S: ?Sized> {
    store: &'a mut S,
    ids: Vec<EntryId>,
    state: ScanState,
    _entry: PhantomData<fn() -> E>,
}

impl<'a, E: Entry, S: Store<E> + ?Sized> Scanner<'a, E, S> {
    /// Snapshot the ids of `store` and position before the first one.
    pub fn new(store: &'a mut S) -> StorageResult<Self> {
        let ids = store.list_ids()?;
        tracing::trace!(count = ids.len(), "scanner created");
        Ok(Self {
            store,
            ids,
            state: ScanState::Unstarted,
            _entry: PhantomData,
        })
    }

    /// Advance to the next id. Returns `false` once the snapshot is used up,
    /// and keeps returning `false` after that.
    pub fn scan(&mut self) -> bool {
        let next = match self.state {
            ScanState::Unstarted => 0,
            ScanState::Positioned(pos) => pos + 1,
            ScanState::Exhausted => return false,
        };
        if next < self.ids.len() {
            self.state = ScanState::Positioned(next);
            true
        } else {
            self.state = ScanState::Exhausted;
            false
        }
    }

    /// Id at the current position, if the last `scan` returned `true`.
    pub fn current_id(&self) -> Option<&EntryId> {
        match self.state {
            ScanState::Positioned(pos) => self.ids.get(pos),
            _ => None,
        }
    }

    /// Zero-based index of the current entry.
    pub fn position(&self) -> Option<usize> {
        match self.state {
            ScanState::Positioned(pos) => Some(pos),
            _ => None,
        }
    }

    /// Read the current entry. See [`Store::read`] for error behaviour.
    ///
    /// # Errors
    ///
    /// [`StorageError::ScannerNotPositioned`] before the first successful
    /// `scan` and after `scan` has returned `false`.
    pub fn read(&mut self) -> StorageResult<E> {
        let id = self.require_current()?.clone();
        self.store.read(&id)
    }

    /// Read the current entry into a caller-owned value.
    pub fn read_into(&mut self, target: &mut E) -> StorageResult<()> {
        let id = self.require_current()?.clone();
        self.store.read_into(&id, target)
    }

    /// Number of ids captured when the scanner was created.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The store being scanned, for writes made mid-scan. Deleting an id
    /// that is still ahead makes its turn yield `NotFound`; the snapshot
    /// and `len` do not change.
    pub fn store_mut(&mut self) -> &mut S {
        self.store
    }

    fn require_current(&self) -> StorageResult<&EntryId> {
        match self.state {
            ScanState::Positioned(pos) => Ok(&self.ids[pos]),
            ScanState::Unstarted => Err(StorageError::ScannerNotPositioned { state: "unstarted" }),
            ScanState::Exhausted => Err(StorageError::ScannerNotPositioned { state: "exhausted" }),
        }
    }
}
