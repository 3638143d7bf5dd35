//! jsondb Storage - Store Trait, Directory Store and Cache
//!
//! Each entry is one JSON file in a directory, named by its id. On top of the
//! directory store sits an optional in-memory [`CachingStore`], and any store
//! can be iterated with a [`Scanner`].
//!
//! # Example
//!
//! ```ignore
//! use jsondb_core::{uuid_v7_generator, StoreConfig};
//!
//! let config = StoreConfig::new("/var/lib/notes").with_cache(true);
//! let mut store = jsondb_storage::open::<Note>(&config, uuid_v7_generator())?;
//!
//! let mut note = Note::new("groceries");
//! let id = store.create(&mut note)?;
//!
//! let mut scanner = store.scanner()?;
//! while scanner.scan() {
//!     let note = scanner.read()?;
//! }
//! ```

pub mod cache;
pub mod dir_store;
pub mod factory;
pub mod memory;
pub mod scanner;

pub use cache::{CacheStats, CachingStore};
pub use dir_store::DirStore;
pub use factory::open;
pub use memory::MemoryStore;
pub use scanner::Scanner;

use jsondb_core::{Entry, EntryId, StorageResult};

// ============================================================================
// STORE TRAIT
// ============================================================================

/// CRUD contract shared by the directory store, the memory store and the cache.
///
/// Methods take `&mut self`: a store is owned by one caller at a time. Callers
/// that need to share one across threads wrap the whole store in a mutex.
///
/// `read`, `update` and `delete` fail with [`StorageError::NotFound`] when no
/// record exists for the id. Serialization and I/O failures are returned as is.
///
/// [`StorageError::NotFound`]: jsondb_core::StorageError::NotFound
pub trait Store<E: Entry> {
    /// Persist a new entry under a freshly generated id.
    ///
    /// The stored value carries `assign_id` and `created` stamps. The
    /// caller's entry receives the same stamps once the write has succeeded;
    /// on error it is left untouched.
    fn create(&mut self, entry: &mut E) -> StorageResult<EntryId>;

    /// Read the entry stored under `id`.
    fn read(&mut self, id: &EntryId) -> StorageResult<E>;

    /// Read the entry stored under `id` into a caller-owned value.
    ///
    /// `target` is left untouched on error.
    fn read_into(&mut self, id: &EntryId, target: &mut E) -> StorageResult<()> {
        *target = self.read(id)?;
        Ok(())
    }

    /// Overwrite an existing entry.
    ///
    /// The stored value carries `assign_id(id)` and `modified` stamps, so a
    /// later `read` returns exactly the value written. As with `create`, the
    /// caller's entry is stamped only on success.
    fn update(&mut self, id: &EntryId, entry: &mut E) -> StorageResult<()>;

    /// Remove an existing entry.
    fn delete(&mut self, id: &EntryId) -> StorageResult<()>;

    /// Ids of every stored entry.
    fn list_ids(&mut self) -> StorageResult<Vec<EntryId>>;

    /// Whether an entry exists for `id`. Built on `read`, so an entry that
    /// fails to decode is reported as an error, not as absent.
    fn exists(&mut self, id: &EntryId) -> StorageResult<bool> {
        match self.read(id) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Start a scan over the ids known right now.
    fn scanner(&mut self) -> StorageResult<Scanner<'_, E, Self>>
    where
        Self: Sized,
    {
        Scanner::new(self)
    }
}

impl<E: Entry, S: Store<E> + ?Sized> Store<E> for Box<S> {
    fn create(&mut self, entry: &mut E) -> StorageResult<EntryId> {
        (**self).create(entry)
    }

    fn read(&mut self, id: &EntryId) -> StorageResult<E> {
        (**self).read(id)
    }

    fn read_into(&mut self, id: &EntryId, target: &mut E) -> StorageResult<()> {
        (**self).read_into(id, target)
    }

    fn update(&mut self, id: &EntryId, entry: &mut E) -> StorageResult<()> {
        (**self).update(id, entry)
    }

    fn delete(&mut self, id: &EntryId) -> StorageResult<()> {
        (**self).delete(id)
    }

    fn list_ids(&mut self) -> StorageResult<Vec<EntryId>> {
        (**self).list_ids()
    }

    fn exists(&mut self, id: &EntryId) -> StorageResult<bool> {
        (**self).exists(id)
    }
}
