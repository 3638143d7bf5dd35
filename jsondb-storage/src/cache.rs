//! In-memory caching decorator over any [`Store`].
//!
//! The inner store stays the durability authority: every mutation is sent to
//! it first, and the cache only changes after the inner call succeeds. A
//! failed call leaves the cache exactly as it was.
//!
//! # Single writer
//!
//! The cache assumes it is the only writer to the inner store for its
//! lifetime. Records changed or deleted behind its back keep being served
//! from memory, and ids deleted elsewhere stay listed.
//!
//! Nothing is evicted: entries leave the cache only through `delete`.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::marker::PhantomData;

use jsondb_core::{Entry, EntryId, StorageResult};

use crate::Store;

/// Whether the id set has been seeded from the inner store yet.
///
/// Seeding happens at most once per cache. Not synchronized: a cache shared
/// across threads must sit behind a single lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdSeed {
    Unseeded,
    Seeded,
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered from memory.
    pub hits: u64,
    /// Reads that went to the inner store and succeeded.
    pub misses: u64,
    /// Number of entries currently held.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Caching wrapper around a store.
///
/// Presents the same [`Store`] contract as the store it wraps and surfaces
/// the inner store's errors unchanged.
pub struct CachingStore<E, S> {
    inner: S,
    entries: HashMap<EntryId, E>,
    known_ids: BTreeSet<EntryId>,
    seed: IdSeed,
    hits: u64,
    misses: u64,
    _entry: PhantomData<fn() -> E>,
}

impl<E, S: fmt::Debug> fmt::Debug for CachingStore<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingStore")
            .field("inner", &self.inner)
            .field("entries", &self.entries.len())
            .field("known_ids", &self.known_ids.len())
            .field("seed", &self.seed)
            .finish()
    }
}

impl<E: Entry, S: Store<E>> CachingStore<E, S> {
    /// Wrap `inner` with an empty, unseeded cache.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            entries: HashMap::new(),
            known_ids: BTreeSet::new(),
            seed: IdSeed::Unseeded,
            hits: 0,
            misses: 0,
            _entry: PhantomData,
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Mutable access to the wrapped store. Changes made through it bypass
    /// the cache and are not reflected in it.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Unwrap the inner store, dropping the cache.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Whether an entry for `id` is held in memory.
    pub fn is_cached(&self, id: &EntryId) -> bool {
        self.entries.contains_key(id)
    }

    /// Whether `id` is in the known id set.
    pub fn is_known(&self, id: &EntryId) -> bool {
        self.known_ids.contains(id)
    }

    /// Number of entries held in memory.
    pub fn cached_len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the id set has been seeded from the inner store.
    pub fn is_seeded(&self) -> bool {
        self.seed == IdSeed::Seeded
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entry_count: self.entries.len() as u64,
        }
    }

    fn remember(&mut self, id: &EntryId, entry: &E) {
        self.entries.insert(id.clone(), entry.clone());
        self.known_ids.insert(id.clone());
    }
}

impl<E: Entry, S: Store<E>> Store<E> for CachingStore<E, S> {
    fn create(&mut self, entry: &mut E) -> StorageResult<EntryId> {
        let id = self.inner.create(entry)?;
        self.remember(&id, entry);
        Ok(id)
    }

    fn read(&mut self, id: &EntryId) -> StorageResult<E> {
        if let Some(cached) = self.entries.get(id) {
            self.hits += 1;
            tracing::trace!(id = %id, "cache hit");
            return Ok(cached.clone());
        }

        let entry = self.inner.read(id)?;
        self.misses += 1;
        tracing::trace!(id = %id, "cache miss");
        self.remember(id, &entry);
        Ok(entry)
    }

    fn read_into(&mut self, id: &EntryId, target: &mut E) -> StorageResult<()> {
        if let Some(cached) = self.entries.get(id) {
            self.hits += 1;
            tracing::trace!(id = %id, "cache hit");
            target.clone_from(cached);
            return Ok(());
        }

        *target = self.read(id)?;
        Ok(())
    }

    fn update(&mut self, id: &EntryId, entry: &mut E) -> StorageResult<()> {
        self.inner.update(id, entry)?;
        self.remember(id, entry);
        Ok(())
    }

    fn delete(&mut self, id: &EntryId) -> StorageResult<()> {
        self.inner.delete(id)?;
        self.entries.remove(id);
        self.known_ids.remove(id);
        Ok(())
    }

    fn list_ids(&mut self) -> StorageResult<Vec<EntryId>> {
        if self.seed == IdSeed::Unseeded {
            let ids = self.inner.list_ids()?;
            tracing::debug!(count = ids.len(), "seeding cached id set");
            // Union: ids created before seeding stay known.
            self.known_ids.extend(ids);
            self.seed = IdSeed::Seeded;
        }

        Ok(self.known_ids.iter().cloned().collect())
    }

    fn exists(&mut self, id: &EntryId) -> StorageResult<bool> {
        if self.entries.contains_key(id) {
            return Ok(true);
        }
        match self.read(id) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_entry::{id, Task};
    use crate::MemoryStore;
    use jsondb_core::sequential_generator;

    fn cached() -> CachingStore<Task, MemoryStore<Task>> {
        CachingStore::new(MemoryStore::new(sequential_generator("c")))
    }

    #[test]
    fn test_new_cache_is_empty_and_unseeded() {
        let cache = cached();
        assert_eq!(cache.cached_len(), 0);
        assert!(!cache.is_seeded());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_create_populates_cache() {
        let mut cache = cached();
        let mut task = Task::new("cached");
        let id = cache.create(&mut task).unwrap();

        assert!(cache.is_cached(&id));
        assert!(cache.is_known(&id));
        assert_eq!(cache.inner().len(), 1);
    }

    #[test]
    fn test_read_after_create_is_a_hit_without_inner_read() {
        let mut cache = cached();
        let mut task = Task::new("hit");
        let id = cache.create(&mut task).unwrap();

        // Corrupt the backing copy: a hit never decodes it.
        cache.inner_mut().insert_raw(id.clone(), b"garbage".to_vec());

        let read = cache.read(&id).unwrap();
        assert_eq!(read, task);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn test_read_miss_then_hit() {
        let mut inner = MemoryStore::<Task>::new(sequential_generator("m"));
        let id = inner.create(&mut Task::new("on disk")).unwrap();
        let mut cache = CachingStore::new(inner);

        assert!(!cache.is_cached(&id));
        assert_eq!(cache.read(&id).unwrap().title, "on disk");
        assert!(cache.is_cached(&id));
        assert!(cache.is_known(&id));
        assert_eq!(cache.read(&id).unwrap().title, "on disk");

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert!((stats.hit_rate() - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_read_not_found_caches_nothing() {
        let mut cache = cached();
        let err = cache.read(&id("missing")).unwrap_err();
        assert!(err.is_not_found());
        assert!(!cache.is_cached(&id("missing")));
        assert!(!cache.is_known(&id("missing")));
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_read_into_copies_cached_value() {
        let mut cache = cached();
        let mut task = Task::new("copy me");
        let id = cache.create(&mut task).unwrap();

        let mut target = Task::new("scratch");
        cache.read_into(&id, &mut target).unwrap();
        assert_eq!(target, task);

        // The caller owns a copy; mutating it does not reach the cache.
        target.title = "changed".to_string();
        assert_eq!(cache.read(&id).unwrap().title, "copy me");
    }

    #[test]
    fn test_update_replaces_cached_value() {
        let mut cache = cached();
        let mut task = Task::new("v1");
        let id = cache.create(&mut task).unwrap();

        task.title = "v2".to_string();
        cache.update(&id, &mut task).unwrap();

        let read = cache.read(&id).unwrap();
        assert_eq!(read.title, "v2");
        assert_eq!(read.modified_at, task.modified_at);
        assert_eq!(cache.inner().len(), 1);
    }

    #[test]
    fn test_failed_update_leaves_cache_untouched() {
        let mut cache = cached();
        let mut ghost = Task::new("ghost");

        let err = cache.update(&id("ghost"), &mut ghost).unwrap_err();
        assert!(err.is_not_found());
        assert!(!cache.is_cached(&id("ghost")));
        assert!(!cache.is_known(&id("ghost")));
    }

    #[test]
    fn test_delete_evicts_from_both_maps() {
        let mut cache = cached();
        let id = cache.create(&mut Task::new("gone soon")).unwrap();

        cache.delete(&id).unwrap();
        assert!(!cache.is_cached(&id));
        assert!(!cache.is_known(&id));
        assert!(cache.read(&id).unwrap_err().is_not_found());
        assert!(cache.list_ids().unwrap().is_empty());
    }

    #[test]
    fn test_failed_delete_leaves_cache_untouched() {
        let mut cache = cached();
        let id = cache.create(&mut Task::new("kept")).unwrap();
        // Removed behind the cache's back, so the inner delete fails.
        assert!(cache.inner_mut().remove_raw(&id));

        assert!(cache.delete(&id).unwrap_err().is_not_found());
        assert!(cache.is_cached(&id));
        assert!(cache.is_known(&id));
        assert_eq!(cache.read(&id).unwrap().title, "kept");
    }

    #[test]
    fn test_list_ids_seeds_once_and_unions_creates() {
        let mut inner = MemoryStore::<Task>::new(sequential_generator("disk"));
        inner.create(&mut Task::new("a")).unwrap();
        let mut cache = CachingStore::new(inner);

        // Created before seeding: must survive the union.
        let early = cache.create(&mut Task::new("early")).unwrap();
        let first = cache.list_ids().unwrap();
        assert!(cache.is_seeded());
        assert_eq!(first.len(), 2);
        assert!(first.contains(&early));

        let late = cache.create(&mut Task::new("late")).unwrap();
        let second = cache.list_ids().unwrap();
        assert_eq!(second.len(), 3);
        assert!(second.contains(&late));
    }

    #[test]
    fn test_list_ids_does_not_rescan_inner() {
        let mut cache = cached();
        assert!(cache.list_ids().unwrap().is_empty());

        // Written by another process after seeding: never observed.
        cache.inner_mut().insert_raw(id("outside"), b"{}".to_vec());
        assert!(cache.list_ids().unwrap().is_empty());
        assert_eq!(cache.inner_mut().list_ids().unwrap(), vec![id("outside")]);
    }

    #[test]
    fn test_failed_seed_retries() {
        let mut cache: CachingStore<Task, FailingList> = CachingStore::new(FailingList {
            inner: MemoryStore::new(sequential_generator("f")),
            fail_next_list: true,
        });
        assert!(cache.list_ids().is_err());
        assert!(!cache.is_seeded());

        cache.inner_mut().inner.insert_raw(id("late"), b"{}".to_vec());
        assert_eq!(cache.list_ids().unwrap(), vec![id("late")]);
        assert!(cache.is_seeded());
    }

    #[test]
    fn test_exists_uses_cache() {
        let mut cache = cached();
        let created = cache.create(&mut Task::new("here")).unwrap();
        cache.inner_mut().insert_raw(created.clone(), b"garbage".to_vec());

        assert!(cache.exists(&created).unwrap());
        assert!(!cache.exists(&id("nope")).unwrap());
    }

    #[test]
    fn test_failed_write_keeps_cache_and_disk_in_step() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let dir = crate::DirStore::<Task>::new(temp_dir.path(), sequential_generator("w")).unwrap();
        let mut cache = CachingStore::new(dir);
        let mut task = Task::new("small");
        let created = cache.create(&mut task).unwrap();

        assert!(cache.update(&created, &mut Task::poisoned("big")).is_err());
        assert!(cache.create(&mut Task::poisoned("orphan")).is_err());

        assert_eq!(cache.read(&created).unwrap(), task);
        assert_eq!(cache.inner_mut().read(&created).unwrap(), task);
        assert_eq!(cache.list_ids().unwrap(), vec![created.clone()]);
        assert_eq!(cache.inner_mut().list_ids().unwrap(), vec![created]);
    }

    /// Memory store whose next `list_ids` fails with an I/O error.
    struct FailingList {
        inner: MemoryStore<Task>,
        fail_next_list: bool,
    }

    impl Store<Task> for FailingList {
        fn create(&mut self, entry: &mut Task) -> StorageResult<EntryId> {
            self.inner.create(entry)
        }

        fn read(&mut self, id: &EntryId) -> StorageResult<Task> {
            self.inner.read(id)
        }

        fn update(&mut self, id: &EntryId, entry: &mut Task) -> StorageResult<()> {
            self.inner.update(id, entry)
        }

        fn delete(&mut self, id: &EntryId) -> StorageResult<()> {
            self.inner.delete(id)
        }

        fn list_ids(&mut self) -> StorageResult<Vec<EntryId>> {
            if std::mem::take(&mut self.fail_next_list) {
                return Err(jsondb_core::StorageError::io(
                    "/db",
                    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                ));
            }
            self.inner.list_ids()
        }
    }
}
