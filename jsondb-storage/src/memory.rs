//! In-memory backing store.
//!
//! Same contract as [`DirStore`](crate::DirStore), with a map of serialized
//! JSON documents in place of the directory. Entries go through serde on
//! every call, so decode failures and round-trip behaviour match the file
//! store. Used in tests and as a scratch store.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::marker::PhantomData;

use chrono::Utc;
use jsondb_core::{uuid_v7_generator, Entry, EntryId, IdGenerator, StorageError, StorageResult};

use crate::Store;

/// In-memory store of JSON documents keyed by id.
pub struct MemoryStore<E> {
    documents: HashMap<EntryId, Vec<u8>>,
    generator: IdGenerator,
    _entry: PhantomData<fn() -> E>,
}

impl<E> fmt::Debug for MemoryStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("documents", &self.documents.len())
            .finish_non_exhaustive()
    }
}

impl<E> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new(uuid_v7_generator())
    }
}

impl<E> MemoryStore<E> {
    /// Create an empty store using `generator` for new ids.
    pub fn new(generator: IdGenerator) -> Self {
        Self {
            documents: HashMap::new(),
            generator,
            _entry: PhantomData,
        }
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Drop every document.
    pub fn clear(&mut self) {
        self.documents.clear();
    }

    /// Store raw bytes under `id`, bypassing the entry hooks. Simulates a
    /// write by another process.
    pub fn insert_raw(&mut self, id: EntryId, bytes: impl Into<Vec<u8>>) {
        self.documents.insert(id, bytes.into());
    }

    /// Remove a document without going through `delete`. Simulates a
    /// deletion by another process.
    pub fn remove_raw(&mut self, id: &EntryId) -> bool {
        self.documents.remove(id).is_some()
    }

    /// Raw document stored under `id`.
    pub fn raw(&self, id: &EntryId) -> Option<&[u8]> {
        self.documents.get(id).map(Vec::as_slice)
    }
}

fn encode<E: Entry>(id: &EntryId, entry: &E) -> StorageResult<Vec<u8>> {
    serde_json::to_vec(entry).map_err(|source| StorageError::Serialization {
        id: id.clone(),
        source,
    })
}

impl<E: Entry> Store<E> for MemoryStore<E> {
    fn create(&mut self, entry: &mut E) -> StorageResult<EntryId> {
        let id = EntryId::parse((self.generator)())?;
        if self.documents.contains_key(&id) {
            return Err(StorageError::io(
                id.as_str(),
                io::Error::new(io::ErrorKind::AlreadyExists, "entry id already in use"),
            ));
        }
        let mut stamped = entry.clone();
        stamped.assign_id(id.clone());
        stamped.created(Utc::now());

        let bytes = encode(&id, &stamped)?;
        self.documents.insert(id.clone(), bytes);
        *entry = stamped;
        Ok(id)
    }

    fn read(&mut self, id: &EntryId) -> StorageResult<E> {
        let bytes = self
            .documents
            .get(id)
            .ok_or_else(|| StorageError::NotFound { id: id.clone() })?;
        let mut entry: E =
            serde_json::from_slice(bytes).map_err(|source| StorageError::Serialization {
                id: id.clone(),
                source,
            })?;
        entry.assign_id(id.clone());
        Ok(entry)
    }

    fn update(&mut self, id: &EntryId, entry: &mut E) -> StorageResult<()> {
        if !self.documents.contains_key(id) {
            return Err(StorageError::NotFound { id: id.clone() });
        }
        let mut stamped = entry.clone();
        stamped.assign_id(id.clone());
        stamped.modified(Utc::now());
        let bytes = encode(id, &stamped)?;
        self.documents.insert(id.clone(), bytes);
        *entry = stamped;
        Ok(())
    }

    fn delete(&mut self, id: &EntryId) -> StorageResult<()> {
        self.documents
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound { id: id.clone() })
    }

    fn list_ids(&mut self) -> StorageResult<Vec<EntryId>> {
        let mut ids: Vec<EntryId> = self.documents.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
