//! jsondb Test Utilities
//!
//! Shared test infrastructure for the jsondb workspace:
//! - A [`Note`] fixture entry
//! - Proptest generators for notes and operation sequences
//! - Store wrappers that count inner calls or inject failures
//! - Temp-dir fixtures and tracing setup for tests

// Re-export the stores and core types for convenience
pub use jsondb_core::{
    sequential_generator, uuid_v7_generator, Entry, EntryId, IdGenerator, JsonDbError,
    JsonDbResult, StorageError, StorageResult, StoreConfig, Timestamp,
};
pub use jsondb_storage::{open, CacheStats, CachingStore, DirStore, MemoryStore, Scanner, Store};

use std::io;

use serde::{Deserialize, Serialize};
use tempfile::TempDir;

// ============================================================================
// FIXTURE ENTRY
// ============================================================================

/// A note with a title, body and tags. The fixture entry of the test suite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntryId>,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub pinned: bool,
    pub created_at: Option<Timestamp>,
    pub modified_at: Option<Timestamp>,
}

impl Note {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Copy with the fields the store stamps cleared, for comparing content.
    pub fn content(&self) -> Note {
        Note {
            id: None,
            created_at: None,
            modified_at: None,
            ..self.clone()
        }
    }
}

impl Entry for Note {
    fn assign_id(&mut self, id: EntryId) {
        self.id = Some(id);
    }

    fn created(&mut self, at: Timestamp) {
        self.created_at = Some(at);
    }

    fn modified(&mut self, at: Timestamp) {
        self.modified_at = Some(at);
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Directory store over a fresh temp dir. Keep the `TempDir` alive for the
/// duration of the test.
pub fn temp_dir_store(prefix: &str) -> (DirStore<Note>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = DirStore::new(temp_dir.path(), sequential_generator(prefix))
        .expect("Failed to open directory store");
    (store, temp_dir)
}

/// Parse an id literal.
pub fn id(raw: &str) -> EntryId {
    EntryId::parse(raw).expect("test id should be valid")
}

/// Install a tracing subscriber that writes through the test harness.
/// Safe to call from every test; only the first call installs it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// COUNTING STORE
// ============================================================================

/// Per-operation call counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub create: u64,
    pub read: u64,
    pub update: u64,
    pub delete: u64,
    pub list_ids: u64,
}

/// Store wrapper recording how often each inner operation is called.
#[derive(Debug)]
pub struct CountingStore<S> {
    inner: S,
    counts: CallCounts,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            counts: CallCounts::default(),
        }
    }

    pub fn counts(&self) -> &CallCounts {
        &self.counts
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<E: Entry, S: Store<E>> Store<E> for CountingStore<S> {
    fn create(&mut self, entry: &mut E) -> StorageResult<EntryId> {
        self.counts.create += 1;
        self.inner.create(entry)
    }

    fn read(&mut self, id: &EntryId) -> StorageResult<E> {
        self.counts.read += 1;
        self.inner.read(id)
    }

    fn update(&mut self, id: &EntryId, entry: &mut E) -> StorageResult<()> {
        self.counts.update += 1;
        self.inner.update(id, entry)
    }

    fn delete(&mut self, id: &EntryId) -> StorageResult<()> {
        self.counts.delete += 1;
        self.inner.delete(id)
    }

    fn list_ids(&mut self) -> StorageResult<Vec<EntryId>> {
        self.counts.list_ids += 1;
        self.inner.list_ids()
    }
}

// ============================================================================
// FAULTY STORE
// ============================================================================

/// Operation a [`FaultyStore`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Create,
    Read,
    Update,
    Delete,
    ListIds,
}

/// Store wrapper that fails armed operations with an I/O error.
///
/// A fault fires once: the next call of that operation fails without
/// reaching the inner store, later calls go through.
#[derive(Debug)]
pub struct FaultyStore<S> {
    inner: S,
    armed: Vec<Fault>,
}

impl<S> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            armed: Vec::new(),
        }
    }

    /// Make the next call of `fault` fail.
    pub fn arm(&mut self, fault: Fault) {
        self.armed.push(fault);
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    fn trip(&mut self, fault: Fault) -> StorageResult<()> {
        match self.armed.iter().position(|f| *f == fault) {
            Some(pos) => {
                self.armed.remove(pos);
                Err(StorageError::io(
                    format!("{fault:?}"),
                    io::Error::other("injected fault"),
                ))
            }
            None => Ok(()),
        }
    }
}

impl<E: Entry, S: Store<E>> Store<E> for FaultyStore<S> {
    fn create(&mut self, entry: &mut E) -> StorageResult<EntryId> {
        self.trip(Fault::Create)?;
        self.inner.create(entry)
    }

    fn read(&mut self, id: &EntryId) -> StorageResult<E> {
        self.trip(Fault::Read)?;
        self.inner.read(id)
    }

    fn update(&mut self, id: &EntryId, entry: &mut E) -> StorageResult<()> {
        self.trip(Fault::Update)?;
        self.inner.update(id, entry)
    }

    fn delete(&mut self, id: &EntryId) -> StorageResult<()> {
        self.trip(Fault::Delete)?;
        self.inner.delete(id)
    }

    fn list_ids(&mut self) -> StorageResult<Vec<EntryId>> {
        self.trip(Fault::ListIds)?;
        self.inner.list_ids()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for notes and store operations.

    use super::Note;
    use proptest::prelude::*;

    pub fn arb_tag() -> impl Strategy<Value = String> {
        "[a-z]{1,8}"
    }

    /// Note content with no store-stamped fields set.
    pub fn arb_note() -> impl Strategy<Value = Note> {
        (
            "[A-Za-z0-9 ]{0,32}",
            any::<String>(),
            prop::collection::vec(arb_tag(), 0..4),
            any::<bool>(),
        )
            .prop_map(|(title, body, tags, pinned)| Note {
                title,
                body,
                tags,
                pinned,
                ..Default::default()
            })
    }

    /// One step of a store workload. Indices pick among the ids created so
    /// far (modulo their count), or a missing id when none exist.
    #[derive(Debug, Clone)]
    pub enum Op {
        Create(Note),
        Read(usize),
        Update(usize, Note),
        Delete(usize),
        ListIds,
    }

    pub fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => arb_note().prop_map(Op::Create),
            3 => any::<usize>().prop_map(Op::Read),
            2 => (any::<usize>(), arb_note()).prop_map(|(i, n)| Op::Update(i, n)),
            1 => any::<usize>().prop_map(Op::Delete),
            1 => Just(Op::ListIds),
        ]
    }

    pub fn arb_ops(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
        prop::collection::vec(arb_op(), 0..max_len)
    }
}
