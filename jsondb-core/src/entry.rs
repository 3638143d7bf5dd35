//! The record contract every stored value satisfies.

use serde::{de::DeserializeOwned, Serialize};

use crate::identity::{EntryId, Timestamp};

/// A stored record.
///
/// Entries are plain data bags. The store calls these hooks to stamp the
/// identity and timestamps it owns:
///
/// - `assign_id` on create (fresh id) and on every read (id of the file)
/// - `created` once, on create
/// - `modified` on every update
///
/// `Clone` lets a cache hand out copies of the value it holds instead of
/// sharing it with the caller.
pub trait Entry: Clone + Serialize + DeserializeOwned {
    /// Assign the generated id of a new entry, or the existing id on read.
    fn assign_id(&mut self, id: EntryId);

    /// Record the creation time of a new entry.
    fn created(&mut self, at: Timestamp);

    /// Record the modification time on update.
    fn modified(&mut self, at: Timestamp);
}
