//! Identity types for stored entries

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Zero-argument generator of fresh identifier strings.
///
/// The store trusts the generator for uniqueness. A generated string must
/// still be a valid [`EntryId`], otherwise `create` fails with
/// [`StorageError::InvalidId`].
pub type IdGenerator = Box<dyn Fn() -> String + Send + Sync>;

/// Opaque identifier of a stored entry.
///
/// The id doubles as the file name of the record, so it is always a single
/// path segment: non-empty, not `.` or `..`, and free of `/`, `\` and NUL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryId(String);

impl EntryId {
    /// Parse and validate an identifier.
    pub fn parse(raw: impl Into<String>) -> StorageResult<Self> {
        let raw = raw.into();
        if let Some(reason) = invalid_reason(&raw) {
            return Err(StorageError::InvalidId {
                id: raw,
                reason: reason.to_string(),
            });
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

fn invalid_reason(raw: &str) -> Option<&'static str> {
    if raw.is_empty() {
        Some("identifier is empty")
    } else if raw == "." || raw == ".." {
        Some("identifier is a relative path component")
    } else if raw.contains(['/', '\\']) {
        Some("identifier contains a path separator")
    } else if raw.contains('\0') {
        Some("identifier contains a NUL byte")
    } else {
        None
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntryId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<EntryId> for String {
    fn from(id: EntryId) -> Self {
        id.0
    }
}

impl TryFrom<String> for EntryId {
    type Error = StorageError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

impl TryFrom<&str> for EntryId {
    type Error = StorageError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

/// Default generator: UUIDv7 strings, which sort by creation time.
pub fn uuid_v7_generator() -> IdGenerator {
    Box::new(|| Uuid::now_v7().to_string())
}

/// Deterministic generator yielding `prefix-1`, `prefix-2`, ...
pub fn sequential_generator(prefix: impl Into<String>) -> IdGenerator {
    let prefix = prefix.into();
    let counter = AtomicU64::new(0);
    Box::new(move || {
        let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{n}")
    })
}
