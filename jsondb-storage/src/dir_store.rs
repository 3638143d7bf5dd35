//! Directory-backed store: one JSON file per entry.
//!
//! File name is the entry id, file content is the entry serialized as JSON
//! with no envelope. A missing file is the canonical "not found" signal, and
//! anything under an id that is not a regular file is treated the same way.
//! No file handles are held between calls.
//!
//! Writes go to a hidden temp file in the store directory which is then
//! renamed over the record, so a failed write never leaves a partial record.

use std::fmt;
use std::fs::{self, DirBuilder};
use std::io::{self, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use chrono::Utc;
use jsondb_core::config::{DEFAULT_DIR_MODE, DEFAULT_FILE_MODE};
use jsondb_core::{Entry, EntryId, IdGenerator, StorageError, StorageResult, StoreConfig};
use tempfile::NamedTempFile;

use crate::Store;

/// Name prefix of in-flight writes. Never listed as an entry.
const TEMP_PREFIX: &str = ".jsondb-tmp-";

/// File-per-record JSON store rooted at a directory.
pub struct DirStore<E> {
    root: PathBuf,
    file_mode: u32,
    generator: IdGenerator,
    _entry: PhantomData<fn() -> E>,
}

impl<E> fmt::Debug for DirStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirStore")
            .field("root", &self.root)
            .field("file_mode", &format!("{:#o}", self.file_mode))
            .finish_non_exhaustive()
    }
}

impl<E: Entry> DirStore<E> {
    /// Open a store at `dir` with default permissions, creating the
    /// directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>, generator: IdGenerator) -> StorageResult<Self> {
        Self::create_root(dir.into(), DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, generator)
    }

    /// Open a store described by `config`. The cache flag is ignored here;
    /// see [`crate::open`].
    pub fn with_config(config: &StoreConfig, generator: IdGenerator) -> StorageResult<Self> {
        Self::create_root(
            config.root.clone(),
            config.dir_mode,
            config.file_mode,
            generator,
        )
    }

    fn create_root(
        root: PathBuf,
        dir_mode: u32,
        file_mode: u32,
        generator: IdGenerator,
    ) -> StorageResult<Self> {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(dir_mode);
        }
        #[cfg(not(unix))]
        let _ = dir_mode;

        builder
            .create(&root)
            .map_err(|e| StorageError::io(&root, e))?;
        tracing::debug!(root = %root.display(), "opened directory store");

        Ok(Self {
            root,
            file_mode,
            generator,
            _entry: PhantomData,
        })
    }

    /// The directory holding the records.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `id`.
    pub fn path(&self, id: &EntryId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Fails with `NotFound` unless a regular file backs `id`.
    fn require_record(id: &EntryId, path: &Path) -> StorageResult<()> {
        let metadata = fs::metadata(path).map_err(|e| not_found_or_io(id, path, e))?;
        if metadata.is_file() {
            Ok(())
        } else {
            Err(StorageError::NotFound { id: id.clone() })
        }
    }

    /// Serialize `entry` into a fresh temp file next to the records. The
    /// file is removed on drop unless it is persisted.
    fn stage(&self, id: &EntryId, entry: &E) -> StorageResult<NamedTempFile> {
        let mut staged = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.root)
            .map_err(|e| StorageError::io(&self.root, e))?;

        let written = {
            let mut writer = BufWriter::new(staged.as_file_mut());
            serde_json::to_writer(&mut writer, entry)
                .and_then(|()| writer.flush().map_err(serde_json::Error::io))
        };
        if let Err(source) = written {
            return Err(if source.is_io() {
                StorageError::io(staged.path(), io::Error::from(source))
            } else {
                StorageError::Serialization {
                    id: id.clone(),
                    source,
                }
            });
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            staged
                .as_file()
                .set_permissions(fs::Permissions::from_mode(self.file_mode))
                .map_err(|e| StorageError::io(staged.path(), e))?;
        }
        Ok(staged)
    }
}

fn not_found_or_io(id: &EntryId, path: &Path, e: io::Error) -> StorageError {
    if e.kind() == io::ErrorKind::NotFound {
        StorageError::NotFound { id: id.clone() }
    } else {
        StorageError::io(path, e)
    }
}

impl<E: Entry> Store<E> for DirStore<E> {
    fn create(&mut self, entry: &mut E) -> StorageResult<EntryId> {
        let id = EntryId::parse((self.generator)())?;
        if id.as_str().starts_with(TEMP_PREFIX) {
            return Err(StorageError::InvalidId {
                id: id.into_string(),
                reason: format!("must not start with {TEMP_PREFIX:?}"),
            });
        }

        let mut stamped = entry.clone();
        stamped.assign_id(id.clone());
        stamped.created(Utc::now());

        let path = self.path(&id);
        let staged = self.stage(&id, &stamped)?;
        // noclobber: a generator collision must never replace an existing record
        staged
            .persist_noclobber(&path)
            .map_err(|e| StorageError::io(&path, e.error))?;
        *entry = stamped;

        tracing::debug!(id = %id, path = %path.display(), "created entry");
        Ok(id)
    }

    fn read(&mut self, id: &EntryId) -> StorageResult<E> {
        let path = self.path(id);
        Self::require_record(id, &path)?;
        let bytes = fs::read(&path).map_err(|e| not_found_or_io(id, &path, e))?;
        let mut entry: E =
            serde_json::from_slice(&bytes).map_err(|source| StorageError::Serialization {
                id: id.clone(),
                source,
            })?;
        entry.assign_id(id.clone());

        tracing::trace!(id = %id, "read entry from disk");
        Ok(entry)
    }

    fn update(&mut self, id: &EntryId, entry: &mut E) -> StorageResult<()> {
        let path = self.path(id);
        Self::require_record(id, &path)?;

        let mut stamped = entry.clone();
        stamped.assign_id(id.clone());
        stamped.modified(Utc::now());

        let staged = self.stage(id, &stamped)?;
        staged
            .persist(&path)
            .map_err(|e| StorageError::io(&path, e.error))?;
        *entry = stamped;

        tracing::debug!(id = %id, "updated entry");
        Ok(())
    }

    fn delete(&mut self, id: &EntryId) -> StorageResult<()> {
        let path = self.path(id);
        Self::require_record(id, &path)?;
        fs::remove_file(&path).map_err(|e| not_found_or_io(id, &path, e))?;

        tracing::debug!(id = %id, "deleted entry");
        Ok(())
    }

    fn list_ids(&mut self) -> StorageResult<Vec<EntryId>> {
        let dir = fs::read_dir(&self.root).map_err(|e| StorageError::io(&self.root, e))?;

        let mut ids = Vec::new();
        for item in dir {
            let item = item.map_err(|e| StorageError::io(&self.root, e))?;
            let file_type = item
                .file_type()
                .map_err(|e| StorageError::io(item.path(), e))?;
            if !file_type.is_file() {
                continue;
            }
            let Some(name) = item.file_name().to_str().map(str::to_owned) else {
                tracing::trace!(path = %item.path().display(), "skipping non-UTF-8 file name");
                continue;
            };
            if name.starts_with(TEMP_PREFIX) {
                continue;
            }
            match EntryId::parse(name) {
                Ok(id) => ids.push(id),
                Err(e) => tracing::trace!(error = %e, "skipping file that is not an entry"),
            }
        }
        ids.sort();

        tracing::debug!(root = %self.root.display(), count = ids.len(), "listed entry ids");
        Ok(ids)
    }
}
