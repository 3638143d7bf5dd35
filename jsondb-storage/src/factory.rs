//! Open a store from configuration.

use jsondb_core::{Entry, IdGenerator, JsonDbResult, StoreConfig};

use crate::{CachingStore, DirStore, Store};

/// Open the directory store described by `config`, wrapped in a
/// [`CachingStore`] when `config.cache` is set.
///
/// # Errors
///
/// [`JsonDbError::Config`](jsondb_core::JsonDbError::Config) if the config is
/// invalid, [`JsonDbError::Storage`](jsondb_core::JsonDbError::Storage) if the
/// directory cannot be created.
pub fn open<E: Entry + 'static>(
    config: &StoreConfig,
    generator: IdGenerator,
) -> JsonDbResult<Box<dyn Store<E>>> {
    config.validate()?;
    let store = DirStore::<E>::with_config(config, generator)?;

    if config.cache {
        tracing::info!(root = %config.root.display(), "opening cached store");
        Ok(Box::new(CachingStore::new(store)))
    } else {
        tracing::info!(root = %config.root.display(), "opening store");
        Ok(Box::new(store))
    }
}
