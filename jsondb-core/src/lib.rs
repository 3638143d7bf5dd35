//! jsondb Core - Entry Contract and Shared Types
//!
//! Identifiers, the [`Entry`] capability set every stored record implements,
//! the error taxonomy and store configuration. All other crates depend on this.

pub mod config;
pub mod entry;
pub mod error;
pub mod identity;

pub use config::StoreConfig;
pub use entry::Entry;
pub use error::{ConfigError, JsonDbError, JsonDbResult, StorageError, StorageResult};
pub use identity::{
    sequential_generator, uuid_v7_generator, EntryId, IdGenerator, Timestamp,
};
