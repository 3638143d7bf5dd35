//! Store configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default permission bits for the store directory.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Default permission bits for record files.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Configuration for opening a store.
///
/// Permission bits are applied on Unix only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one file per entry.
    pub root: PathBuf,
    #[serde(default = "default_dir_mode")]
    pub dir_mode: u32,
    #[serde(default = "default_file_mode")]
    pub file_mode: u32,
    /// Wrap the directory store in the in-memory cache. The cache assumes it
    /// is the only writer to `root` for its lifetime.
    #[serde(default)]
    pub cache: bool,
}

fn default_dir_mode() -> u32 {
    DEFAULT_DIR_MODE
}

fn default_file_mode() -> u32 {
    DEFAULT_FILE_MODE
}

impl StoreConfig {
    /// Create a config for `root` with default modes and no cache.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dir_mode: DEFAULT_DIR_MODE,
            file_mode: DEFAULT_FILE_MODE,
            cache: false,
        }
    }

    /// Set the directory permission bits.
    pub fn with_dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = mode;
        self
    }

    /// Set the record file permission bits.
    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    /// Enable or disable the caching layer.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = enabled;
        self
    }

    /// Check the config before any filesystem work happens.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "root".to_string(),
                value: String::new(),
                reason: "store directory must not be empty".to_string(),
            });
        }
        for (field, mode) in [("dir_mode", self.dir_mode), ("file_mode", self.file_mode)] {
            if mode > 0o777 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: format!("{mode:#o}"),
                    reason: "permission bits must be at most 0o777".to_string(),
                });
            }
        }
        // The owner must be able to list, create and remove records.
        if self.dir_mode & 0o700 != 0o700 {
            return Err(ConfigError::InvalidValue {
                field: "dir_mode".to_string(),
                value: format!("{:#o}", self.dir_mode),
                reason: "owner needs read, write and execute".to_string(),
            });
        }
        Ok(())
    }
}
