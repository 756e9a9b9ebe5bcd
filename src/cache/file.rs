//! Filesystem cache driver.
//!
//! Each key is stored as its own JSON document named by the SHA-256 of the
//! key, so arbitrary keys map to safe file names:
//!
//! ```text
//! cache/
//! └── 2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae.json
//! ```
//!
//! Documents carry a format version. A document with another version, or
//! one that fails to parse, reads as a miss and is overwritten by the next
//! `set`.

use super::{CacheAdapter, CacheError, CacheHandle, expiry, is_expired};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bump to invalidate every stored entry when the document layout changes.
const ENTRY_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCacheAdapter {
    directory: PathBuf,
    default_ttl: Option<Duration>,
}

impl FileCacheAdapter {
    pub fn new(directory: impl Into<PathBuf>, default_ttl: Option<Duration>) -> Self {
        Self {
            directory: directory.into(),
            default_ttl,
        }
    }
}

impl CacheAdapter for FileCacheAdapter {
    /// Create the cache directory if needed, then hand out a handle on it.
    fn driver(&self) -> Result<Box<dyn CacheHandle>, CacheError> {
        if !self.directory.is_dir() {
            std::fs::create_dir_all(&self.directory).map_err(|source| CacheError::Io {
                path: self.directory.clone(),
                source,
            })?;
            tracing::debug!(dir = %self.directory.display(), "created cache directory");
        }
        Ok(Box::new(FileCache {
            directory: self.directory.clone(),
            default_ttl: self.default_ttl,
        }))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    version: u32,
    key: String,
    expires_at: Option<i64>,
    value: Value,
}

#[derive(Debug, Clone)]
pub struct FileCache {
    directory: PathBuf,
    default_ttl: Option<Duration>,
}

impl FileCache {
    fn entry_path(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{}.json", hash_key(key)))
    }

    fn read(&self, path: &Path) -> Result<Option<StoredEntry>, CacheError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        match serde_json::from_str::<StoredEntry>(&content) {
            Ok(entry) if entry.version == ENTRY_VERSION => Ok(Some(entry)),
            Ok(_) => Ok(None),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "ignoring corrupt cache entry");
                Ok(None)
            }
        }
    }
}

impl CacheHandle for FileCache {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let path = self.entry_path(key);
        let Some(entry) = self.read(&path)? else {
            return Ok(None);
        };
        if is_expired(entry.expires_at) {
            let _ = std::fs::remove_file(&path);
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), CacheError> {
        let entry = StoredEntry {
            version: ENTRY_VERSION,
            key: key.to_string(),
            expires_at: expiry(ttl.or(self.default_ttl)),
            value,
        };
        let path = self.entry_path(key);
        let json = serde_json::to_string_pretty(&entry)?;
        std::fs::write(&path, json).map_err(|source| CacheError::Io { path, source })
    }

    fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let path = self.entry_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }
}

/// SHA-256 of a cache key, as a hex string.
fn hash_key(key: &str) -> String {
    format!("{:x}", Sha256::digest(key.as_bytes()))
}
