//! Pluggable key/value cache.
//!
//! A [`CacheAdapter`] knows how to construct one kind of [`CacheHandle`] and
//! prepares whatever backing store that handle needs (the file adapter
//! creates its directory). Callers pick an adapter from settings with
//! [`adapter_for`] and only ever talk to the handle.
//!
//! Values are JSON. A TTL, either passed to [`CacheHandle::set`] or taken
//! from `cache.default_ttl`, makes an entry read as absent once it expires.

mod file;
mod memory;

pub use file::{FileCache, FileCacheAdapter};
pub use memory::{MemoryCache, MemoryCacheAdapter};

use crate::config::{CacheConfig, CacheDriver};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache is disabled")]
    Disabled,
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Minimal get/set/has/delete contract every cache driver satisfies.
pub trait CacheHandle {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Store `value`. `None` falls back to the adapter's default TTL.
    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), CacheError>;

    fn has(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key)?.is_some())
    }

    /// Remove `key`. Returns whether anything was removed.
    fn delete(&self, key: &str) -> Result<bool, CacheError>;
}

/// Builds a ready-to-use handle for one driver.
pub trait CacheAdapter {
    fn driver(&self) -> Result<Box<dyn CacheHandle>, CacheError>;
}

/// Adapter for the configured driver. Fails when the cache is disabled.
pub fn adapter_for(
    config: &CacheConfig,
    project_root: &Path,
) -> Result<Box<dyn CacheAdapter>, CacheError> {
    if !config.enabled {
        return Err(CacheError::Disabled);
    }
    let default_ttl = (config.default_ttl > 0).then(|| Duration::from_secs(config.default_ttl));
    Ok(match config.driver {
        CacheDriver::File => Box::new(FileCacheAdapter::new(
            project_root.join(&config.directory),
            default_ttl,
        )),
        CacheDriver::Memory => Box::new(MemoryCacheAdapter::new(default_ttl)),
    })
}

/// Absolute expiry in epoch milliseconds, if any.
fn expiry(ttl: Option<Duration>) -> Option<i64> {
    let ttl = i64::try_from(ttl?.as_millis()).unwrap_or(i64::MAX);
    Some(now_millis().saturating_add(ttl))
}

fn is_expired(expires_at: Option<i64>) -> bool {
    expires_at.is_some_and(|at| at <= now_millis())
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
