//! In-process cache driver. Nothing survives the process.

use super::{CacheAdapter, CacheError, CacheHandle, expiry, is_expired};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct MemoryCacheAdapter {
    default_ttl: Option<Duration>,
}

impl MemoryCacheAdapter {
    pub fn new(default_ttl: Option<Duration>) -> Self {
        Self { default_ttl }
    }
}

impl CacheAdapter for MemoryCacheAdapter {
    fn driver(&self) -> Result<Box<dyn CacheHandle>, CacheError> {
        Ok(Box::new(MemoryCache::new(self.default_ttl)))
    }
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Value, Option<i64>)>>,
    default_ttl: Option<Duration>,
}

impl MemoryCache {
    pub fn new(default_ttl: Option<Duration>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, (Value, Option<i64>)>> {
        // A panic while holding the lock cannot leave a map entry half-written.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CacheHandle for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let mut entries = self.entries();
        match entries.get(key) {
            None => return Ok(None),
            Some((value, expires_at)) if !is_expired(*expires_at) => {
                return Ok(Some(value.clone()));
            }
            Some(_) => {}
        }
        entries.remove(key);
        Ok(None)
    }

    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), CacheError> {
        let expires_at = expiry(ttl.or(self.default_ttl));
        self.entries().insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries().remove(key).is_some())
    }
}
