//! Checksummed cache of completion results.
//!
//! Completion replies are expensive and rate limited, so qualified prospects
//! are cached by a digest of their company and features. Each entry carries a
//! SHA-256 checksum of its payload; an entry that fails validation is treated
//! as a miss and evicted, and the caller re-qualifies.

use moka::future::Cache;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use std::marker::PhantomData;
use std::time::Duration;

/// Wrapper for cached data with integrity validation
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ValidatedCacheEntry {
    /// The actual cached data (JSON string)
    pub data: String,
    /// SHA-256 checksum of the data (hex encoded)
    pub checksum: String,
}

impl ValidatedCacheEntry {
    pub fn new(data: String) -> Self {
        let checksum = compute_checksum(data.as_bytes());
        Self { data, checksum }
    }

    /// Returns true if the checksum matches the payload.
    pub fn is_valid(&self) -> bool {
        compute_checksum(self.data.as_bytes()) == self.checksum
    }

    pub fn serialize(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Returns the payload if the entry parses and its checksum matches.
    pub fn deserialize_and_validate(serialized: &str) -> Option<String> {
        let entry: ValidatedCacheEntry = serde_json::from_str(serialized).ok()?;

        if entry.is_valid() {
            Some(entry.data)
        } else {
            tracing::warn!(
                "Cache validation failed: checksum mismatch. Expected: {}, Data length: {}",
                entry.checksum,
                entry.data.len()
            );
            None
        }
    }
}

fn compute_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Stable cache key for a set of parts (e.g. company name and feature values).
pub fn cache_key(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.trim().to_lowercase().as_bytes());
        hasher.update([0x1f]);
    }
    hex::encode(hasher.finalize())
}

/// Typed, checksum-validated wrapper over a moka cache.
pub struct ValidatedCache<T> {
    inner: Cache<String, String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ValidatedCache<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(max_capacity)
                .build(),
            _marker: PhantomData,
        }
    }

    pub async fn get(&self, key: &str) -> Option<T> {
        let cached = self.inner.get(key).await?;

        let value = ValidatedCacheEntry::deserialize_and_validate(&cached)
            .and_then(|data| serde_json::from_str::<T>(&data).ok());
        if value.is_none() {
            tracing::warn!("Dropping invalid cache entry {}", key);
            self.inner.invalidate(key).await;
        }
        value
    }

    pub async fn insert(&self, key: String, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => {
                let entry = ValidatedCacheEntry::new(json);
                self.inner.insert(key, entry.serialize()).await;
            }
            Err(e) => tracing::warn!("Skipping cache insert for {}: {}", key, e),
        }
    }

    /// Stores a raw serialized entry; used to exercise validation.
    #[cfg(test)]
    async fn insert_raw(&self, key: String, raw: String) {
        self.inner.insert(key, raw).await;
    }
}
