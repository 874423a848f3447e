//! In-memory object store.
//!
//! Backs the [`ObjectStore`] seam with a plain map for unit and
//! integration tests and for local development without cloud
//! credentials. Presigned URLs are synthesized `memory://` links that
//! carry the expiry so tests can assert on it.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use renderd_core::error::CoreError;
use renderd_core::location::StorageLocation;

use crate::store::ObjectStore;

/// ObjectStore over a `BTreeMap`, keyed `bucket/full-key`.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn full_key(location: &StorageLocation, key: &str) -> String {
        format!("{}/{}", location.bucket, location.key(key))
    }

    /// Write raw bytes directly, bypassing the trait. Tests use this to
    /// play the worker's role (dropping artifacts and the completion
    /// marker).
    pub fn put_raw(&self, location: &StorageLocation, key: &str, bytes: impl Into<Vec<u8>>) {
        let mut objects = self
            .objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        objects.insert(Self::full_key(location, key), bytes.into());
    }

    /// Read an object back as JSON (test assertions).
    pub fn get_json(&self, location: &StorageLocation, key: &str) -> Option<serde_json::Value> {
        let objects = self
            .objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        objects
            .get(&Self::full_key(location, key))
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_json(
        &self,
        location: &StorageLocation,
        key: &str,
        body: &serde_json::Value,
    ) -> Result<(), CoreError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| CoreError::Internal(format!("Failed to encode job JSON: {e}")))?;
        self.put_raw(location, key, bytes);
        Ok(())
    }

    async fn exists(&self, location: &StorageLocation, key: &str) -> Result<bool, CoreError> {
        let objects = self
            .objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(objects.contains_key(&Self::full_key(location, key)))
    }

    async fn list(
        &self,
        location: &StorageLocation,
        prefix: &str,
    ) -> Result<Vec<String>, CoreError> {
        let full_prefix = format!("{}/{}", location.bucket, location.key(prefix));
        let strip = format!("{}/{}", location.bucket, location.prefix);
        let objects = self
            .objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(objects
            .keys()
            .filter(|k| k.starts_with(&full_prefix))
            .map(|k| k.strip_prefix(&strip).unwrap_or(k).to_string())
            .collect())
    }

    async fn presign_get(
        &self,
        location: &StorageLocation,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, CoreError> {
        let objects = self
            .objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let full = Self::full_key(location, key);
        if !objects.contains_key(&full) {
            return Err(CoreError::Storage(format!("No such object: {full}")));
        }
        Ok(format!("memory://{full}?expires={}", expires_in.as_secs()))
    }
}
