//! The object-storage seam.
//!
//! Jobs, artifacts, and completion markers live in object storage; the
//! dispatcher drives this trait and never a concrete SDK. Keys passed in
//! are relative to the given [`StorageLocation`]'s prefix.

use std::time::Duration;

use async_trait::async_trait;
use renderd_core::error::CoreError;
use renderd_core::location::StorageLocation;

/// Durable object storage with existence checks and time-limited read
/// links.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `body` as a JSON object at `key` under `location`.
    async fn put_json(
        &self,
        location: &StorageLocation,
        key: &str,
        body: &serde_json::Value,
    ) -> Result<(), CoreError>;

    /// Whether an object exists at `key` under `location`.
    async fn exists(&self, location: &StorageLocation, key: &str) -> Result<bool, CoreError>;

    /// List object keys under `prefix`, returned relative to the
    /// location's own prefix so they can be fed back into
    /// [`presign_get`](Self::presign_get).
    async fn list(&self, location: &StorageLocation, prefix: &str)
        -> Result<Vec<String>, CoreError>;

    /// Produce a time-limited, credential-free read URL for `key`.
    async fn presign_get(
        &self,
        location: &StorageLocation,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, CoreError>;
}
