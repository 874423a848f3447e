//! S3-compatible object store.
//!
//! Backs the [`ObjectStore`] seam with the AWS SDK. Works against S3
//! proper or any S3-compatible endpoint (GCS interop, MinIO) via the
//! endpoint override.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use renderd_core::error::CoreError;
use renderd_core::location::StorageLocation;

use crate::store::ObjectStore;

/// ObjectStore over an S3-compatible API.
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// Build a store from the ambient AWS environment, with an optional
    /// endpoint override for S3-compatible services.
    pub async fn from_env(endpoint: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let config = loader.load().await;
        Self::new(aws_sdk_s3::Client::new(&config))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_json(
        &self,
        location: &StorageLocation,
        key: &str,
        body: &serde_json::Value,
    ) -> Result<(), CoreError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| CoreError::Internal(format!("Failed to encode job JSON: {e}")))?;

        self.client
            .put_object()
            .bucket(&location.bucket)
            .key(location.key(key))
            .content_type("application/json")
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| CoreError::Storage(format!("put_object failed: {e}")))?;
        Ok(())
    }

    async fn exists(&self, location: &StorageLocation, key: &str) -> Result<bool, CoreError> {
        match self
            .client
            .head_object()
            .bucket(&location.bucket)
            .key(location.key(key))
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_not_found())
                {
                    Ok(false)
                } else {
                    Err(CoreError::Storage(format!("head_object failed: {err}")))
                }
            }
        }
    }

    async fn list(
        &self,
        location: &StorageLocation,
        prefix: &str,
    ) -> Result<Vec<String>, CoreError> {
        let full_prefix = location.key(prefix);
        let mut keys = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&location.bucket)
            .prefix(&full_prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| CoreError::Storage(format!("list_objects failed: {e}")))?;
            for object in page.contents() {
                if let Some(key) = object.key() {
                    // Return keys relative to the location's prefix.
                    let relative = key
                        .strip_prefix(location.prefix.as_str())
                        .unwrap_or(key);
                    keys.push(relative.to_string());
                }
            }
        }
        Ok(keys)
    }

    async fn presign_get(
        &self,
        location: &StorageLocation,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, CoreError> {
        let config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| CoreError::Internal(format!("Invalid presign expiry: {e}")))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(location.key(key))
            .presigned(config)
            .await
            .map_err(|e| CoreError::Storage(format!("presign failed: {e}")))?;

        Ok(presigned.uri().to_string())
    }
}
