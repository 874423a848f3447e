//! Storage location parsing.
//!
//! Job and output locations are configured as `gs://bucket/prefix` or
//! `s3://bucket/prefix` URIs. [`StorageLocation`] splits these into a
//! bucket name and a normalized key prefix so the object-store adapters
//! never re-parse URI strings. The scheme is preserved because hand-off
//! metadata writes these locations back out as URIs for the worker.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A bucket plus an optional key prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocation {
    /// URI scheme this location was configured with (`gs` or `s3`).
    pub scheme: String,
    /// Bucket name, without any scheme.
    pub bucket: String,
    /// Key prefix; empty, or normalized to end with `/`.
    pub prefix: String,
}

impl StorageLocation {
    /// Build a location from raw parts, normalizing the prefix.
    pub fn new(scheme: impl Into<String>, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }
        Self {
            scheme: scheme.into(),
            bucket: bucket.into(),
            prefix,
        }
    }

    /// Full object key for `name` under this location's prefix.
    pub fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Full URI for `name` under this location, in the configured scheme.
    pub fn uri(&self, name: &str) -> String {
        format!("{}://{}/{}", self.scheme, self.bucket, self.key(name))
    }
}

impl FromStr for StorageLocation {
    type Err = CoreError;

    fn from_str(uri: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = if let Some(rest) = uri.strip_prefix("gs://") {
            ("gs", rest)
        } else if let Some(rest) = uri.strip_prefix("s3://") {
            ("s3", rest)
        } else {
            return Err(CoreError::Internal(format!(
                "Invalid storage location '{uri}': expected gs:// or s3:// URI"
            )));
        };

        let (bucket, prefix) = match rest.split_once('/') {
            Some((bucket, prefix)) => (bucket, prefix),
            None => (rest, ""),
        };

        if bucket.is_empty() {
            return Err(CoreError::Internal(format!(
                "Invalid storage location '{uri}': missing bucket name"
            )));
        }

        Ok(StorageLocation::new(scheme, bucket, prefix))
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.prefix)
    }
}
