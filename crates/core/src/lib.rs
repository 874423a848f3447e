//! Pure domain logic for the renderd platform.
//!
//! This crate has zero internal dependencies so it can be used by the
//! cloud adapters, the API layer, and any future CLI tooling. It owns:
//!
//! - The normalized instance status vocabulary and per-provider mappings
//! - The idle-activity clock
//! - Render job documents and the storage hand-off key scheme
//! - Storage location parsing (`gs://` / `s3://`)
//! - Boot metadata construction
//! - Poll/backoff policies
//! - The domain error taxonomy

pub mod activity;
pub mod artifacts;
pub mod error;
pub mod job;
pub mod location;
pub mod metadata;
pub mod poll;
pub mod status;
