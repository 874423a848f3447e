//! Cloud adapters and the on-demand compute lifecycle machinery.
//!
//! The lifecycle controller and job dispatcher depend only on two seams:
//!
//! - [`provider::ComputeProvider`], the single named compute resource
//!   (GCE VM or remote pod) that performs rendering.
//! - [`store::ObjectStore`], durable object storage for job documents,
//!   artifacts, and completion markers.
//!
//! Per-provider adapters live in [`gce`] and [`pod`]; the S3-compatible
//! store in [`s3`]; an in-memory store for tests and local development in
//! [`memory`].

pub mod dispatch;
pub mod gce;
pub mod lifecycle;
pub mod memory;
pub mod pod;
pub mod provider;
pub mod s3;
pub mod store;
