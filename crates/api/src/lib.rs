//! HTTP service for the renderd platform.
//!
//! Exposes the lifecycle controller (`/status`, `/start`, `/stop`,
//! `/keep-alive`, `/activity`, `/terminate`) and the job dispatcher
//! (`/render`) over axum. Library form so integration tests can build
//! the exact production router.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod routes;
pub mod state;
