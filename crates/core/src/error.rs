//! Domain error taxonomy shared across the platform.
//!
//! The HTTP layer maps these onto status codes (404/409/503/504/500), so
//! provider adapters must classify failures here rather than returning
//! generic errors and letting the boundary guess.

/// Domain errors for lifecycle and dispatch operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The target instance or pod does not exist. Expected, not
    /// exceptional: a pre-created instance may not exist yet, or a stored
    /// pod reference may be stale.
    #[error("{0} not found")]
    NotFound(String),

    /// No instance identity is configured at all.
    #[error("No {0} configured")]
    NotConfigured(String),

    /// The provider temporarily cannot satisfy the request (GPU capacity
    /// or account quota). Callers should retry after a delay.
    #[error("{0}")]
    Capacity(String),

    /// Optimistic-concurrency conflict (stale metadata fingerprint, or a
    /// competing in-flight job). Retryable.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The worker signalled completion but produced no image artifacts.
    /// A worker-side defect, not a dispatcher bug.
    #[error("No images produced")]
    EmptyResult,

    /// A bounded wait was exhausted before the condition held.
    #[error("Timed out waiting for {0}")]
    DeadlineExceeded(String),

    /// The configured provider does not support this operation.
    #[error("Operation not supported by this provider: {0}")]
    Unsupported(&'static str),

    /// Any other failure from the compute provider, surfaced with the
    /// provider's message.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Any other failure from the object storage layer.
    #[error("Storage error: {0}")]
    Storage(String),

    /// An internal invariant failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Classify a raw provider error message, recognizing capacity and
    /// quota exhaustion by pattern so callers can distinguish "retry
    /// later" from "broken request".
    pub fn from_provider_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();

        if lowered.contains("insufficient") || lowered.contains("capacity") {
            CoreError::Capacity(
                "GPU resources are currently unavailable. Please try again in a few minutes."
                    .to_string(),
            )
        } else if lowered.contains("quota") {
            CoreError::Capacity(
                "Account quota exceeded. Please check your provider account or upgrade your plan."
                    .to_string(),
            )
        } else {
            CoreError::Provider(message)
        }
    }

    /// Whether this error is the retry-later class (capacity/quota).
    pub fn is_capacity(&self) -> bool {
        matches!(self, CoreError::Capacity(_))
    }
}
