//! Error taxonomy for lifecycle operations

use crate::{RequestId, RequestKind, RequestState};

/// Errors surfaced by the lifecycle engine.
///
/// Validation and authorization failures are deterministic and must not
/// be retried; `Persistence` is the only class safe to retry, because
/// the per-request critical section guarantees no partial effect
/// survives a failed attempt.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid transition for {kind}: {from} -> {to}")]
    InvalidTransition {
        kind: RequestKind,
        from: RequestState,
        to: RequestState,
    },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("editing not allowed in state {state}")]
    EditingNotAllowed { state: RequestState },

    #[error("validation failed on `{field}`: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("request not found: {0}")]
    NotFound(RequestId),

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl EngineError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Whether a caller may safely retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
