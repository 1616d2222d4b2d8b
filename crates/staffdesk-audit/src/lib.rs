//! Staffdesk Audit Trail - append-only transition history
//!
//! Every lifecycle transition writes exactly one [`HistoryEntry`]
//! through this crate. Entries are immutable once written: the trait
//! surface has no update and no delete. For a single request, entry
//! timestamps are monotonically non-decreasing in write order: the
//! engine serializes writes per request, and the backend clamps the
//! clock so a backwards step can never reorder the trail.

#![deny(unsafe_code)]

mod memory;

pub use memory::InMemoryAuditTrail;

use async_trait::async_trait;
use staffdesk_types::{HistoryEntry, RequestId, RequestState, Role};

/// Write/read boundary for the audit trail.
#[async_trait]
pub trait AuditTrail: Send + Sync {
    /// Append one immutable history record.
    ///
    /// Succeeds or fails atomically; never partially writes.
    async fn append(
        &self,
        request_id: &RequestId,
        previous_state: Option<RequestState>,
        new_state: RequestState,
        role: Role,
        note: Option<String>,
    ) -> Result<HistoryEntry, AuditError>;

    /// All entries for a request, ordered by creation time ascending.
    async fn entries_for(&self, request_id: &RequestId) -> Result<Vec<HistoryEntry>, AuditError>;
}

/// Audit-trail errors.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit backend failure: {0}")]
    Backend(String),
}
