//! In-memory audit trail backend

use crate::{AuditError, AuditTrail};
use async_trait::async_trait;
use staffdesk_types::{HistoryEntry, RequestId, RequestState, Role};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Reference audit backend keeping the trail per request in memory.
///
/// Timestamps are clamped per request: an entry never carries a
/// timestamp earlier than its predecessor, even if the wall clock
/// steps backwards between appends.
#[derive(Default)]
pub struct InMemoryAuditTrail {
    entries: Mutex<HashMap<RequestId, Vec<HistoryEntry>>>,
}

impl InMemoryAuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total entries across all requests.
    pub async fn entry_count(&self) -> usize {
        self.entries.lock().await.values().map(Vec::len).sum()
    }

    /// The most recent entry for a request, if any.
    pub async fn last_entry(&self, request_id: &RequestId) -> Option<HistoryEntry> {
        self.entries
            .lock()
            .await
            .get(request_id)
            .and_then(|trail| trail.last().cloned())
    }
}

#[async_trait]
impl AuditTrail for InMemoryAuditTrail {
    async fn append(
        &self,
        request_id: &RequestId,
        previous_state: Option<RequestState>,
        new_state: RequestState,
        role: Role,
        note: Option<String>,
    ) -> Result<HistoryEntry, AuditError> {
        let mut map = self.entries.lock().await;
        let trail = map.entry(request_id.clone()).or_default();

        let mut entry = HistoryEntry::new(
            request_id.clone(),
            role,
            previous_state,
            new_state,
            note,
        );

        // Monotonic per request: clamp to the last entry's timestamp.
        if let Some(last) = trail.last() {
            if entry.created_at < last.created_at {
                entry.created_at = last.created_at;
            }
        }

        trail.push(entry.clone());
        tracing::debug!(
            request_id = %request_id,
            new_state = %new_state,
            role = %role,
            "History entry appended"
        );
        Ok(entry)
    }

    async fn entries_for(&self, request_id: &RequestId) -> Result<Vec<HistoryEntry>, AuditError> {
        let map = self.entries.lock().await;
        Ok(map.get(request_id).cloned().unwrap_or_default())
    }
}
