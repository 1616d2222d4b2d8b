//! Audit history entries
//!
//! One immutable record per transition. The creation entry carries
//! `previous_state = None`; every later entry links the request's walk
//! through its kind's graph.

use crate::{RequestId, RequestState, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An append-only audit record for a single transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique entry identifier
    pub id: String,
    /// The request this entry belongs to
    pub request_id: RequestId,
    /// The role that applied the transition
    pub role: Role,
    /// State before the transition; `None` for the creation entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_state: Option<RequestState>,
    /// State after the transition
    pub new_state: RequestState,
    /// Optional free-text note attached by the actor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// When the entry was written
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(
        request_id: RequestId,
        role: Role,
        previous_state: Option<RequestState>,
        new_state: RequestState,
        note: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            request_id,
            role,
            previous_state,
            new_state,
            note,
            created_at: Utc::now(),
        }
    }

    /// Whether this is the creation entry.
    pub fn is_creation(&self) -> bool {
        self.previous_state.is_none()
    }
}
