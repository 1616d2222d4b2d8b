//! Request persistence boundary
//!
//! The engine performs its own authorization before touching the
//! store; store access from the engine is trusted-by-construction, not
//! because of ambient credentials. The state write is a compare-and-
//! swap so an unexpected concurrent writer surfaces as an error rather
//! than a silent overwrite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use staffdesk_types::{Attachment, EngineError, EngineResult, Request, RequestId, RequestState};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Persistence boundary for requests and their attachments.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn insert(&self, request: Request) -> EngineResult<()>;

    async fn get(&self, id: &RequestId) -> EngineResult<Request>;

    /// Compare-and-swap the state. Fails with `Persistence` when the
    /// stored state no longer matches `expected`.
    async fn update_state(
        &self,
        id: &RequestId,
        expected: RequestState,
        new: RequestState,
        updated_at: DateTime<Utc>,
    ) -> EngineResult<Request>;

    async fn add_attachment(&self, attachment: Attachment) -> EngineResult<()>;

    /// Attachments for a request, ordered by creation time ascending.
    async fn attachments_for(&self, id: &RequestId) -> EngineResult<Vec<Attachment>>;

    /// Every request in the store. Requests are never hard-deleted.
    async fn list(&self) -> EngineResult<Vec<Request>>;
}

/// Reference in-memory request store.
#[derive(Default)]
pub struct InMemoryRequestStore {
    requests: RwLock<HashMap<RequestId, Request>>,
    attachments: RwLock<HashMap<RequestId, Vec<Attachment>>>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn insert(&self, request: Request) -> EngineResult<()> {
        let mut requests = self.requests.write().await;
        if requests.contains_key(&request.id) {
            return Err(EngineError::Persistence(format!(
                "request {} already exists",
                request.id
            )));
        }
        requests.insert(request.id.clone(), request);
        Ok(())
    }

    async fn get(&self, id: &RequestId) -> EngineResult<Request> {
        let requests = self.requests.read().await;
        requests
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(id.clone()))
    }

    async fn update_state(
        &self,
        id: &RequestId,
        expected: RequestState,
        new: RequestState,
        updated_at: DateTime<Utc>,
    ) -> EngineResult<Request> {
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(id.clone()))?;
        if request.state != expected {
            return Err(EngineError::Persistence(format!(
                "state of {} moved to {} while {} was expected",
                id, request.state, expected
            )));
        }
        request.state = new;
        request.updated_at = updated_at;
        Ok(request.clone())
    }

    async fn add_attachment(&self, attachment: Attachment) -> EngineResult<()> {
        let mut attachments = self.attachments.write().await;
        attachments
            .entry(attachment.request_id.clone())
            .or_default()
            .push(attachment);
        Ok(())
    }

    async fn attachments_for(&self, id: &RequestId) -> EngineResult<Vec<Attachment>> {
        let attachments = self.attachments.read().await;
        Ok(attachments.get(id).cloned().unwrap_or_default())
    }

    async fn list(&self) -> EngineResult<Vec<Request>> {
        let requests = self.requests.read().await;
        Ok(requests.values().cloned().collect())
    }
}
