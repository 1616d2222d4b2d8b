//! Staffdesk Service - the unified call boundary
//!
//! Every inbound operation passes through here exactly once. The
//! service wires the lifecycle engine, the audit trail, the
//! notification fan-out and the document gateway, and performs the
//! per-operation authorization the platform's route layer used to
//! scatter across endpoints: owner, community-scoped reviewer, or
//! admin, decided once per call.

#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};
use staffdesk_audit::{AuditError, AuditTrail, InMemoryAuditTrail};
use staffdesk_engine::{
    InMemoryRequestStore, LifecycleEngine, RequestStore, TransitionIntent, TransitionOutcome,
};
use staffdesk_notify::{
    EmailOutbox, InMemoryEmailOutbox, InMemoryNotificationStore, NotificationDispatcher,
    NotificationStore, NotifyError, RoleDirectory, SettingsMatrix,
};
use staffdesk_storage::{BlobSigner, DocumentGateway, DocumentUrls};
use staffdesk_types::{
    Actor, Attachment, AttachmentId, EngineError, EventKey, HistoryEntry, NewRequest,
    Notification, NotificationId, NotificationSetting, Request, RequestId, Role,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// The unified Staffdesk service.
pub struct StaffdeskService {
    engine: LifecycleEngine,
    store: Arc<dyn RequestStore>,
    audit: Arc<dyn AuditTrail>,
    settings: Arc<SettingsMatrix>,
    notifications: Arc<dyn NotificationStore>,
    gateway: DocumentGateway,
}

impl StaffdeskService {
    /// Create a service over in-memory reference backends.
    pub fn new(directory: Arc<dyn RoleDirectory>, signer: Arc<dyn BlobSigner>) -> Self {
        Self::with_components(
            Arc::new(InMemoryRequestStore::new()),
            Arc::new(InMemoryAuditTrail::new()),
            Arc::new(SettingsMatrix::new()),
            Arc::new(InMemoryNotificationStore::new()),
            Arc::new(InMemoryEmailOutbox::new()),
            directory,
            signer,
        )
    }

    /// Create with explicit backends.
    pub fn with_components(
        store: Arc<dyn RequestStore>,
        audit: Arc<dyn AuditTrail>,
        settings: Arc<SettingsMatrix>,
        notifications: Arc<dyn NotificationStore>,
        outbox: Arc<dyn EmailOutbox>,
        directory: Arc<dyn RoleDirectory>,
        signer: Arc<dyn BlobSigner>,
    ) -> Self {
        let dispatcher = NotificationDispatcher::new(
            settings.clone(),
            directory,
            notifications.clone(),
            outbox,
        );
        let engine = LifecycleEngine::new(store.clone(), audit.clone(), dispatcher);
        Self {
            engine,
            store,
            audit,
            settings,
            notifications,
            gateway: DocumentGateway::new(signer),
        }
    }

    /// The engine behind this service.
    pub fn engine(&self) -> &LifecycleEngine {
        &self.engine
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Create a request in its kind's initial state.
    pub async fn create_request(
        &self,
        actor: &Actor,
        new: NewRequest,
    ) -> Result<Request, ServiceError> {
        Ok(self.engine.create_request(actor, new).await?)
    }

    /// Apply one validated transition.
    pub async fn apply_transition(
        &self,
        actor: &Actor,
        intent: TransitionIntent,
    ) -> Result<TransitionOutcome, ServiceError> {
        Ok(self.engine.apply_transition(actor, intent).await?)
    }

    /// Record an attachment while the request is editable.
    pub async fn add_attachment(
        &self,
        actor: &Actor,
        request_id: &RequestId,
        filename: &str,
    ) -> Result<Attachment, ServiceError> {
        Ok(self.engine.add_attachment(actor, request_id, filename).await?)
    }

    /// Request, attachments and history, both ascending by creation.
    pub async fn request_detail(
        &self,
        actor: &Actor,
        request_id: &RequestId,
    ) -> Result<RequestDetail, ServiceError> {
        let request = self.store.get(request_id).await?;
        self.authorize_view(actor, &request)?;

        let attachments = self.store.attachments_for(request_id).await?;
        let history = self.audit.entries_for(request_id).await?;
        Ok(RequestDetail {
            request,
            attachments,
            history,
        })
    }

    /// The transition history alone, ascending.
    pub async fn history(
        &self,
        actor: &Actor,
        request_id: &RequestId,
    ) -> Result<Vec<HistoryEntry>, ServiceError> {
        let request = self.store.get(request_id).await?;
        self.authorize_view(actor, &request)?;
        Ok(self.audit.entries_for(request_id).await?)
    }

    /// Every request this actor may see, newest first.
    pub async fn list_requests(&self, actor: &Actor) -> Result<Vec<Request>, ServiceError> {
        let mut requests: Vec<Request> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|request| self.may_view(actor, request))
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    /// Time-limited retrieval URLs for one attachment.
    pub async fn attachment_urls(
        &self,
        actor: &Actor,
        request_id: &RequestId,
        attachment_id: &AttachmentId,
    ) -> Result<DocumentUrls, ServiceError> {
        let request = self.store.get(request_id).await?;
        self.authorize_view(actor, &request)?;

        let attachments = self.store.attachments_for(request_id).await?;
        let attachment = attachments
            .iter()
            .find(|a| a.id == *attachment_id)
            .ok_or_else(|| {
                ServiceError::Engine(EngineError::forbidden(format!(
                    "attachment {} does not belong to request {}",
                    attachment_id, request_id
                )))
            })?;

        Ok(self.gateway.issue_urls(&attachment.storage_path, None).await)
    }

    /// Aggregate counts for dashboards. Admin only.
    pub async fn statistics(&self, actor: &Actor) -> Result<RequestStatistics, ServiceError> {
        if actor.role != Role::Admin {
            return Err(ServiceError::Engine(EngineError::forbidden(
                "statistics are an admin surface",
            )));
        }

        let requests = self.store.list().await?;
        let total_requests = requests.len();
        let mut by_kind: HashMap<String, usize> = HashMap::new();
        let mut by_state: HashMap<String, usize> = HashMap::new();
        for request in requests {
            *by_kind.entry(request.kind.to_string()).or_insert(0) += 1;
            *by_state.entry(request.state.to_string()).or_insert(0) += 1;
        }

        Ok(RequestStatistics {
            total_requests,
            by_kind,
            by_state,
        })
    }

    // ── Notification settings (admin surface) ────────────────────────

    /// All explicitly configured matrix rows.
    pub fn list_notification_settings(
        &self,
        actor: &Actor,
    ) -> Result<Vec<NotificationSetting>, ServiceError> {
        if actor.role != Role::Admin {
            return Err(ServiceError::Engine(EngineError::forbidden(
                "notification settings are an admin surface",
            )));
        }
        Ok(self.settings.list())
    }

    /// Upsert one matrix row.
    pub fn set_notification_setting(
        &self,
        actor: &Actor,
        event_key: EventKey,
        role: Role,
        inapp_enabled: bool,
        email_enabled: bool,
    ) -> Result<(), ServiceError> {
        if actor.role != Role::Admin {
            return Err(ServiceError::Engine(EngineError::forbidden(
                "notification settings are an admin surface",
            )));
        }
        self.settings.set(event_key, role, inapp_enabled, email_enabled);
        Ok(())
    }

    // ── Notifications (owner surface) ────────────────────────────────

    /// The actor's notifications, newest first.
    pub async fn notifications(&self, actor: &Actor) -> Result<Vec<Notification>, ServiceError> {
        Ok(self.notifications.list_for(&actor.user_id).await?)
    }

    /// Mark one of the actor's notifications as read.
    pub async fn mark_notification_read(
        &self,
        actor: &Actor,
        id: &NotificationId,
    ) -> Result<Notification, ServiceError> {
        Ok(self.notifications.mark_read(&actor.user_id, id).await?)
    }

    /// Dismiss one of the actor's notifications.
    pub async fn dismiss_notification(
        &self,
        actor: &Actor,
        id: &NotificationId,
    ) -> Result<(), ServiceError> {
        Ok(self.notifications.dismiss(&actor.user_id, id).await?)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn may_view(&self, actor: &Actor, request: &Request) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::Collaborator => actor.user_id == request.owner,
            Role::Reviewer => {
                actor.user_id == request.owner || actor.covers(request.community.as_ref())
            }
        }
    }

    fn authorize_view(&self, actor: &Actor, request: &Request) -> Result<(), ServiceError> {
        if self.may_view(actor, request) {
            Ok(())
        } else {
            Err(ServiceError::Engine(EngineError::forbidden(format!(
                "{} may not view request {}",
                actor.user_id, request.id
            ))))
        }
    }
}

/// Request plus everything a detail page shows.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestDetail {
    pub request: Request,
    /// Ordered by creation time ascending.
    pub attachments: Vec<Attachment>,
    /// Ordered by creation time ascending.
    pub history: Vec<HistoryEntry>,
}

/// Aggregate request counts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestStatistics {
    pub total_requests: usize,
    pub by_kind: HashMap<String, usize>,
    pub by_state: HashMap<String, usize>,
}

/// Service-level errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),
}

impl ServiceError {
    /// Whether a caller may safely retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Engine(err) => err.is_retryable(),
            ServiceError::Audit(_) => true,
            ServiceError::Notify(_) => false,
        }
    }
}
