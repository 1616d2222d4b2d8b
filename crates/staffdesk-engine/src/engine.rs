//! The lifecycle engine
//!
//! `apply_transition` validates an intent against the transition table
//! (edge first, then role, then side constraints), commits the state
//! move and the audit append inside one per-request critical section,
//! and hands the committed event to the dispatcher without awaiting
//! delivery. Identical retries are absorbed rather than double-written.

use crate::{RequestStore, TransitionTable};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use staffdesk_audit::AuditTrail;
use staffdesk_notify::{NotificationDispatcher, TransitionEvent};
use staffdesk_storage::DocumentGateway;
use staffdesk_types::{
    Actor, Attachment, EngineError, EngineResult, EventKey, HistoryEntry, NewRequest, Request,
    RequestId, RequestKind, RequestState, Role, UserId,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// A transition intent presented by the call boundary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionIntent {
    pub request_id: RequestId,
    pub target_state: RequestState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Filename of a document uploaded together with the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
}

impl TransitionIntent {
    pub fn new(request_id: RequestId, target_state: RequestState) -> Self {
        Self {
            request_id,
            target_state,
            note: None,
            attachment: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_attachment(mut self, filename: impl Into<String>) -> Self {
        self.attachment = Some(filename.into());
        self
    }
}

/// The result of a successful (or absorbed) transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub request: Request,
    pub entry: HistoryEntry,
    /// `false` when an identical retry was absorbed and the prior
    /// result returned unchanged.
    pub applied: bool,
}

/// The request lifecycle engine.
pub struct LifecycleEngine {
    table: TransitionTable,
    store: Arc<dyn RequestStore>,
    audit: Arc<dyn AuditTrail>,
    dispatcher: NotificationDispatcher,
    /// Lazily created per-request critical sections. Guards the
    /// read-validate-write-append cycle; never held across dispatch.
    locks: StdMutex<HashMap<RequestId, Arc<Mutex<()>>>>,
}

impl LifecycleEngine {
    pub fn new(
        store: Arc<dyn RequestStore>,
        audit: Arc<dyn AuditTrail>,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            table: TransitionTable::new(),
            store,
            audit,
            dispatcher,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    /// The edge table this engine enforces.
    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    // ── Creation ─────────────────────────────────────────────────────

    /// Create a request in its kind's initial state.
    ///
    /// The owner is the acting collaborator, except for the
    /// admin-entered compensation flow where a reviewer or admin files
    /// on a collaborator's behalf and the collaborator stays owner.
    pub async fn create_request(&self, actor: &Actor, new: NewRequest) -> EngineResult<Request> {
        if new.subject.trim().is_empty() {
            return Err(EngineError::validation("subject", "must not be empty"));
        }
        // Expenses are born submitted; their amount check runs here.
        if new.kind == RequestKind::Expense && new.amount_cents == 0 {
            return Err(EngineError::validation(
                "amount_cents",
                "a reimbursement needs a positive amount",
            ));
        }

        let owner = self.resolve_owner(actor, &new)?;
        let initial = self.table.initial_state(new.kind);

        let mut request = Request::new(new.kind, owner, initial, new.subject.clone());
        request.description = new.description.clone();
        request.community = new.community.clone();
        request.amount_cents = new.amount_cents;

        self.audit
            .append(&request.id, None, initial, actor.role, None)
            .await
            .map_err(|err| EngineError::Persistence(err.to_string()))?;
        self.store.insert(request.clone()).await?;

        info!(
            request_id = %request.id,
            kind = %request.kind,
            owner = %request.owner,
            state = %request.state,
            "Request created"
        );

        if let Some(event_key) = self.table.creation_event(new.kind) {
            self.dispatcher.dispatch(TransitionEvent {
                event_key,
                request_id: request.id.clone(),
                kind: request.kind,
                owner: request.owner.clone(),
                community: request.community.clone(),
                new_state: request.state,
                subject: request.subject.clone(),
            });
        }

        Ok(request)
    }

    fn resolve_owner(&self, actor: &Actor, new: &NewRequest) -> EngineResult<UserId> {
        match &new.owner_override {
            None => Ok(actor.user_id.clone()),
            Some(owner) if *owner == actor.user_id => Ok(owner.clone()),
            Some(owner) => {
                if new.kind != RequestKind::Compensation {
                    return Err(EngineError::forbidden(
                        "only compensations may be filed on a collaborator's behalf",
                    ));
                }
                match actor.role {
                    Role::Admin => Ok(owner.clone()),
                    Role::Reviewer if actor.covers(new.community.as_ref()) => Ok(owner.clone()),
                    Role::Reviewer => Err(EngineError::forbidden(
                        "reviewer is not assigned to the request's community",
                    )),
                    Role::Collaborator => Err(EngineError::forbidden(
                        "collaborators may only file their own requests",
                    )),
                }
            }
        }
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Validate and apply one transition.
    ///
    /// Validation order, first failure wins: edge existence, role
    /// allow-list (with reviewer community scope), attachment
    /// editability, kind-specific completeness.
    pub async fn apply_transition(
        &self,
        actor: &Actor,
        intent: TransitionIntent,
    ) -> EngineResult<TransitionOutcome> {
        let lock = self.request_lock(&intent.request_id);
        let guard = lock.lock().await;

        let request = self.store.get(&intent.request_id).await?;

        // A retry of an already-applied transition is absorbed: same
        // target, same acting role, no second history entry.
        if request.state == intent.target_state {
            let entries = self
                .audit
                .entries_for(&request.id)
                .await
                .map_err(|err| EngineError::Persistence(err.to_string()))?;
            if let Some(last) = entries.last() {
                if last.new_state == intent.target_state && last.role == actor.role {
                    info!(
                        request_id = %request.id,
                        state = %request.state,
                        "Identical retry absorbed"
                    );
                    return Ok(TransitionOutcome {
                        request,
                        entry: last.clone(),
                        applied: false,
                    });
                }
            }
            return Err(EngineError::InvalidTransition {
                kind: request.kind,
                from: request.state,
                to: intent.target_state,
            });
        }

        let edge = self
            .table
            .edge(request.kind, request.state, intent.target_state)
            .ok_or(EngineError::InvalidTransition {
                kind: request.kind,
                from: request.state,
                to: intent.target_state,
            })?;

        if !edge.roles.contains(&actor.role) {
            return Err(EngineError::forbidden(format!(
                "role {} may not move a {} from {} to {}",
                actor.role, request.kind, edge.from, edge.to
            )));
        }
        // The collaborator allow-list means the owner, nobody else.
        if actor.role == Role::Collaborator && actor.user_id != request.owner {
            return Err(EngineError::forbidden(format!(
                "{} does not own request {}",
                actor.user_id, request.id
            )));
        }
        if edge.reviewer_scoped
            && actor.role == Role::Reviewer
            && !actor.covers(request.community.as_ref())
        {
            return Err(EngineError::forbidden(
                "reviewer is not assigned to the request's community",
            ));
        }

        if intent.attachment.is_some() && !self.table.is_editable(request.kind, request.state) {
            return Err(EngineError::EditingNotAllowed {
                state: request.state,
            });
        }

        self.validate_completeness(edge.event_key, &request)?;

        // Commit. The attachment (still inside the editable window)
        // lands first, then state CAS plus audit append as one logical
        // unit: a failed append reverts the state before the critical
        // section is released.
        if let Some(filename) = &intent.attachment {
            let path = DocumentGateway::derive_path(&request.owner, &request.id, filename);
            self.store
                .add_attachment(Attachment::new(request.id.clone(), path, filename.clone()))
                .await?;
        }

        let now = Utc::now();
        let updated = self
            .store
            .update_state(&request.id, request.state, intent.target_state, now)
            .await?;

        let entry = match self
            .audit
            .append(
                &request.id,
                Some(request.state),
                intent.target_state,
                actor.role,
                intent.note.clone(),
            )
            .await
        {
            Ok(entry) => entry,
            Err(err) => {
                if let Err(revert) = self
                    .store
                    .update_state(
                        &request.id,
                        intent.target_state,
                        request.state,
                        request.updated_at,
                    )
                    .await
                {
                    error!(
                        request_id = %request.id,
                        error = %revert,
                        "State revert failed after audit append error"
                    );
                }
                return Err(EngineError::Persistence(format!(
                    "history append failed: {err}"
                )));
            }
        };

        drop(guard);

        info!(
            request_id = %updated.id,
            from = %request.state,
            to = %updated.state,
            role = %actor.role,
            "Transition applied"
        );

        self.dispatcher.dispatch(TransitionEvent {
            event_key: edge.event_key,
            request_id: updated.id.clone(),
            kind: updated.kind,
            owner: updated.owner.clone(),
            community: updated.community.clone(),
            new_state: updated.state,
            subject: updated.subject.clone(),
        });

        Ok(TransitionOutcome {
            request: updated,
            entry,
            applied: true,
        })
    }

    /// Kind-specific completeness, enforced on the submission edge.
    fn validate_completeness(&self, event_key: EventKey, request: &Request) -> EngineResult<()> {
        if event_key == EventKey::CompensationSubmitted && request.amount_cents == 0 {
            return Err(EngineError::validation(
                "amount_cents",
                "a compensation needs a positive amount before submission",
            ));
        }
        Ok(())
    }

    // ── Attachments ──────────────────────────────────────────────────

    /// Record an attachment while the request is still editable.
    pub async fn add_attachment(
        &self,
        actor: &Actor,
        request_id: &RequestId,
        filename: &str,
    ) -> EngineResult<Attachment> {
        let lock = self.request_lock(request_id);
        let _guard = lock.lock().await;

        let request = self.store.get(request_id).await?;

        let is_owner = actor.user_id == request.owner;
        let is_co_editor = request.kind == RequestKind::Compensation
            && matches!(actor.role, Role::Reviewer | Role::Admin)
            && actor.covers(request.community.as_ref());
        if !is_owner && !is_co_editor {
            return Err(EngineError::forbidden(format!(
                "{} may not attach documents to request {}",
                actor.user_id, request.id
            )));
        }

        if !self.table.is_editable(request.kind, request.state) {
            return Err(EngineError::EditingNotAllowed {
                state: request.state,
            });
        }

        let path = DocumentGateway::derive_path(&request.owner, &request.id, filename);
        let attachment = Attachment::new(request.id.clone(), path, filename);
        self.store.add_attachment(attachment.clone()).await?;

        info!(
            request_id = %request.id,
            filename,
            "Attachment recorded"
        );
        Ok(attachment)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn request_lock(&self, id: &RequestId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock table poisoned");
        if locks.len() > 4096 {
            // Idle slots (nobody holds a clone) can be dropped; a held
            // lock must survive the prune.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            warn!(retained = locks.len(), "Pruned request lock table");
        }
        locks.entry(id.clone()).or_default().clone()
    }
}
