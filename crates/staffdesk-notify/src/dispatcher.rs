//! Notification dispatcher
//!
//! Fan-out for committed transitions. `dispatch` is fire-and-forget:
//! the lifecycle engine hands over an event descriptor and returns to
//! its caller without awaiting delivery. Per-recipient failures are
//! logged and swallowed; one bad mailbox never starves the rest, and
//! nothing here can roll back the transition that already committed.

use crate::{EmailMessage, EmailOutbox, NotificationStore, RoleDirectory, SettingsMatrix};
use serde::{Deserialize, Serialize};
use staffdesk_types::{
    CommunityId, EventKey, Notification, RequestId, RequestKind, RequestState, Role, UserId,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Everything the dispatcher needs to know about a committed transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub event_key: EventKey,
    pub request_id: RequestId,
    pub kind: RequestKind,
    pub owner: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community: Option<CommunityId>,
    pub new_state: RequestState,
    pub subject: String,
}

/// Resolves recipients per event and delivers over enabled channels.
#[derive(Clone)]
pub struct NotificationDispatcher {
    settings: Arc<SettingsMatrix>,
    directory: Arc<dyn RoleDirectory>,
    store: Arc<dyn NotificationStore>,
    outbox: Arc<dyn EmailOutbox>,
}

impl NotificationDispatcher {
    pub fn new(
        settings: Arc<SettingsMatrix>,
        directory: Arc<dyn RoleDirectory>,
        store: Arc<dyn NotificationStore>,
        outbox: Arc<dyn EmailOutbox>,
    ) -> Self {
        Self {
            settings,
            directory,
            store,
            outbox,
        }
    }

    /// Fire-and-forget delivery. The caller must not await the handle
    /// on its hot path; it exists so tests can observe completion.
    pub fn dispatch(&self, event: TransitionEvent) -> JoinHandle<usize> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.deliver(event).await })
    }

    /// Deliver to every resolved recipient. Returns how many channel
    /// deliveries succeeded.
    pub async fn deliver(&self, event: TransitionEvent) -> usize {
        let recipients = self.recipients(&event).await;
        let mut delivered = 0;

        for (user, role) in recipients {
            let prefs = self.settings.channels(event.event_key, role);
            debug!(
                event_key = %event.event_key,
                recipient = %user,
                role = %role,
                inapp = prefs.inapp_enabled,
                email = prefs.email_enabled,
                "Resolved delivery channels"
            );

            if prefs.inapp_enabled {
                let row = Notification::new(
                    user.clone(),
                    event.event_key,
                    event.request_id.clone(),
                    compose_message(&event),
                );
                match self.store.create(row).await {
                    Ok(()) => delivered += 1,
                    Err(err) => warn!(
                        event_key = %event.event_key,
                        recipient = %user,
                        error = %err,
                        "In-app delivery failed, skipping recipient channel"
                    ),
                }
            }

            if prefs.email_enabled {
                match self.directory.email_of(&user).await {
                    Some(address) => {
                        let message = compose_email(&event, address);
                        match self.outbox.enqueue(message).await {
                            Ok(()) => delivered += 1,
                            Err(err) => warn!(
                                event_key = %event.event_key,
                                recipient = %user,
                                error = %err,
                                "Email enqueue failed, skipping recipient channel"
                            ),
                        }
                    }
                    None => debug!(recipient = %user, "No email address on file"),
                }
            }
        }

        info!(
            event_key = %event.event_key,
            request_id = %event.request_id,
            delivered,
            "Notification dispatch complete"
        );
        delivered
    }

    /// Event-specific recipient resolution.
    async fn recipients(&self, event: &TransitionEvent) -> Vec<(UserId, Role)> {
        match event.event_key {
            // A fresh submission lands on the reviewers of the
            // request's community.
            EventKey::CompensationSubmitted | EventKey::ExpenseSubmitted => self
                .directory
                .reviewers_for(event.community.as_ref())
                .await
                .into_iter()
                .map(|u| (u, Role::Reviewer))
                .collect(),

            // Pre-approval escalates to the admin role as a whole.
            EventKey::RequestPreApproved => self
                .directory
                .users_in_role(Role::Admin)
                .await
                .into_iter()
                .map(|u| (u, Role::Admin))
                .collect(),

            // Outcomes go back to the owner.
            EventKey::RequestApproved | EventKey::RequestPaid | EventKey::RequestRejected => {
                vec![(event.owner.clone(), Role::Collaborator)]
            }

            // New tickets reach everyone who can work them.
            EventKey::TicketOpened => {
                let mut recipients: Vec<(UserId, Role)> = self
                    .directory
                    .reviewers_for(None)
                    .await
                    .into_iter()
                    .map(|u| (u, Role::Reviewer))
                    .collect();
                recipients.extend(
                    self.directory
                        .users_in_role(Role::Admin)
                        .await
                        .into_iter()
                        .map(|u| (u, Role::Admin)),
                );
                recipients
            }

            // Ticket progress concerns only its creator.
            EventKey::TicketStatusChanged => vec![(event.owner.clone(), Role::Collaborator)],
        }
    }
}

fn compose_message(event: &TransitionEvent) -> String {
    format!(
        "{} \"{}\" is now {}",
        event.kind, event.subject, event.new_state
    )
}

fn compose_email(event: &TransitionEvent, to_address: String) -> EmailMessage {
    EmailMessage {
        to_address,
        subject: format!("[staffdesk] {}", compose_message(event)),
        body: format!(
            "Request {} ({}) moved to state {}.\n\nSubject: {}\n",
            event.request_id, event.kind, event.new_state, event.subject
        ),
    }
}
