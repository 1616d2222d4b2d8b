//! Notification events, settings and in-app rows
//!
//! Delivery preferences are keyed by `(event, recipient role)`. The
//! matrix is fail-open: a missing row means both channels are enabled,
//! so new event kinds are never silently suppressed by missing
//! configuration.

use crate::{NotificationId, RequestId, Role, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ── Event Keys ───────────────────────────────────────────────────────

/// The closed set of notification-worthy lifecycle events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKey {
    /// A compensation draft was submitted for review
    CompensationSubmitted,
    /// An expense reimbursement was filed (expenses are born submitted)
    ExpenseSubmitted,
    /// A reviewer pre-approved a request
    RequestPreApproved,
    /// An admin approved a request for payment
    RequestApproved,
    /// A request was paid out
    RequestPaid,
    /// A request was rejected at any stage
    RequestRejected,
    /// A support ticket was opened
    TicketOpened,
    /// A support ticket changed status (including reopen)
    TicketStatusChanged,
}

impl EventKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKey::CompensationSubmitted => "compensation_submitted",
            EventKey::ExpenseSubmitted => "expense_submitted",
            EventKey::RequestPreApproved => "request_pre_approved",
            EventKey::RequestApproved => "request_approved",
            EventKey::RequestPaid => "request_paid",
            EventKey::RequestRejected => "request_rejected",
            EventKey::TicketOpened => "ticket_opened",
            EventKey::TicketStatusChanged => "ticket_status_changed",
        }
    }

    pub fn all() -> [EventKey; 8] {
        [
            EventKey::CompensationSubmitted,
            EventKey::ExpenseSubmitted,
            EventKey::RequestPreApproved,
            EventKey::RequestApproved,
            EventKey::RequestPaid,
            EventKey::RequestRejected,
            EventKey::TicketOpened,
            EventKey::TicketStatusChanged,
        ]
    }
}

impl std::fmt::Display for EventKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventKey {
    type Err = UnknownEventKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKey::all()
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownEventKey(s.to_string()))
    }
}

/// Rejection for an event key outside the closed set.
#[derive(Debug, thiserror::Error)]
#[error("unknown event key: {0}")]
pub struct UnknownEventKey(pub String);

// ── Delivery preferences ─────────────────────────────────────────────

/// Per-channel delivery switches for one `(event, role)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPrefs {
    pub inapp_enabled: bool,
    pub email_enabled: bool,
}

impl ChannelPrefs {
    /// The fail-open default used when no row exists for a key.
    pub fn enabled() -> Self {
        Self {
            inapp_enabled: true,
            email_enabled: true,
        }
    }
}

impl Default for ChannelPrefs {
    fn default() -> Self {
        Self::enabled()
    }
}

/// A persisted settings-matrix row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotificationSetting {
    pub event_key: EventKey,
    pub role: Role,
    pub inapp_enabled: bool,
    pub email_enabled: bool,
}

// ── In-app notification ──────────────────────────────────────────────

/// An in-app notification row for one recipient.
///
/// Owned by its recipient; the only permitted mutation is flipping
/// `read`, and the owner may dismiss (delete) it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique notification identifier
    pub id: NotificationId,
    /// The recipient user
    pub recipient: UserId,
    /// The lifecycle event that produced this notification
    pub event_key: EventKey,
    /// The request the event concerned
    pub request_id: RequestId,
    /// Human-readable message payload
    pub message: String,
    /// Whether the recipient has read it
    pub read: bool,
    /// When the notification was created
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        recipient: UserId,
        event_key: EventKey,
        request_id: RequestId,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: NotificationId::generate(),
            recipient,
            event_key,
            request_id,
            message: message.into(),
            read: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_key_round_trip() {
        for key in EventKey::all() {
            assert_eq!(key.as_str().parse::<EventKey>().unwrap(), key);
        }
        assert!("request_deleted".parse::<EventKey>().is_err());
    }

    #[test]
    fn test_event_key_serde() {
        let json = serde_json::to_string(&EventKey::RequestPreApproved).unwrap();
        assert_eq!(json, "\"request_pre_approved\"");
    }

    #[test]
    fn test_channel_prefs_default_open() {
        let prefs = ChannelPrefs::default();
        assert!(prefs.inapp_enabled);
        assert!(prefs.email_enabled);
    }

    #[test]
    fn test_notification_starts_unread() {
        let n = Notification::new(
            UserId::new("mario"),
            EventKey::RequestRejected,
            RequestId::new("r-1"),
            "Your expense was rejected",
        );
        assert!(!n.read);
        assert_eq!(n.recipient, UserId::new("mario"));
    }
}
