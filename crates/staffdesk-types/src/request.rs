//! Requests: the entities moved by the lifecycle engine
//!
//! A request is polymorphic over its kind. Which states and edges apply
//! to a kind is defined by the engine's transition table; this module
//! only carries the closed enumerations and the entity itself.

use crate::{CommunityId, RequestId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ── Request Kind ─────────────────────────────────────────────────────

/// The closed set of request kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
    /// A compensation claim, drafted privately before submission.
    Compensation,
    /// An expense reimbursement, submitted at creation time.
    Expense,
    /// A support ticket; no monetary stage, narrower state set.
    Ticket,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Compensation => "COMPENSATION",
            RequestKind::Expense => "EXPENSE",
            RequestKind::Ticket => "TICKET",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Request State ────────────────────────────────────────────────────

/// Every lifecycle state across all request kinds.
///
/// A single closed enum; which states a kind actually reaches is
/// defined by that kind's transition graph. Unknown state strings are
/// rejected here, at the boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestState {
    // Compensation chain
    Draft,
    Submitted,
    // Expense chain starts here
    Pending,
    // Shared approval chain
    PreApprovedByReviewer,
    ApprovedByAdmin,
    Paid,
    Rejected,
    // Ticket chain
    Open,
    InProgress,
    Closed,
}

impl RequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Draft => "DRAFT",
            RequestState::Submitted => "SUBMITTED",
            RequestState::Pending => "PENDING",
            RequestState::PreApprovedByReviewer => "PRE_APPROVED_BY_REVIEWER",
            RequestState::ApprovedByAdmin => "APPROVED_BY_ADMIN",
            RequestState::Paid => "PAID",
            RequestState::Rejected => "REJECTED",
            RequestState::Open => "OPEN",
            RequestState::InProgress => "IN_PROGRESS",
            RequestState::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RequestState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(RequestState::Draft),
            "SUBMITTED" => Ok(RequestState::Submitted),
            "PENDING" => Ok(RequestState::Pending),
            "PRE_APPROVED_BY_REVIEWER" => Ok(RequestState::PreApprovedByReviewer),
            "APPROVED_BY_ADMIN" => Ok(RequestState::ApprovedByAdmin),
            "PAID" => Ok(RequestState::Paid),
            "REJECTED" => Ok(RequestState::Rejected),
            "OPEN" => Ok(RequestState::Open),
            "IN_PROGRESS" => Ok(RequestState::InProgress),
            "CLOSED" => Ok(RequestState::Closed),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

/// Rejection for a state name outside the closed set.
#[derive(Debug, thiserror::Error)]
#[error("unknown request state: {0}")]
pub struct UnknownState(pub String);

// ── Request ──────────────────────────────────────────────────────────

/// A request moving through its kind's lifecycle.
///
/// Requests are never hard-deleted: terminal states are retained for
/// audit. `owner` is immutable after creation; `state` and `updated_at`
/// change only through validated transitions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Request {
    /// Unique request identifier
    pub id: RequestId,
    /// What kind of request this is
    pub kind: RequestKind,
    /// The submitting collaborator; immutable after creation
    pub owner: UserId,
    /// Current lifecycle state
    pub state: RequestState,
    /// Optional organizational scope for reviewer assignment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community: Option<CommunityId>,
    /// Claimed amount in minor currency units (single-currency system)
    pub amount_cents: u64,
    /// Short human-readable subject
    pub subject: String,
    /// Free-text description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// When the request was created
    pub created_at: DateTime<Utc>,
    /// Set on every transition
    pub updated_at: DateTime<Utc>,
}

impl Request {
    /// Create a request in an explicit initial state.
    ///
    /// Callers normally go through the engine, which picks the initial
    /// state from the transition table.
    pub fn new(
        kind: RequestKind,
        owner: UserId,
        state: RequestState,
        subject: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: RequestId::generate(),
            kind,
            owner,
            state,
            community: None,
            amount_cents: 0,
            subject: subject.into(),
            description: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_community(mut self, community: CommunityId) -> Self {
        self.community = Some(community);
        self
    }

    pub fn with_amount_cents(mut self, amount_cents: u64) -> Self {
        self.amount_cents = amount_cents;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

// ── New-request payload ──────────────────────────────────────────────

/// Payload for creating a request.
///
/// `owner_override` carries the admin-entered-compensation flow: a
/// reviewer or admin files a compensation on a collaborator's behalf,
/// and the named collaborator stays the owner.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewRequest {
    pub kind: RequestKind,
    pub subject: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community: Option<CommunityId>,
    #[serde(default)]
    pub amount_cents: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_override: Option<UserId>,
}

impl NewRequest {
    pub fn compensation(subject: impl Into<String>) -> Self {
        Self {
            kind: RequestKind::Compensation,
            subject: subject.into(),
            description: String::new(),
            community: None,
            amount_cents: 0,
            owner_override: None,
        }
    }

    pub fn expense(subject: impl Into<String>, amount_cents: u64) -> Self {
        Self {
            kind: RequestKind::Expense,
            subject: subject.into(),
            description: String::new(),
            community: None,
            amount_cents,
            owner_override: None,
        }
    }

    pub fn ticket(subject: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: RequestKind::Ticket,
            subject: subject.into(),
            description: description.into(),
            community: None,
            amount_cents: 0,
            owner_override: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_community(mut self, community: CommunityId) -> Self {
        self.community = Some(community);
        self
    }

    pub fn with_amount_cents(mut self, amount_cents: u64) -> Self {
        self.amount_cents = amount_cents;
        self
    }

    /// File on a collaborator's behalf (admin-entered compensations).
    pub fn on_behalf_of(mut self, owner: UserId) -> Self {
        self.owner_override = Some(owner);
        self
    }
}
