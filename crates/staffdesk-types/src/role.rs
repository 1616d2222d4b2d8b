//! Domain roles and the acting principal
//!
//! Roles are a closed set. The engine never branches on loose role
//! strings; unknown values are rejected at the serde boundary.

use crate::{CommunityId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// The closed set of domain roles.
///
/// Serialized with the platform's historical role names so existing
/// directory data keeps round-tripping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The submitting collaborator: owns requests, may submit drafts
    /// and attach documents pre-submission.
    #[serde(rename = "collaboratore")]
    Collaborator,
    /// First-line approval, scoped to assigned communities.
    #[serde(rename = "responsabile")]
    Reviewer,
    /// Final approval and payment, unscoped.
    #[serde(rename = "amministrazione")]
    Admin,
}

impl Role {
    /// The wire/storage name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Collaborator => "collaboratore",
            Role::Reviewer => "responsabile",
            Role::Admin => "amministrazione",
        }
    }

    /// All roles, in escalation order.
    pub fn all() -> [Role; 3] {
        [Role::Collaborator, Role::Reviewer, Role::Admin]
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "collaboratore" => Ok(Role::Collaborator),
            "responsabile" => Ok(Role::Reviewer),
            "amministrazione" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Rejection for a role name outside the closed set.
#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

// ── Actor ────────────────────────────────────────────────────────────

/// The authenticated principal on whose behalf an operation runs.
///
/// Authentication happens outside the engine; the actor arrives already
/// resolved. The reviewer community assignment set is caller-supplied
/// input on every call; the engine never stores it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
    /// Communities this actor reviews. Only meaningful for reviewers.
    #[serde(default, skip_serializing_if = "HashSet::is_empty")]
    pub communities: HashSet<CommunityId>,
}

impl Actor {
    pub fn collaborator(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Collaborator,
            communities: HashSet::new(),
        }
    }

    pub fn reviewer(user_id: UserId, communities: impl IntoIterator<Item = CommunityId>) -> Self {
        Self {
            user_id,
            role: Role::Reviewer,
            communities: communities.into_iter().collect(),
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
            communities: HashSet::new(),
        }
    }

    /// Check whether this actor's review scope covers a community.
    ///
    /// Admins are unscoped; a request without a community has no scope
    /// to violate.
    pub fn covers(&self, community: Option<&CommunityId>) -> bool {
        match (self.role, community) {
            (Role::Admin, _) => true,
            (_, None) => true,
            (_, Some(c)) => self.communities.contains(c),
        }
    }
}
