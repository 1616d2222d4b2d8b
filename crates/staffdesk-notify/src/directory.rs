//! Role directory boundary
//!
//! Resolves "the admin role as a whole" or "reviewers of community C"
//! into concrete users, and users into email addresses. Backed by the
//! identity platform in production; an in-memory directory ships for
//! tests and demos.

use async_trait::async_trait;
use staffdesk_types::{CommunityId, Role, UserId};
use std::collections::HashMap;
use std::sync::RwLock;

/// Read boundary over the staff directory.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// All users holding a role.
    async fn users_in_role(&self, role: Role) -> Vec<UserId>;

    /// Reviewers assigned to a community; with `None`, every reviewer.
    async fn reviewers_for(&self, community: Option<&CommunityId>) -> Vec<UserId>;

    /// Email address for a user, if one is on file.
    async fn email_of(&self, user: &UserId) -> Option<String>;
}

/// In-memory staff directory.
#[derive(Default)]
pub struct InMemoryRoleDirectory {
    inner: RwLock<DirectoryInner>,
}

#[derive(Default)]
struct DirectoryInner {
    roles: HashMap<UserId, Role>,
    review_scopes: HashMap<UserId, Vec<CommunityId>>,
    emails: HashMap<UserId, String>,
}

impl InMemoryRoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user with a role and optional email address.
    pub fn add_user(&self, user: UserId, role: Role, email: Option<&str>) {
        let mut inner = self.inner.write().expect("directory lock poisoned");
        inner.roles.insert(user.clone(), role);
        if let Some(email) = email {
            inner.emails.insert(user, email.to_string());
        }
    }

    /// Assign a reviewer to a community.
    pub fn assign_reviewer(&self, user: UserId, community: CommunityId) {
        let mut inner = self.inner.write().expect("directory lock poisoned");
        inner.review_scopes.entry(user).or_default().push(community);
    }
}

#[async_trait]
impl RoleDirectory for InMemoryRoleDirectory {
    async fn users_in_role(&self, role: Role) -> Vec<UserId> {
        let inner = self.inner.read().expect("directory lock poisoned");
        let mut users: Vec<UserId> = inner
            .roles
            .iter()
            .filter(|(_, r)| **r == role)
            .map(|(u, _)| u.clone())
            .collect();
        users.sort_by(|a, b| a.0.cmp(&b.0));
        users
    }

    async fn reviewers_for(&self, community: Option<&CommunityId>) -> Vec<UserId> {
        let inner = self.inner.read().expect("directory lock poisoned");
        let mut users: Vec<UserId> = inner
            .roles
            .iter()
            .filter(|(user, role)| {
                **role == Role::Reviewer
                    && match community {
                        None => true,
                        Some(c) => inner
                            .review_scopes
                            .get(user)
                            .is_some_and(|scopes| scopes.contains(c)),
                    }
            })
            .map(|(u, _)| u.clone())
            .collect();
        users.sort_by(|a, b| a.0.cmp(&b.0));
        users
    }

    async fn email_of(&self, user: &UserId) -> Option<String> {
        let inner = self.inner.read().expect("directory lock poisoned");
        inner.emails.get(user).cloned()
    }
}
