//! In-app notification store
//!
//! One row per recipient per delivered event. The owner may flip the
//! `read` flag or dismiss the row; nothing else mutates it.

use crate::NotifyError;
use async_trait::async_trait;
use staffdesk_types::{Notification, NotificationId, UserId};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Persistence boundary for in-app notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, notification: Notification) -> Result<(), NotifyError>;

    /// All notifications for a user, newest first.
    async fn list_for(&self, user: &UserId) -> Result<Vec<Notification>, NotifyError>;

    /// Flip the read flag. `Forbidden` unless `user` owns the row.
    async fn mark_read(
        &self,
        user: &UserId,
        id: &NotificationId,
    ) -> Result<Notification, NotifyError>;

    /// Delete the row. `Forbidden` unless `user` owns the row.
    async fn dismiss(&self, user: &UserId, id: &NotificationId) -> Result<(), NotifyError>;
}

/// Reference in-memory notification store.
#[derive(Default)]
pub struct InMemoryNotificationStore {
    rows: Mutex<HashMap<NotificationId, Notification>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn create(&self, notification: Notification) -> Result<(), NotifyError> {
        let mut rows = self.rows.lock().await;
        rows.insert(notification.id.clone(), notification);
        Ok(())
    }

    async fn list_for(&self, user: &UserId) -> Result<Vec<Notification>, NotifyError> {
        let rows = self.rows.lock().await;
        let mut list: Vec<Notification> = rows
            .values()
            .filter(|n| n.recipient == *user)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn mark_read(
        &self,
        user: &UserId,
        id: &NotificationId,
    ) -> Result<Notification, NotifyError> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .get_mut(id)
            .ok_or_else(|| NotifyError::NotFound(id.clone()))?;
        if row.recipient != *user {
            return Err(NotifyError::Forbidden(format!(
                "notification {} does not belong to {}",
                id, user
            )));
        }
        row.read = true;
        Ok(row.clone())
    }

    async fn dismiss(&self, user: &UserId, id: &NotificationId) -> Result<(), NotifyError> {
        let mut rows = self.rows.lock().await;
        match rows.get(id) {
            None => return Err(NotifyError::NotFound(id.clone())),
            Some(row) if row.recipient != *user => {
                return Err(NotifyError::Forbidden(format!(
                    "notification {} does not belong to {}",
                    id, user
                )));
            }
            Some(_) => {
                rows.remove(id);
            }
        }
        Ok(())
    }
}
