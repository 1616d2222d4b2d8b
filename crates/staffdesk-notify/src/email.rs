//! Email composition contract
//!
//! Transport is an external collaborator. This crate only composes
//! messages and hands them to an outbox; whatever retry policy exists
//! lives in the transport.

use crate::NotifyError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// A composed email, ready for the transport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to_address: String,
    pub subject: String,
    pub body: String,
}

/// Enqueue boundary toward the email transport.
#[async_trait]
pub trait EmailOutbox: Send + Sync {
    async fn enqueue(&self, message: EmailMessage) -> Result<(), NotifyError>;
}

/// Outbox that captures messages in memory (tests, demos).
#[derive(Default)]
pub struct InMemoryEmailOutbox {
    sent: Mutex<Vec<EmailMessage>>,
}

impl InMemoryEmailOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl EmailOutbox for InMemoryEmailOutbox {
    async fn enqueue(&self, message: EmailMessage) -> Result<(), NotifyError> {
        self.sent.lock().await.push(message);
        Ok(())
    }
}
