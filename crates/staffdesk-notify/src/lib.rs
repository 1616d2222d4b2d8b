//! Staffdesk Notification Fan-out
//!
//! Given a committed transition, this crate resolves who should hear
//! about it and over which channels, then delivers best-effort:
//!
//! - The **settings matrix** maps `(event, recipient role)` to channel
//!   switches and is fail-open: a missing row enables both channels.
//! - The **dispatcher** runs fire-and-forget relative to the lifecycle
//!   engine. A delivery failure is logged and swallowed per recipient;
//!   it never rolls back or blocks the already-committed transition.
//! - The **email outbox** is only a message-composition contract; the
//!   actual transport lives outside this workspace.

#![deny(unsafe_code)]

mod directory;
mod dispatcher;
mod email;
mod settings;
mod store;

pub use directory::*;
pub use dispatcher::*;
pub use email::*;
pub use settings::*;
pub use store::*;

use staffdesk_types::NotificationId;

/// Notification-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification not found: {0}")]
    NotFound(NotificationId),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("notification backend failure: {0}")]
    Backend(String),
}
