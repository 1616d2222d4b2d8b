//! Request attachments
//!
//! An attachment belongs to exactly one request and is only ever
//! created while that request sits in its kind's editable window. Once
//! the request leaves that window the attachment is retained forever.

use crate::{AttachmentId, RequestId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A document attached to a request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Unique attachment identifier
    pub id: AttachmentId,
    /// The owning request; exclusive, never shared
    pub request_id: RequestId,
    /// Opaque blob-store reference
    pub storage_path: String,
    /// Display filename as uploaded
    pub filename: String,
    /// When the attachment was recorded
    pub created_at: DateTime<Utc>,
}

impl Attachment {
    pub fn new(
        request_id: RequestId,
        storage_path: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            id: AttachmentId::generate(),
            request_id,
            storage_path: storage_path.into(),
            filename: filename.into(),
            created_at: Utc::now(),
        }
    }
}
