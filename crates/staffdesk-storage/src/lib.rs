//! Staffdesk Document Gateway
//!
//! A thin, stateless utility over an opaque blob store: derives upload
//! paths for request attachments and issues time-limited signed
//! retrieval URLs. No state-machine logic lives here.
//!
//! The signing backend is an external collaborator behind the
//! [`BlobSigner`] trait. Signing is bounded by a short timeout and any
//! failure (error or timeout) collapses to `None`; nothing past this
//! boundary ever sees a signer error.

#![deny(unsafe_code)]

use async_trait::async_trait;
use staffdesk_types::{RequestId, UserId};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Retrieval links live for one hour.
pub const DOCUMENT_URL_TTL: Duration = Duration::from_secs(3600);

/// Default upper bound on a single signing round-trip.
pub const DEFAULT_SIGN_TIMEOUT: Duration = Duration::from_secs(5);

/// Boundary toward the blob store's URL-signing facility.
#[async_trait]
pub trait BlobSigner: Send + Sync {
    async fn sign(&self, path: &str, ttl: Duration) -> Result<String, StorageError>;
}

/// Storage-layer errors. These stop at the gateway.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("signing failed: {0}")]
    Signing(String),
}

/// URLs materialized for one document, original and countersigned copy.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentUrls {
    pub original_url: Option<String>,
    pub signed_url: Option<String>,
}

/// Path derivation and signed-URL issuance for request documents.
pub struct DocumentGateway {
    signer: Arc<dyn BlobSigner>,
    sign_timeout: Duration,
}

impl DocumentGateway {
    pub fn new(signer: Arc<dyn BlobSigner>) -> Self {
        Self {
            signer,
            sign_timeout: DEFAULT_SIGN_TIMEOUT,
        }
    }

    pub fn with_sign_timeout(mut self, timeout: Duration) -> Self {
        self.sign_timeout = timeout;
        self
    }

    /// Deterministic, collision-free upload path for an attachment.
    ///
    /// The filename is sanitized so it can never escape the
    /// per-request prefix.
    pub fn derive_path(owner: &UserId, request: &RequestId, filename: &str) -> String {
        format!(
            "attachments/{}/{}/{}",
            owner,
            request,
            sanitize_filename(filename)
        )
    }

    /// A time-limited retrieval URL, or `None` on any signer failure.
    pub async fn sign_url(&self, path: &str, ttl: Duration) -> Option<String> {
        match tokio::time::timeout(self.sign_timeout, self.signer.sign(path, ttl)).await {
            Ok(Ok(url)) => Some(url),
            Ok(Err(err)) => {
                warn!(path, error = %err, "URL signing failed");
                None
            }
            Err(_) => {
                warn!(path, timeout_secs = self.sign_timeout.as_secs(), "URL signing timed out");
                None
            }
        }
    }

    /// Retrieval URLs for a document and its optional countersigned
    /// copy, resolved through two independent parallel lookups.
    pub async fn issue_urls(
        &self,
        original_path: &str,
        signed_path: Option<&str>,
    ) -> DocumentUrls {
        let original = self.sign_url(original_path, DOCUMENT_URL_TTL);
        let signed = async {
            match signed_path {
                Some(path) => self.sign_url(path, DOCUMENT_URL_TTL).await,
                None => None,
            }
        };
        let (original_url, signed_url) = tokio::join!(original, signed);
        DocumentUrls {
            original_url,
            signed_url,
        }
    }
}

/// Strip anything that could traverse outside the derived prefix.
fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c => c,
        })
        .collect();
    cleaned.trim_matches('.').trim().to_string()
}
