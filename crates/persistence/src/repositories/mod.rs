//! Typed repositories over the document store.
//!
//! Read paths never propagate store failures to callers: they degrade to
//! empty or default values and log (permission denials at debug — they are
//! expected on demo/seed data — everything else at warn). Write paths fail
//! fast with typed errors and race a bounded timeout so the caller can tell
//! "still pending" from "rejected".

pub mod chat;
pub mod event;
pub mod reservation;
pub mod review;
pub mod user;

pub use chat::ChatRepository;
pub use event::EventRepository;
pub use reservation::ReservationRepository;
pub use review::ReviewRepository;
pub use user::UserRepository;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::store::StoreError;
use shared::sanitize::SanitizeError;

/// Default ceiling on a single store write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-repository knobs, plumbed from configuration.
#[derive(Debug, Clone, Copy)]
pub struct RepoOptions {
    pub write_timeout: Duration,
    pub max_document_bytes: usize,
}

impl Default for RepoOptions {
    fn default() -> Self {
        Self {
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            max_document_bytes: shared::sanitize::MAX_DOCUMENT_BYTES,
        }
    }
}

/// Failures surfaced by write paths.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The payload was rejected before any network call.
    #[error(transparent)]
    Invalid(#[from] SanitizeError),

    /// A field-level validation failure.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The write did not complete within the bounded wait; it may still be
    /// pending on the backend.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// A status change that would move a document backward in its lifecycle.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("not found: {0}")]
    NotFound(String),
}

/// Races a store write against the configured timeout.
pub(crate) async fn write_with_timeout<T, F>(timeout: Duration, op: F) -> Result<T, RepoError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, op).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(RepoError::Timeout(timeout)),
    }
}

/// Logs a swallowed read-path failure at the appropriate severity.
pub(crate) fn log_read_error(context: &'static str, err: &StoreError) {
    if err.is_permission_denied() {
        debug!(context, error = %err, "read denied; returning default");
    } else {
        warn!(context, error = %err, "read failed; returning default");
    }
}
