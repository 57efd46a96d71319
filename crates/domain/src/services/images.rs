//! Image storage port.
//!
//! Upload and deletion are provided by an external collaborator; this layer
//! consumes it as a black box keyed by storage path. Batch operations
//! continue past individual item failures and report an aggregate outcome
//! instead of aborting.

use std::collections::HashSet;
use std::sync::Mutex;
use thiserror::Error;
use tracing::warn;

/// Failure from the underlying storage collaborator.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("upload failed for '{path}': {reason}")]
    Upload { path: String, reason: String },

    #[error("delete failed for '{path}': {reason}")]
    Delete { path: String, reason: String },
}

/// Port to the external image storage collaborator.
#[async_trait::async_trait]
pub trait ImageStore: Send + Sync {
    /// Uploads `bytes` at `path` and returns the public URL.
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<String, ImageError>;

    async fn delete(&self, path: &str) -> Result<(), ImageError>;
}

/// Storage path convention for event images.
pub fn image_path(host_uid: &str, timestamp_millis: i64, index: usize, filename: &str) -> String {
    format!("events/{host_uid}/{timestamp_millis}_{index}_{filename}")
}

/// Aggregate result of a batch storage operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

/// Deletes every path, continuing past individual failures.
pub async fn delete_all(store: &dyn ImageStore, paths: &[String]) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for path in paths {
        match store.delete(path).await {
            Ok(()) => outcome.succeeded += 1,
            Err(err) => {
                outcome.failed += 1;
                warn!(%path, error = %err, "image delete failed");
            }
        }
    }
    outcome
}

/// Uploads every `(path, bytes)` pair, continuing past individual failures.
/// Returns the URLs that did upload alongside the aggregate outcome.
pub async fn upload_all(
    store: &dyn ImageStore,
    images: &[(String, Vec<u8>)],
) -> (Vec<String>, BatchOutcome) {
    let mut urls = Vec::new();
    let mut outcome = BatchOutcome::default();
    for (path, bytes) in images {
        match store.upload(path, bytes).await {
            Ok(url) => {
                urls.push(url);
                outcome.succeeded += 1;
            }
            Err(err) => {
                outcome.failed += 1;
                warn!(%path, error = %err, "image upload failed");
            }
        }
    }
    (urls, outcome)
}

/// In-memory image store for tests. Paths listed as failing reject both
/// upload and delete.
#[derive(Default)]
pub struct MockImageStore {
    stored: Mutex<HashSet<String>>,
    failing: Mutex<HashSet<String>>,
}

impl MockImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, path: impl Into<String>) {
        self.failing.lock().unwrap().insert(path.into());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.stored.lock().unwrap().contains(path)
    }

    pub fn stored_count(&self) -> usize {
        self.stored.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl ImageStore for MockImageStore {
    async fn upload(&self, path: &str, _bytes: &[u8]) -> Result<String, ImageError> {
        if self.failing.lock().unwrap().contains(path) {
            return Err(ImageError::Upload {
                path: path.to_string(),
                reason: "mock store configured to fail".to_string(),
            });
        }
        self.stored.lock().unwrap().insert(path.to_string());
        Ok(format!("https://img.popera.app/{path}"))
    }

    async fn delete(&self, path: &str) -> Result<(), ImageError> {
        if self.failing.lock().unwrap().contains(path) {
            return Err(ImageError::Delete {
                path: path.to_string(),
                reason: "mock store configured to fail".to_string(),
            });
        }
        self.stored.lock().unwrap().remove(path);
        Ok(())
    }
}
