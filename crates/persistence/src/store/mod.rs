//! Document store contract.
//!
//! The backing document database is an external capability. This trait
//! captures exactly what the consistency layer consumes: document CRUD,
//! compound-predicate queries, atomic single-document field updates, and
//! push-based change subscriptions. Snapshots delivered on one watch are
//! temporally ordered; each reflects a superset of the mutations reflected
//! by the previous one.

mod memory;

pub use memory::MemoryStore;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

/// A persisted document, keyed by wire field name.
pub type Document = serde_json::Map<String, Value>;

/// Failures surfaced by the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store handle could not be obtained (still initializing, offline).
    #[error("document store unavailable")]
    Unavailable,

    /// The backend rejected the operation under its access-control policy.
    /// Expected and frequent on demo/seed data paths; never retried.
    #[error("permission denied on '{path}'")]
    PermissionDenied { path: String },

    #[error("document not found: {path}/{id}")]
    NotFound { path: String, id: String },

    /// Any other backend failure.
    #[error("backend error: {message}")]
    Backend { message: String },
}

impl StoreError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, StoreError::PermissionDenied { .. })
    }
}

/// A single predicate in a compound query.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Field equals value.
    Eq(String, Value),
    /// Array field contains value.
    ArrayContains(String, Value),
}

/// A compound query over one collection.
///
/// Ordering is ascending only (the layer sorts on `date`/`createdAt` and
/// nothing else); documents missing the order field sort last, ties break on
/// document id.
#[derive(Debug, Clone)]
pub struct Query {
    pub path: String,
    pub predicates: Vec<Predicate>,
    pub order_by: Option<String>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            predicates: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::Eq(field.into(), value.into()));
        self
    }

    pub fn array_contains(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates
            .push(Predicate::ArrayContains(field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One whole-collection result delivered to a watcher. Listeners always
/// receive full snapshots, never incremental patches.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub docs: Vec<(String, Document)>,
}

/// Push-based change subscription handle. Dropping the stream releases the
/// underlying listener.
pub struct SnapshotStream {
    rx: mpsc::UnboundedReceiver<Result<Snapshot, StoreError>>,
    _guard: Option<Box<dyn std::any::Any + Send>>,
}

impl SnapshotStream {
    pub fn new(rx: mpsc::UnboundedReceiver<Result<Snapshot, StoreError>>) -> Self {
        Self { rx, _guard: None }
    }

    /// A stream whose teardown is observable through `guard`'s `Drop`.
    pub fn with_guard(
        rx: mpsc::UnboundedReceiver<Result<Snapshot, StoreError>>,
        guard: Box<dyn std::any::Any + Send>,
    ) -> Self {
        Self {
            rx,
            _guard: Some(guard),
        }
    }

    /// Next snapshot, or `None` once the listener is gone.
    pub async fn next(&mut self) -> Option<Result<Snapshot, StoreError>> {
        self.rx.recv().await
    }
}

/// The document database capability this layer is built against.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Creates a document under a generated id; returns the id.
    async fn create(&self, path: &str, doc: Document) -> Result<String, StoreError>;

    /// Creates or fully replaces the document at `id`.
    async fn set(&self, path: &str, id: &str, doc: Document) -> Result<(), StoreError>;

    /// Atomically merges `fields` into one existing document.
    async fn update_fields(&self, path: &str, id: &str, fields: Document)
        -> Result<(), StoreError>;

    /// Atomically appends `value` to an array field unless already present.
    async fn array_union(
        &self,
        path: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError>;

    /// Atomically removes every occurrence of `value` from an array field.
    async fn array_remove(
        &self,
        path: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError>;

    async fn delete(&self, path: &str, id: &str) -> Result<(), StoreError>;

    async fn query(&self, query: &Query) -> Result<Vec<(String, Document)>, StoreError>;

    /// Registers a push subscription. The stream yields the current snapshot
    /// immediately, then a fresh whole snapshot after every matching change.
    async fn watch(&self, query: Query) -> Result<SnapshotStream, StoreError>;
}
