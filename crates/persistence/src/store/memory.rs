//! In-memory document store.
//!
//! A map of collections plus a broadcast channel of change notifications,
//! the same shape a push-capable backend exposes. Used by tests and local
//! runs. Carries hooks to simulate an unavailable backend and per-path
//! permission denials, watcher accounting for leak assertions, and a
//! mutation counter usable as a write spy.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::metrics::{record_write, OpTimer};

use super::{Document, DocumentStore, Predicate, Query, Snapshot, SnapshotStream, StoreError};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

struct Inner {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
    changes: broadcast::Sender<String>,
    watchers: RwLock<HashMap<String, Arc<AtomicUsize>>>,
    denied: RwLock<HashSet<String>>,
    unavailable: AtomicBool,
    writes: AtomicU64,
}

/// In-memory [`DocumentStore`] implementation.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(HashMap::new()),
                changes,
                watchers: RwLock::new(HashMap::new()),
                denied: RwLock::new(HashSet::new()),
                unavailable: AtomicBool::new(false),
                writes: AtomicU64::new(0),
            }),
        }
    }

    /// Simulates an access-control denial on a collection path.
    pub fn deny(&self, path: impl Into<String>) {
        self.inner.denied.write().unwrap().insert(path.into());
    }

    pub fn allow(&self, path: &str) {
        self.inner.denied.write().unwrap().remove(path);
    }

    /// Simulates a backend that cannot be reached.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of live watchers on a collection path.
    pub fn watcher_count(&self, path: &str) -> usize {
        self.inner
            .watchers
            .read()
            .unwrap()
            .get(path)
            .map(|counter| counter.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Total mutation operations attempted, including rejected ones that
    /// reached the store. Zero means nothing got past client-side checks.
    pub fn write_count(&self) -> u64 {
        self.inner.writes.load(Ordering::SeqCst)
    }

    fn guard(&self, path: &str) -> Result<(), StoreError> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        if self.inner.denied.read().unwrap().contains(path) {
            return Err(StoreError::PermissionDenied {
                path: path.to_string(),
            });
        }
        Ok(())
    }

    fn count_write(&self, op: &str) {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        record_write(op);
    }

    fn notify(&self, path: &str) {
        let _ = self.inner.changes.send(path.to_string());
    }

    fn watcher_counter(&self, path: &str) -> Arc<AtomicUsize> {
        Arc::clone(
            self.inner
                .watchers
                .write()
                .unwrap()
                .entry(path.to_string())
                .or_default(),
        )
    }
}

fn eval_query(
    collections: &HashMap<String, BTreeMap<String, Document>>,
    query: &Query,
) -> Vec<(String, Document)> {
    let mut docs: Vec<(String, Document)> = collections
        .get(&query.path)
        .map(|collection| {
            collection
                .iter()
                .filter(|(_, doc)| query.predicates.iter().all(|p| matches(doc, p)))
                .map(|(id, doc)| (id.clone(), doc.clone()))
                .collect()
        })
        .unwrap_or_default();

    if let Some(field) = &query.order_by {
        docs.sort_by(|(a_id, a), (b_id, b)| {
            cmp_field(a.get(field), b.get(field)).then_with(|| a_id.cmp(b_id))
        });
    }
    if let Some(limit) = query.limit {
        docs.truncate(limit);
    }
    docs
}

fn matches(doc: &Document, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Eq(field, value) => doc.get(field) == Some(value),
        Predicate::ArrayContains(field, value) => doc
            .get(field)
            .and_then(Value::as_array)
            .map(|items| items.contains(value))
            .unwrap_or(false),
    }
}

fn cmp_field(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (None, None) => Ordering::Equal,
        // Documents missing the order field sort last.
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match (a, b) {
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Number(x), Value::Number(y)) => x
                .as_f64()
                .unwrap_or(0.0)
                .partial_cmp(&y.as_f64().unwrap_or(0.0))
                .unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

/// Decrements the per-path watcher counter when a stream is dropped.
struct WatcherGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for WatcherGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.guard(path)?;
        let timer = OpTimer::new("get");
        let doc = self
            .inner
            .collections
            .read()
            .unwrap()
            .get(path)
            .and_then(|collection| collection.get(id))
            .cloned();
        timer.record();
        Ok(doc)
    }

    async fn create(&self, path: &str, doc: Document) -> Result<String, StoreError> {
        self.count_write("create");
        self.guard(path)?;
        let id = Uuid::new_v4().to_string();
        self.inner
            .collections
            .write()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .insert(id.clone(), doc);
        self.notify(path);
        Ok(id)
    }

    async fn set(&self, path: &str, id: &str, doc: Document) -> Result<(), StoreError> {
        self.count_write("set");
        self.guard(path)?;
        self.inner
            .collections
            .write()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .insert(id.to_string(), doc);
        self.notify(path);
        Ok(())
    }

    async fn update_fields(
        &self,
        path: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), StoreError> {
        self.count_write("update_fields");
        self.guard(path)?;
        {
            let mut collections = self.inner.collections.write().unwrap();
            let doc = collections
                .get_mut(path)
                .and_then(|collection| collection.get_mut(id))
                .ok_or_else(|| StoreError::NotFound {
                    path: path.to_string(),
                    id: id.to_string(),
                })?;
            for (key, value) in fields {
                doc.insert(key, value);
            }
        }
        self.notify(path);
        Ok(())
    }

    async fn array_union(
        &self,
        path: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        self.count_write("array_union");
        self.guard(path)?;
        {
            let mut collections = self.inner.collections.write().unwrap();
            let doc = collections
                .get_mut(path)
                .and_then(|collection| collection.get_mut(id))
                .ok_or_else(|| StoreError::NotFound {
                    path: path.to_string(),
                    id: id.to_string(),
                })?;
            let entry = doc
                .entry(field.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            match entry.as_array_mut() {
                Some(items) => {
                    if !items.contains(&value) {
                        items.push(value);
                    }
                }
                None => {
                    return Err(StoreError::Backend {
                        message: format!("field '{field}' is not an array"),
                    })
                }
            }
        }
        self.notify(path);
        Ok(())
    }

    async fn array_remove(
        &self,
        path: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        self.count_write("array_remove");
        self.guard(path)?;
        {
            let mut collections = self.inner.collections.write().unwrap();
            let doc = collections
                .get_mut(path)
                .and_then(|collection| collection.get_mut(id))
                .ok_or_else(|| StoreError::NotFound {
                    path: path.to_string(),
                    id: id.to_string(),
                })?;
            if let Some(items) = doc.get_mut(field).and_then(Value::as_array_mut) {
                items.retain(|item| item != &value);
            }
        }
        self.notify(path);
        Ok(())
    }

    async fn delete(&self, path: &str, id: &str) -> Result<(), StoreError> {
        self.count_write("delete");
        self.guard(path)?;
        if let Some(collection) = self.inner.collections.write().unwrap().get_mut(path) {
            collection.remove(id);
        }
        self.notify(path);
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<(String, Document)>, StoreError> {
        self.guard(&query.path)?;
        let timer = OpTimer::new("query");
        let docs = eval_query(&self.inner.collections.read().unwrap(), query);
        timer.record();
        Ok(docs)
    }

    async fn watch(&self, query: Query) -> Result<SnapshotStream, StoreError> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }

        let counter = self.watcher_counter(&query.path);
        counter.fetch_add(1, Ordering::SeqCst);
        let guard = WatcherGuard { counter };

        let (tx, rx) = mpsc::unbounded_channel();

        // A denial surfaces through the listener, like the backend's error
        // callback, not as a setup failure.
        if self.inner.denied.read().unwrap().contains(&query.path) {
            let _ = tx.send(Err(StoreError::PermissionDenied {
                path: query.path.clone(),
            }));
            return Ok(SnapshotStream::with_guard(rx, Box::new(guard)));
        }

        let initial = eval_query(&self.inner.collections.read().unwrap(), &query);
        let _ = tx.send(Ok(Snapshot { docs: initial }));

        let mut change_rx = self.inner.changes.subscribe();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            loop {
                match change_rx.recv().await {
                    Ok(changed_path) if changed_path == query.path => {
                        let docs = eval_query(&inner.collections.read().unwrap(), &query);
                        if tx.send(Ok(Snapshot { docs })).is_err() {
                            break;
                        }
                    }
                    Ok(_) => continue,
                    // Missed notifications: the next snapshot is recomputed
                    // from current state, so nothing is lost.
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        let docs = eval_query(&inner.collections.read().unwrap(), &query);
                        if tx.send(Ok(Snapshot { docs })).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(SnapshotStream::with_guard(rx, Box::new(guard)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(entries: &[(&str, Value)]) -> Document {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_create_get_round_trip() {
        let store = MemoryStore::new();
        let id = store
            .create("events", doc(&[("title", json!("Pop-up"))]))
            .await
            .unwrap();
        let loaded = store.get("events", &id).await.unwrap().unwrap();
        assert_eq!(loaded.get("title"), Some(&json!("Pop-up")));
    }

    #[tokio::test]
    async fn test_update_fields_merges_atomically() {
        let store = MemoryStore::new();
        let id = store
            .create("events", doc(&[("rating", json!(0)), ("title", json!("t"))]))
            .await
            .unwrap();
        store
            .update_fields(
                "events",
                &id,
                doc(&[("rating", json!(4.5)), ("reviewCount", json!(2))]),
            )
            .await
            .unwrap();
        let loaded = store.get("events", &id).await.unwrap().unwrap();
        assert_eq!(loaded.get("rating"), Some(&json!(4.5)));
        assert_eq!(loaded.get("reviewCount"), Some(&json!(2)));
        assert_eq!(loaded.get("title"), Some(&json!("t")));
    }

    #[tokio::test]
    async fn test_update_fields_missing_doc_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_fields("events", "ghost", doc(&[("rating", json!(1))]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_array_union_is_idempotent() {
        let store = MemoryStore::new();
        store.set("users", "u-1", doc(&[])).await.unwrap();
        store
            .array_union("users", "u-1", "following", json!("u-2"))
            .await
            .unwrap();
        store
            .array_union("users", "u-1", "following", json!("u-2"))
            .await
            .unwrap();
        let loaded = store.get("users", "u-1").await.unwrap().unwrap();
        assert_eq!(loaded.get("following"), Some(&json!(["u-2"])));

        store
            .array_remove("users", "u-1", "following", json!("u-2"))
            .await
            .unwrap();
        let loaded = store.get("users", "u-1").await.unwrap().unwrap();
        assert_eq!(loaded.get("following"), Some(&json!([])));
    }

    #[tokio::test]
    async fn test_query_predicates_and_order() {
        let store = MemoryStore::new();
        store
            .set(
                "reservations",
                "r-1",
                doc(&[
                    ("eventId", json!("ev-1")),
                    ("status", json!("reserved")),
                    ("createdAt", json!("2026-01-02T00:00:00Z")),
                ]),
            )
            .await
            .unwrap();
        store
            .set(
                "reservations",
                "r-2",
                doc(&[
                    ("eventId", json!("ev-1")),
                    ("status", json!("cancelled")),
                    ("createdAt", json!("2026-01-01T00:00:00Z")),
                ]),
            )
            .await
            .unwrap();
        store
            .set(
                "reservations",
                "r-3",
                doc(&[("eventId", json!("ev-2")), ("status", json!("reserved"))]),
            )
            .await
            .unwrap();

        let query = Query::collection("reservations")
            .where_eq("eventId", "ev-1")
            .where_eq("status", "reserved");
        let docs = store.query(&query).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].0, "r-1");

        let query = Query::collection("reservations")
            .where_eq("eventId", "ev-1")
            .order_by("createdAt");
        let docs = store.query(&query).await.unwrap();
        let ids: Vec<&str> = docs.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["r-2", "r-1"]);
    }

    #[tokio::test]
    async fn test_array_contains_predicate() {
        let store = MemoryStore::new();
        store
            .set("events", "ev-1", doc(&[("tags", json!(["music", "free"]))]))
            .await
            .unwrap();
        store
            .set("events", "ev-2", doc(&[("tags", json!(["food"]))]))
            .await
            .unwrap();
        let docs = store
            .query(&Query::collection("events").array_contains("tags", "music"))
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].0, "ev-1");
    }

    #[tokio::test]
    async fn test_watch_delivers_initial_and_change_snapshots() {
        let store = MemoryStore::new();
        let mut stream = store
            .watch(Query::collection("events"))
            .await
            .unwrap();
        let initial = stream.next().await.unwrap().unwrap();
        assert!(initial.docs.is_empty());

        store.set("events", "ev-1", doc(&[])).await.unwrap();
        let next = stream.next().await.unwrap().unwrap();
        assert_eq!(next.docs.len(), 1);
        assert_eq!(store.watcher_count("events"), 1);

        drop(stream);
        // Guard drops synchronously with the stream.
        assert_eq!(store.watcher_count("events"), 0);
    }

    #[tokio::test]
    async fn test_denied_path_fails_operations_and_watch() {
        let store = MemoryStore::new();
        store.deny("events");
        assert!(store.get("events", "x").await.is_err());
        assert!(store.create("events", doc(&[])).await.is_err());

        let mut stream = store.watch(Query::collection("events")).await.unwrap();
        let first = stream.next().await.unwrap();
        assert!(matches!(first, Err(StoreError::PermissionDenied { .. })));
    }

    #[test]
    fn test_unavailable_store_fails_fast() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            store.set_unavailable(true);
            assert!(matches!(
                store.get("events", "x").await,
                Err(StoreError::Unavailable)
            ));
            assert!(store.watch(Query::collection("events")).await.is_err());
        });
    }
}
