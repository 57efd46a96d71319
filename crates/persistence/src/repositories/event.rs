//! Event repository.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use domain::models::{Event, EventDraft};
use domain::services::images::{self, BatchOutcome, ImageStore};
use domain::services::rating::RatingSummary;
use shared::sanitize::sanitize_with_limit;
use shared::validation::{
    validate_event_time, validate_latitude, validate_longitude, validate_price,
};

use crate::paths;
use crate::store::{Document, DocumentStore, Query};

use super::{log_read_error, write_with_timeout, RepoError, RepoOptions};

/// Repository for event documents.
#[derive(Clone)]
pub struct EventRepository {
    store: Arc<dyn DocumentStore>,
    options: RepoOptions,
}

impl EventRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_options(store, RepoOptions::default())
    }

    pub fn with_options(store: Arc<dyn DocumentStore>, options: RepoOptions) -> Self {
        Self { store, options }
    }

    /// Creates an event. The draft is validated and sanitized first, so a
    /// missing required field, a bad field value, or an oversized payload
    /// fails before any network call.
    pub async fn create(&self, draft: EventDraft) -> Result<Event, RepoError> {
        validate_draft(&draft)?;
        let mut doc = draft.into_document();
        doc.entry("createdAt".to_string())
            .or_insert_with(|| json!(Utc::now()));
        let doc = sanitize_with_limit(doc, Event::REQUIRED_FIELDS, self.options.max_document_bytes)?;
        let id = write_with_timeout(
            self.options.write_timeout,
            self.store.create(paths::EVENTS, doc.clone()),
        )
        .await?;
        Ok(Event::from_document(&id, &doc))
    }

    pub async fn get(&self, id: &str) -> Option<Event> {
        match self.store.get(paths::EVENTS, id).await {
            Ok(doc) => doc.map(|doc| Event::from_document(id, &doc)),
            Err(err) => {
                log_read_error("events.get", &err);
                None
            }
        }
    }

    pub async fn list(&self) -> Vec<Event> {
        self.run_query(Query::collection(paths::EVENTS).order_by("date"), "events.list")
            .await
    }

    pub async fn list_by_city(&self, city: &str) -> Vec<Event> {
        self.run_query(
            Query::collection(paths::EVENTS)
                .where_eq("city", city)
                .order_by("date"),
            "events.list_by_city",
        )
        .await
    }

    pub async fn list_by_host(&self, host_id: &str) -> Vec<Event> {
        self.run_query(
            Query::collection(paths::EVENTS).where_eq("hostId", host_id),
            "events.list_by_host",
        )
        .await
    }

    pub async fn list_by_tag(&self, tag: &str) -> Vec<Event> {
        self.run_query(
            Query::collection(paths::EVENTS).array_contains("tags", tag),
            "events.list_by_tag",
        )
        .await
    }

    /// Number of non-draft events the host has published. Zero on store
    /// failure, like every other read path.
    pub async fn hosted_count(&self, host_id: &str) -> u32 {
        self.list_by_host(host_id)
            .await
            .iter()
            .filter(|event| !event.is_draft)
            .count() as u32
    }

    /// Merges `fields` into the event document.
    ///
    /// An empty image list on an update means an upload failed upstream;
    /// the field is dropped so the prior images survive (an event must never
    /// end up with no images after a successful update).
    pub async fn update(&self, id: &str, mut fields: Document) -> Result<(), RepoError> {
        if let Some(Value::Array(images)) = fields.get("images") {
            if images.is_empty() {
                warn!(event_id = id, "dropping empty image list from update");
                fields.remove("images");
            }
        }
        let fields = sanitize_with_limit(fields, &[], self.options.max_document_bytes)?;
        write_with_timeout(
            self.options.write_timeout,
            self.store.update_fields(paths::EVENTS, id, fields),
        )
        .await
    }

    /// Soft-deletes (or restores) an event by toggling its draft flag.
    pub async fn set_draft(&self, id: &str, is_draft: bool) -> Result<(), RepoError> {
        let mut fields = Document::new();
        fields.insert("isDraft".to_string(), json!(is_draft));
        write_with_timeout(
            self.options.write_timeout,
            self.store.update_fields(paths::EVENTS, id, fields),
        )
        .await
    }

    /// Writes a recomputed rating summary in one atomic field update. The
    /// values are always recomputed from the review set, never incremented.
    pub async fn apply_rating(&self, id: &str, summary: RatingSummary) -> Result<(), RepoError> {
        let mut fields = Document::new();
        fields.insert("rating".to_string(), json!(summary.rating));
        fields.insert("reviewCount".to_string(), json!(summary.review_count));
        write_with_timeout(
            self.options.write_timeout,
            self.store.update_fields(paths::EVENTS, id, fields),
        )
        .await
    }

    /// Hard delete: removes the document, then best-effort deletes its
    /// stored images. Subcollections are left behind.
    pub async fn delete(
        &self,
        event: &Event,
        image_store: &dyn ImageStore,
    ) -> Result<BatchOutcome, RepoError> {
        write_with_timeout(
            self.options.write_timeout,
            self.store.delete(paths::EVENTS, &event.id),
        )
        .await?;
        let outcome = images::delete_all(image_store, &event.images).await;
        if outcome.failed > 0 {
            warn!(
                event_id = %event.id,
                failed = outcome.failed,
                "some event images could not be deleted"
            );
        }
        Ok(outcome)
    }

    async fn run_query(&self, query: Query, context: &'static str) -> Vec<Event> {
        match self.store.query(&query).await {
            Ok(docs) => docs
                .iter()
                .map(|(id, doc)| Event::from_document(id, doc))
                .collect(),
            Err(err) => {
                log_read_error(context, &err);
                Vec::new()
            }
        }
    }
}

fn validate_draft(draft: &EventDraft) -> Result<(), RepoError> {
    if let Some(time) = &draft.time {
        validate_event_time(time).map_err(|err| RepoError::Validation(err.to_string()))?;
    }
    if let Some(lat) = draft.lat {
        validate_latitude(lat).map_err(|err| RepoError::Validation(err.to_string()))?;
    }
    if let Some(lng) = draft.lng {
        validate_longitude(lng).map_err(|err| RepoError::Validation(err.to_string()))?;
    }
    validate_price(draft.price).map_err(|err| RepoError::Validation(err.to_string()))?;
    Ok(())
}
