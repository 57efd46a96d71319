//! Review repository and the rating recompute.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::warn;

use domain::models::{Review, ReviewStatus};
use domain::services::rating::{self, RatingSummary};
use shared::sanitize::sanitize_with_limit;
use shared::validation::clamp_rating;

use crate::paths;
use crate::store::{Document, DocumentStore, Query};

use super::{log_read_error, write_with_timeout, RepoError, RepoOptions};

/// Repository for per-event review subcollections.
#[derive(Clone)]
pub struct ReviewRepository {
    store: Arc<dyn DocumentStore>,
    options: RepoOptions,
}

impl ReviewRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_options(store, RepoOptions::default())
    }

    pub fn with_options(store: Arc<dyn DocumentStore>, options: RepoOptions) -> Self {
        Self { store, options }
    }

    /// All reviews for an event, any status; empty on store failure.
    pub async fn list(&self, event_id: &str) -> Vec<Review> {
        let query = Query::collection(paths::reviews(event_id)).order_by("createdAt");
        match self.store.query(&query).await {
            Ok(docs) => docs
                .iter()
                .map(|(id, doc)| Review::from_document(id, doc))
                .collect(),
            Err(err) => {
                log_read_error("reviews.list", &err);
                Vec::new()
            }
        }
    }

    /// Adds a review (rating clamped to [1, 5]) and schedules the rating
    /// recompute. The recompute is best-effort consistency repair: its
    /// failure is logged, not returned.
    pub async fn add(
        &self,
        event_id: &str,
        user_id: &str,
        rating: u8,
        comment: &str,
    ) -> Result<Review, RepoError> {
        let mut doc = Document::new();
        doc.insert("userId".to_string(), json!(user_id));
        doc.insert("eventId".to_string(), json!(event_id));
        doc.insert("rating".to_string(), json!(clamp_rating(i64::from(rating))));
        doc.insert(
            "status".to_string(),
            json!(ReviewStatus::Accepted.as_str()),
        );
        doc.insert("comment".to_string(), json!(comment));
        doc.insert("createdAt".to_string(), json!(Utc::now()));

        let doc = sanitize_with_limit(
            doc,
            Review::REQUIRED_FIELDS,
            self.options.max_document_bytes,
        )?;
        let id = write_with_timeout(
            self.options.write_timeout,
            self.store.create(&paths::reviews(event_id), doc.clone()),
        )
        .await?;

        self.recalculate_logged(event_id).await;
        Ok(Review::from_document(&id, &doc))
    }

    /// Changes a review's moderation status and recomputes the rating.
    pub async fn set_status(
        &self,
        event_id: &str,
        review_id: &str,
        status: ReviewStatus,
    ) -> Result<(), RepoError> {
        let mut fields = Document::new();
        fields.insert("status".to_string(), json!(status.as_str()));
        write_with_timeout(
            self.options.write_timeout,
            self.store
                .update_fields(&paths::reviews(event_id), review_id, fields),
        )
        .await?;

        self.recalculate_logged(event_id).await;
        Ok(())
    }

    /// Deletes a review and recomputes the rating.
    pub async fn remove(&self, event_id: &str, review_id: &str) -> Result<(), RepoError> {
        write_with_timeout(
            self.options.write_timeout,
            self.store.delete(&paths::reviews(event_id), review_id),
        )
        .await?;

        self.recalculate_logged(event_id).await;
        Ok(())
    }

    /// Recomputes the event's cached rating from its accepted reviews and
    /// writes `{rating, reviewCount}` back in one atomic field update.
    ///
    /// Idempotent. Reads and writes are not wrapped in a transaction: a
    /// recompute racing a concurrent review mutation may use a slightly
    /// stale read and is corrected by the next recompute.
    pub async fn recalculate(&self, event_id: &str) -> Result<RatingSummary, RepoError> {
        let query = Query::collection(paths::reviews(event_id));
        let reviews: Vec<Review> = self
            .store
            .query(&query)
            .await?
            .iter()
            .map(|(id, doc)| Review::from_document(id, doc))
            .collect();
        let summary = rating::summarize(&reviews);

        let mut fields = Document::new();
        fields.insert("rating".to_string(), json!(summary.rating));
        fields.insert("reviewCount".to_string(), json!(summary.review_count));
        write_with_timeout(
            self.options.write_timeout,
            self.store.update_fields(paths::EVENTS, event_id, fields),
        )
        .await?;
        Ok(summary)
    }

    async fn recalculate_logged(&self, event_id: &str) {
        if let Err(err) = self.recalculate(event_id).await {
            warn!(event_id, error = %err, "rating recompute failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use domain::models::Event;

    async fn seed_event(store: &MemoryStore, id: &str) {
        let mut doc = Document::new();
        doc.insert("title".to_string(), json!("Pop-up"));
        doc.insert("city".to_string(), json!("Lisbon"));
        doc.insert("hostId".to_string(), json!("host-1"));
        store.set(paths::EVENTS, id, doc).await.unwrap();
    }

    async fn event_summary(store: &MemoryStore, id: &str) -> (f64, u32) {
        let doc = store.get(paths::EVENTS, id).await.unwrap().unwrap();
        let event = Event::from_document(id, &doc);
        (event.rating, event.review_count)
    }

    fn repo(store: &MemoryStore) -> ReviewRepository {
        ReviewRepository::new(Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn test_add_review_updates_cached_rating() {
        let store = MemoryStore::new();
        seed_event(&store, "ev-1").await;
        let repo = repo(&store);

        repo.add("ev-1", "u-1", 4, "solid").await.unwrap();
        repo.add("ev-1", "u-2", 5, "great").await.unwrap();

        assert_eq!(event_summary(&store, "ev-1").await, (4.5, 2));
    }

    #[tokio::test]
    async fn test_rating_is_clamped_on_write() {
        let store = MemoryStore::new();
        seed_event(&store, "ev-1").await;
        let repo = repo(&store);

        let review = repo.add("ev-1", "u-1", 9, "!!").await.unwrap();
        assert_eq!(review.rating, 5);
        assert_eq!(event_summary(&store, "ev-1").await, (5.0, 1));
    }

    #[tokio::test]
    async fn test_contesting_a_review_excludes_it() {
        let store = MemoryStore::new();
        seed_event(&store, "ev-1").await;
        let repo = repo(&store);

        let bad = repo.add("ev-1", "u-1", 1, "awful").await.unwrap();
        repo.add("ev-1", "u-2", 5, "lovely").await.unwrap();
        assert_eq!(event_summary(&store, "ev-1").await, (3.0, 2));

        repo.set_status("ev-1", &bad.id, ReviewStatus::Contested)
            .await
            .unwrap();
        assert_eq!(event_summary(&store, "ev-1").await, (5.0, 1));
    }

    #[tokio::test]
    async fn test_removing_last_review_resets_to_zero() {
        let store = MemoryStore::new();
        seed_event(&store, "ev-1").await;
        let repo = repo(&store);

        let review = repo.add("ev-1", "u-1", 4, "ok").await.unwrap();
        repo.remove("ev-1", &review.id).await.unwrap();
        assert_eq!(event_summary(&store, "ev-1").await, (0.0, 0));
    }

    #[tokio::test]
    async fn test_recalculate_is_idempotent() {
        let store = MemoryStore::new();
        seed_event(&store, "ev-1").await;
        let repo = repo(&store);

        repo.add("ev-1", "u-1", 3, "fine").await.unwrap();
        repo.add("ev-1", "u-2", 4, "good").await.unwrap();

        let first = repo.recalculate("ev-1").await.unwrap();
        let second = repo.recalculate("ev-1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(event_summary(&store, "ev-1").await, (3.5, 2));
    }

    #[tokio::test]
    async fn test_add_succeeds_even_when_recompute_cannot_write() {
        let store = MemoryStore::new();
        // No event document exists, so the recompute's write-back fails.
        let repo = repo(&store);
        let review = repo.add("ev-ghost", "u-1", 4, "fine").await.unwrap();
        assert_eq!(review.rating, 4);
    }
}
