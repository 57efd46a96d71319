//! Reservation repository.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::warn;

use domain::models::{PaymentInfo, Reservation, ReservationStatus};
use domain::services::attendance;
use shared::sanitize::sanitize_with_limit;
use shared::validation::validate_party_size;

use crate::paths;
use crate::store::{Document, DocumentStore, Query};

use super::{log_read_error, write_with_timeout, RepoError, RepoOptions};

/// Repository for reservation documents.
#[derive(Clone)]
pub struct ReservationRepository {
    store: Arc<dyn DocumentStore>,
    options: RepoOptions,
}

impl ReservationRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_options(store, RepoOptions::default())
    }

    pub fn with_options(store: Arc<dyn DocumentStore>, options: RepoOptions) -> Self {
        Self { store, options }
    }

    /// Query matching the active reservations of one event. Also the shape
    /// watched by live count subscriptions.
    pub fn active_query(event_id: &str) -> Query {
        Query::collection(paths::RESERVATIONS)
            .where_eq("eventId", event_id)
            .where_eq("status", ReservationStatus::Reserved.as_str())
    }

    /// Creates a reservation with status `reserved`.
    ///
    /// Nothing here checks for an existing active reservation of the same
    /// (user, event) pair; duplicates are representable and all count.
    pub async fn reserve(
        &self,
        user_id: &str,
        event_id: &str,
        party_size: u32,
        payment: Option<PaymentInfo>,
    ) -> Result<Reservation, RepoError> {
        validate_party_size(party_size)
            .map_err(|err| RepoError::Validation(err.to_string()))?;

        let mut doc = Document::new();
        doc.insert("userId".to_string(), json!(user_id));
        doc.insert("eventId".to_string(), json!(event_id));
        doc.insert(
            "status".to_string(),
            json!(ReservationStatus::Reserved.as_str()),
        );
        doc.insert("attendeeCount".to_string(), json!(party_size));
        if let Some(payment) = &payment {
            doc.insert("payment".to_string(), json!(payment));
        }
        doc.insert("createdAt".to_string(), json!(Utc::now()));

        let doc = sanitize_with_limit(
            doc,
            Reservation::REQUIRED_FIELDS,
            self.options.max_document_bytes,
        )?;
        let id = write_with_timeout(
            self.options.write_timeout,
            self.store.create(paths::RESERVATIONS, doc.clone()),
        )
        .await?;
        Ok(Reservation::from_document(&id, &doc))
    }

    /// Moves a reservation forward in its lifecycle. Backward transitions
    /// are rejected.
    pub async fn set_status(
        &self,
        reservation_id: &str,
        next: ReservationStatus,
    ) -> Result<(), RepoError> {
        let doc = self
            .store
            .get(paths::RESERVATIONS, reservation_id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("reservation {reservation_id}")))?;
        let current = Reservation::from_document(reservation_id, &doc).status;
        if !current.can_transition(next) {
            return Err(RepoError::InvalidTransition {
                from: current.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }

        let mut fields = Document::new();
        fields.insert("status".to_string(), json!(next.as_str()));
        write_with_timeout(
            self.options.write_timeout,
            self.store
                .update_fields(paths::RESERVATIONS, reservation_id, fields),
        )
        .await
    }

    pub async fn cancel(&self, reservation_id: &str) -> Result<(), RepoError> {
        self.set_status(reservation_id, ReservationStatus::Cancelled)
            .await
    }

    pub async fn check_in(&self, reservation_id: &str) -> Result<(), RepoError> {
        self.set_status(reservation_id, ReservationStatus::CheckedIn)
            .await
    }

    /// Active reservations for an event; empty on store failure.
    pub async fn active_for_event(&self, event_id: &str) -> Vec<Reservation> {
        match self.store.query(&Self::active_query(event_id)).await {
            Ok(docs) => docs
                .iter()
                .map(|(id, doc)| Reservation::from_document(id, doc))
                .collect(),
            Err(err) => {
                log_read_error("reservations.active_for_event", &err);
                Vec::new()
            }
        }
    }

    /// Sum of party sizes across active reservations. Zero on store failure,
    /// so a UI counter degrades instead of crashing a render.
    pub async fn active_count(&self, event_id: &str) -> u32 {
        attendance::active_attendee_total(&self.active_for_event(event_id).await)
    }

    /// Whether the user holds an active reservation for the event. False on
    /// store failure.
    pub async fn is_user_going(&self, user_id: &str, event_id: &str) -> bool {
        attendance::is_user_going(&self.active_for_event(event_id).await, user_id)
    }

    /// Every reservation a user holds, any status; empty on store failure.
    pub async fn for_user(&self, user_id: &str) -> Vec<Reservation> {
        let query = Query::collection(paths::RESERVATIONS).where_eq("userId", user_id);
        match self.store.query(&query).await {
            Ok(docs) => docs
                .iter()
                .map(|(id, doc)| Reservation::from_document(id, doc))
                .collect(),
            Err(err) => {
                log_read_error("reservations.for_user", &err);
                Vec::new()
            }
        }
    }

    /// Host-initiated expulsion: records the expulsion document, then
    /// cancels the user's active reservations for the event, continuing
    /// past individual failures. Returns how many were cancelled.
    pub async fn expel(
        &self,
        event_id: &str,
        user_id: &str,
        expelled_by: &str,
    ) -> Result<u32, RepoError> {
        let mut doc = Document::new();
        doc.insert("userId".to_string(), json!(user_id));
        doc.insert("eventId".to_string(), json!(event_id));
        doc.insert("expelledBy".to_string(), json!(expelled_by));
        doc.insert("createdAt".to_string(), json!(Utc::now()));
        write_with_timeout(
            self.options.write_timeout,
            self.store.create(&paths::expulsions(event_id), doc),
        )
        .await?;

        let query = Self::active_query(event_id).where_eq("userId", user_id);
        let active = match self.store.query(&query).await {
            Ok(docs) => docs,
            Err(err) => {
                log_read_error("reservations.expel", &err);
                Vec::new()
            }
        };

        let mut cancelled = 0;
        for (id, _) in active {
            let mut fields = Document::new();
            fields.insert(
                "status".to_string(),
                json!(ReservationStatus::Cancelled.as_str()),
            );
            match self
                .store
                .update_fields(paths::RESERVATIONS, &id, fields)
                .await
            {
                Ok(()) => cancelled += 1,
                Err(err) => {
                    warn!(reservation_id = %id, error = %err, "expulsion cascade skipped a reservation");
                }
            }
        }
        Ok(cancelled)
    }
}
