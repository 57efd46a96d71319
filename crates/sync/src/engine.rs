//! Engine context wiring the consistency layer together.
//!
//! An explicit context object rather than a process-wide singleton: the
//! embedding application (or a test) constructs one per store and brackets
//! its lifetime with [`SyncEngine::init`] and [`SyncEngine::dispose`].

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use domain::models::{Event, EventDraft, MessageType, PaymentInfo, Reservation};
use domain::services::images::{BatchOutcome, ImageStore};
use domain::services::notification::{
    self, EventPublishedPayload, FollowerMilestonePayload, NotificationPayload, NotificationType,
    Notifier, ReservationReceivedPayload,
};
use persistence::repositories::{
    ChatRepository, EventRepository, RepoError, RepoOptions, ReservationRepository,
    ReviewRepository, UserRepository,
};
use persistence::store::DocumentStore;

use crate::auth::AuthState;
use crate::cache::EventCache;
use crate::config::Config;
use crate::subscriptions::{SubscriptionManager, Unsubscribe};

pub struct SyncEngine {
    pub events: EventRepository,
    pub reservations: ReservationRepository,
    pub reviews: ReviewRepository,
    pub chat: ChatRepository,
    pub users: UserRepository,
    pub cache: Arc<EventCache>,
    pub auth: AuthState,
    subscriptions: SubscriptionManager,
    notifier: Arc<dyn Notifier>,
    images: Arc<dyn ImageStore>,
    feed_subscription: Mutex<Option<Unsubscribe>>,
}

impl SyncEngine {
    pub fn new(
        config: &Config,
        store: Arc<dyn DocumentStore>,
        notifier: Arc<dyn Notifier>,
        images: Arc<dyn ImageStore>,
        auth: AuthState,
    ) -> Self {
        let options = RepoOptions {
            write_timeout: config.limits.write_timeout(),
            max_document_bytes: config.limits.max_document_bytes,
        };
        Self {
            events: EventRepository::with_options(Arc::clone(&store), options),
            reservations: ReservationRepository::with_options(Arc::clone(&store), options),
            reviews: ReviewRepository::with_options(Arc::clone(&store), options),
            chat: ChatRepository::with_options(Arc::clone(&store), options),
            users: UserRepository::with_options(Arc::clone(&store), options),
            cache: Arc::new(EventCache::new()),
            auth,
            subscriptions: SubscriptionManager::new(store),
            notifier,
            images,
            feed_subscription: Mutex::new(None),
        }
    }

    /// Starts the standing event-feed subscription that keeps the local
    /// cache current. Calling it again replaces the previous subscription.
    pub fn init(&self) {
        let cache = Arc::clone(&self.cache);
        let subscription = self
            .subscriptions
            .subscribe_event_feed(move |events| cache.replace_all(events));
        if let Some(previous) = self
            .feed_subscription
            .lock()
            .unwrap()
            .replace(subscription)
        {
            previous.unsubscribe();
        }
    }

    /// Tears down every live subscription. Idempotent.
    pub fn dispose(&self) {
        if let Some(subscription) = self.feed_subscription.lock().unwrap().take() {
            subscription.unsubscribe();
        }
        self.subscriptions.dispose();
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    /// Creates an event.
    ///
    /// On success, host notifications go out on a detached task. If the
    /// remote write fails outright (offline, timed out), an optimistic copy
    /// lands in the local cache as a second-class fallback and the error is
    /// still returned; validation failures get no fallback.
    pub async fn create_event(&self, draft: EventDraft) -> Result<Event, RepoError> {
        let fallback = draft.clone();
        match self.events.create(draft).await {
            Ok(event) => {
                self.notify_event_published(&event).await;
                Ok(event)
            }
            Err(err @ (RepoError::Store(_) | RepoError::Timeout(_))) => {
                let local_id = format!("local-{}", Uuid::new_v4());
                let event = Event::from_document(&local_id, &fallback.into_document());
                warn!(
                    event_id = %event.id,
                    error = %err,
                    "event write failed; keeping optimistic local copy"
                );
                self.cache.apply_local(event);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Deletes an event with best-effort image cleanup.
    pub async fn delete_event(&self, event: &Event) -> Result<BatchOutcome, RepoError> {
        let outcome = self.events.delete(event, self.images.as_ref()).await?;
        self.cache.remove_local(&event.id);
        Ok(outcome)
    }

    /// Reserves a spot on an event for the signed-in user.
    pub async fn reserve(
        &self,
        event: &Event,
        party_size: u32,
        payment: Option<PaymentInfo>,
    ) -> Result<Reservation, RepoError> {
        let user_id = self.signed_in_uid()?;
        if !event.allow_rsvp {
            return Err(RepoError::Validation(
                "event does not accept reservations".to_string(),
            ));
        }
        if let Some(profile) = self.users.get(&user_id).await {
            if profile.is_banned_from(&event.id) {
                return Err(RepoError::Validation(
                    "user is banned from this event".to_string(),
                ));
            }
        }

        let reservation = self
            .reservations
            .reserve(&user_id, &event.id, party_size, payment)
            .await?;

        let payload = NotificationPayload::ReservationReceived(ReservationReceivedPayload {
            notification_type: NotificationType::ReservationReceived,
            event_id: event.id.clone(),
            host_id: event.host_id.clone(),
            attendee_count: reservation.attendee_count,
            timestamp: Utc::now(),
        });
        notification::dispatch(Arc::clone(&self.notifier), event.host_id.clone(), payload);
        Ok(reservation)
    }

    /// Whether the signed-in user holds an active reservation. False when
    /// signed out.
    pub async fn is_going(&self, event_id: &str) -> bool {
        match self.auth.uid() {
            Some(uid) => self.reservations.is_user_going(&uid, event_id).await,
            None => false,
        }
    }

    /// The signed-in user's reservations; empty when signed out.
    pub async fn my_reservations(&self) -> Vec<Reservation> {
        match self.auth.uid() {
            Some(uid) => self.reservations.for_user(&uid).await,
            None => Vec::new(),
        }
    }

    /// Follows a profile as the signed-in user, firing a milestone
    /// notification when the target's follower count lands on one.
    pub async fn follow(&self, target_uid: &str) -> Result<(), RepoError> {
        let follower_uid = self.signed_in_uid()?;
        self.users.follow(&follower_uid, target_uid).await?;

        let count = self.users.follower_count(target_uid).await;
        if let Some(milestone) = notification::follower_milestone(count) {
            let payload = NotificationPayload::FollowerMilestone(FollowerMilestonePayload {
                notification_type: NotificationType::FollowerMilestone,
                user_id: target_uid.to_string(),
                milestone,
                timestamp: Utc::now(),
            });
            notification::dispatch(
                Arc::clone(&self.notifier),
                target_uid.to_string(),
                payload,
            );
        }
        Ok(())
    }

    /// Host-initiated expulsion: records the expulsion, cancels the user's
    /// active reservations, bans them from the event, and posts a system
    /// chat message. Everything past the expulsion record is best-effort.
    pub async fn expel_user(&self, event: &Event, user_id: &str) -> Result<(), RepoError> {
        let expelled_by = self.signed_in_uid()?;
        self.reservations
            .expel(&event.id, user_id, &expelled_by)
            .await?;

        if let Err(err) = self.users.ban_from_event(user_id, &event.id).await {
            warn!(user_id, event_id = %event.id, error = %err, "ban record failed");
        }
        if event.allow_chat {
            if let Err(err) = self
                .chat
                .append(
                    &event.id,
                    &expelled_by,
                    "A guest was removed from this event",
                    MessageType::System,
                    true,
                )
                .await
            {
                warn!(event_id = %event.id, error = %err, "expulsion notice failed");
            }
        }
        Ok(())
    }

    async fn notify_event_published(&self, event: &Event) {
        let hosted = self.events.hosted_count(&event.host_id).await;
        let notification_type = if hosted <= 1 {
            NotificationType::FirstEventPublished
        } else {
            NotificationType::EventPublished
        };
        let payload = NotificationPayload::EventPublished(EventPublishedPayload {
            notification_type,
            event_id: event.id.clone(),
            host_id: event.host_id.clone(),
            title: event.title.clone(),
            timestamp: Utc::now(),
        });
        notification::dispatch(Arc::clone(&self.notifier), event.host_id.clone(), payload);
    }

    fn signed_in_uid(&self) -> Result<String, RepoError> {
        self.auth
            .uid()
            .ok_or_else(|| RepoError::Validation("no signed-in user".to_string()))
    }
}
