//! Real-time subscription registry.
//!
//! One instance of live state per subscription key: requesting a
//! subscription for a key that is already Active tears the previous listener
//! down first, so at most one underlying listener exists per key. Every
//! change notification replaces the consumer's derived value wholesale from
//! a full snapshot.
//!
//! Listener errors (permission denied, backend failure) invoke the consumer
//! callback once with an empty/zero value and leave the subscription
//! nominally active but silent; the error is usually not transient, so no
//! retry is attempted.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use domain::models::{chat, ChatMessage, Event, Reservation, UserProfile};
use domain::services::attendance;
use persistence::repositories::{ChatRepository, ReservationRepository, UserRepository};
use persistence::store::{DocumentStore, Query, Snapshot};

/// Identity of one live subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubscriptionKey {
    Chat(String),
    ReservationCount(String),
    FollowerCount(String),
    HostedEvents(String),
    EventFeed,
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionKey::Chat(id) => write!(f, "chat:{id}"),
            SubscriptionKey::ReservationCount(id) => write!(f, "reservationCount:{id}"),
            SubscriptionKey::FollowerCount(id) => write!(f, "followerCount:{id}"),
            SubscriptionKey::HostedEvents(id) => write!(f, "hostedEvents:{id}"),
            SubscriptionKey::EventFeed => write!(f, "events"),
        }
    }
}

struct ActiveSubscription {
    generation: u64,
    task: JoinHandle<()>,
}

struct Inner {
    store: Arc<dyn DocumentStore>,
    active: Mutex<HashMap<SubscriptionKey, ActiveSubscription>>,
    next_generation: AtomicU64,
}

impl Inner {
    fn teardown(&self, key: &SubscriptionKey, generation: u64) {
        let removed = {
            let mut active = self.active.lock().unwrap();
            let same_generation = active
                .get(key)
                .map(|sub| sub.generation == generation)
                .unwrap_or(false);
            if same_generation {
                active.remove(key)
            } else {
                None
            }
        };
        if let Some(sub) = removed {
            sub.task.abort();
            debug!(key = %key, "subscription torn down");
        }
    }
}

/// Handle returned to the consumer. Idempotent: calling it repeatedly, after
/// teardown, or after the subscription was replaced is a no-op.
pub struct Unsubscribe {
    inner: Weak<Inner>,
    key: SubscriptionKey,
    generation: u64,
    done: AtomicBool,
}

impl Unsubscribe {
    pub fn unsubscribe(&self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(inner) = self.inner.upgrade() {
            inner.teardown(&self.key, self.generation);
        }
    }
}

/// Registry of active change-subscriptions, keyed by entity.
#[derive(Clone)]
pub struct SubscriptionManager {
    inner: Arc<Inner>,
}

impl SubscriptionManager {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                active: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Live transcript of an event's chat.
    pub fn subscribe_chat(
        &self,
        event_id: &str,
        on_change: impl Fn(Vec<ChatMessage>) + Send + 'static,
    ) -> Unsubscribe {
        let query = ChatRepository::transcript_query(event_id);
        self.spawn(SubscriptionKey::Chat(event_id.to_string()), query, move |snapshot| {
            let mut messages: Vec<ChatMessage> = snapshot
                .map(|snapshot| {
                    snapshot
                        .docs
                        .iter()
                        .map(|(id, doc)| ChatMessage::from_document(id, doc))
                        .collect()
                })
                .unwrap_or_default();
            chat::sort_transcript(&mut messages);
            on_change(messages);
        })
    }

    /// Live active-attendee count for an event. The callback fires with the
    /// current sum on the initial snapshot and after every underlying change
    /// (create, cancel, party-size edit).
    pub fn subscribe_reservation_count(
        &self,
        event_id: &str,
        on_change: impl Fn(u32) + Send + 'static,
    ) -> Unsubscribe {
        let query = ReservationRepository::active_query(event_id);
        self.spawn(
            SubscriptionKey::ReservationCount(event_id.to_string()),
            query,
            move |snapshot| {
                let count = snapshot
                    .map(|snapshot| {
                        let reservations: Vec<Reservation> = snapshot
                            .docs
                            .iter()
                            .map(|(id, doc)| Reservation::from_document(id, doc))
                            .collect();
                        attendance::active_attendee_total(&reservations)
                    })
                    .unwrap_or(0);
                on_change(count);
            },
        )
    }

    /// Live follower count for a profile.
    pub fn subscribe_follower_count(
        &self,
        uid: &str,
        on_change: impl Fn(u32) + Send + 'static,
    ) -> Unsubscribe {
        let query = UserRepository::profile_query(uid);
        let uid = uid.to_string();
        self.spawn(
            SubscriptionKey::FollowerCount(uid.clone()),
            query,
            move |snapshot| {
                let count = snapshot
                    .and_then(|snapshot| {
                        snapshot
                            .docs
                            .first()
                            .map(|(id, doc)| UserProfile::from_document(id, doc).follower_count())
                    })
                    .unwrap_or(0);
                on_change(count);
            },
        )
    }

    /// Live count of events published by a host (drafts excluded).
    pub fn subscribe_hosted_events(
        &self,
        host_id: &str,
        on_change: impl Fn(u32) + Send + 'static,
    ) -> Unsubscribe {
        let query = Query::collection(persistence::paths::EVENTS).where_eq("hostId", host_id);
        self.spawn(
            SubscriptionKey::HostedEvents(host_id.to_string()),
            query,
            move |snapshot| {
                let count = snapshot
                    .map(|snapshot| {
                        snapshot
                            .docs
                            .iter()
                            .map(|(id, doc)| Event::from_document(id, doc))
                            .filter(|event| !event.is_draft)
                            .count() as u32
                    })
                    .unwrap_or(0);
                on_change(count);
            },
        )
    }

    /// Live feed of every event document, in date order.
    pub fn subscribe_event_feed(
        &self,
        on_change: impl Fn(Vec<Event>) + Send + 'static,
    ) -> Unsubscribe {
        let query = Query::collection(persistence::paths::EVENTS).order_by("date");
        self.spawn(SubscriptionKey::EventFeed, query, move |snapshot| {
            let events = snapshot
                .map(|snapshot| {
                    snapshot
                        .docs
                        .iter()
                        .map(|(id, doc)| Event::from_document(id, doc))
                        .collect()
                })
                .unwrap_or_default();
            on_change(events);
        })
    }

    /// Tears a key down regardless of who holds its unsubscribe handle.
    pub fn unsubscribe_key(&self, key: &SubscriptionKey) {
        let removed = self.inner.active.lock().unwrap().remove(key);
        if let Some(sub) = removed {
            sub.task.abort();
            debug!(key = %key, "subscription torn down");
        }
    }

    /// Tears down every remaining subscription.
    pub fn dispose(&self) {
        let drained: Vec<(SubscriptionKey, ActiveSubscription)> =
            self.inner.active.lock().unwrap().drain().collect();
        for (key, sub) in drained {
            sub.task.abort();
            debug!(key = %key, "subscription torn down");
        }
    }

    /// Number of nominally active subscriptions.
    pub fn active_count(&self) -> usize {
        self.inner.active.lock().unwrap().len()
    }

    /// Registers a listener for `key`, replacing (and tearing down) any
    /// previous one. The handler receives `Some(snapshot)` on data and
    /// `None` exactly once if the listener fails.
    fn spawn(
        &self,
        key: SubscriptionKey,
        query: Query,
        handler: impl Fn(Option<Snapshot>) + Send + 'static,
    ) -> Unsubscribe {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
        let store = Arc::clone(&self.inner.store);
        let task_key = key.clone();

        let task = tokio::spawn(async move {
            let mut stream = match store.watch(query).await {
                Ok(stream) => stream,
                Err(err) => {
                    // Setup failure: deliver the empty value once; the
                    // consumer keeps what is effectively a no-op handle.
                    warn!(key = %task_key, error = %err, "subscription setup failed");
                    handler(None);
                    return;
                }
            };

            let mut silenced = false;
            while let Some(item) = stream.next().await {
                match item {
                    Ok(snapshot) => {
                        if !silenced {
                            handler(Some(snapshot));
                        }
                    }
                    Err(err) => {
                        if err.is_permission_denied() {
                            debug!(key = %task_key, error = %err, "listener denied; going silent");
                        } else {
                            warn!(key = %task_key, error = %err, "listener failed; going silent");
                        }
                        handler(None);
                        silenced = true;
                    }
                }
            }
        });

        let previous = self
            .inner
            .active
            .lock()
            .unwrap()
            .insert(key.clone(), ActiveSubscription { generation, task });
        if let Some(previous) = previous {
            previous.task.abort();
            debug!(key = %key, "replaced active subscription");
        }

        Unsubscribe {
            inner: Arc::downgrade(&self.inner),
            key,
            generation,
            done: AtomicBool::new(false),
        }
    }
}
