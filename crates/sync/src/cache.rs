//! Local reactive cache of the event feed.
//!
//! The single source of truth for the current known set of events. Every
//! push from the subscription manager replaces the collection wholesale,
//! re-derives sort order, and republishes to UI subscribers through a watch
//! channel. Writes go to the store first and come back through the active
//! subscription; the cache only mutates locally as an offline fallback.

use tokio::sync::watch;

use domain::models::Event;
use domain::services::feed::{self, EventFilter};

pub struct EventCache {
    tx: watch::Sender<Vec<Event>>,
}

impl Default for EventCache {
    fn default() -> Self {
        Self::new()
    }
}

impl EventCache {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self { tx }
    }

    /// Wholesale replacement, re-sorted by date (dateless events last).
    pub fn replace_all(&self, mut events: Vec<Event>) {
        feed::sort_by_date(&mut events);
        self.tx.send_replace(events);
    }

    /// The current known set of events, in feed order.
    pub fn snapshot(&self) -> Vec<Event> {
        self.tx.borrow().clone()
    }

    pub fn get(&self, event_id: &str) -> Option<Event> {
        self.tx
            .borrow()
            .iter()
            .find(|event| event.id == event_id)
            .cloned()
    }

    /// A derived view over the cached feed.
    pub fn filtered(&self, filter: &EventFilter) -> Vec<Event> {
        feed::apply(&self.tx.borrow(), filter)
    }

    /// Subscribers observe every republication.
    pub fn watch(&self) -> watch::Receiver<Vec<Event>> {
        self.tx.subscribe()
    }

    /// Offline fallback only: merges a local write the store rejected.
    ///
    /// The result is second-class and not guaranteed to match eventual
    /// server state; the next snapshot from an active subscription
    /// overwrites it wholesale.
    pub fn apply_local(&self, event: Event) {
        let mut events = self.snapshot();
        match events.iter_mut().find(|cached| cached.id == event.id) {
            Some(cached) => *cached = event,
            None => events.push(event),
        }
        feed::sort_by_date(&mut events);
        self.tx.send_replace(events);
    }

    /// Offline fallback counterpart of a local delete.
    pub fn remove_local(&self, event_id: &str) {
        let mut events = self.snapshot();
        events.retain(|event| event.id != event_id);
        self.tx.send_replace(events);
    }
}
