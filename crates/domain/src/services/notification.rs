//! Notification payloads and dispatch.
//!
//! Delivery transport (push, email) is an external collaborator behind the
//! [`Notifier`] port. Notifications are dispatched on a detached task after
//! state-changing operations: callers receive nothing to await, and delivery
//! failures only ever reach the log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Notification type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    EventPublished,
    FirstEventPublished,
    FollowerMilestone,
    ReservationReceived,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationType::EventPublished => write!(f, "event_published"),
            NotificationType::FirstEventPublished => write!(f, "first_event_published"),
            NotificationType::FollowerMilestone => write!(f, "follower_milestone"),
            NotificationType::ReservationReceived => write!(f, "reservation_received"),
        }
    }
}

/// Notification payload for a newly published event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPublishedPayload {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub event_id: String,
    pub host_id: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
}

/// Notification payload for a follower-count milestone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowerMilestonePayload {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub user_id: String,
    pub milestone: u32,
    pub timestamp: DateTime<Utc>,
}

/// Notification payload for a reservation landing on a hosted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationReceivedPayload {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub event_id: String,
    pub host_id: String,
    pub attendee_count: u32,
    pub timestamp: DateTime<Utc>,
}

/// Generic notification payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotificationPayload {
    EventPublished(EventPublishedPayload),
    FollowerMilestone(FollowerMilestonePayload),
    ReservationReceived(ReservationReceivedPayload),
}

/// Result of a notification send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationResult {
    Sent,
    Failed(String),
}

/// Port to the external delivery collaborator.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, payload: NotificationPayload) -> NotificationResult;
}

/// Follower counts that trigger a milestone notification.
pub const FOLLOWER_MILESTONES: &[u32] = &[10, 50, 100, 500, 1000];

/// Returns the milestone reached at `count`, if any.
pub fn follower_milestone(count: u32) -> Option<u32> {
    FOLLOWER_MILESTONES.contains(&count).then_some(count)
}

/// Fire-and-forget dispatch.
///
/// Spawns a detached task; the caller is handed nothing to await and a
/// failed delivery is logged, never propagated.
pub fn dispatch(notifier: Arc<dyn Notifier>, recipient: String, payload: NotificationPayload) {
    tokio::spawn(async move {
        match notifier.send(&recipient, payload).await {
            NotificationResult::Sent => {
                debug!(recipient = %recipient, "notification sent");
            }
            NotificationResult::Failed(reason) => {
                warn!(recipient = %recipient, %reason, "notification delivery failed");
            }
        }
    });
}

/// In-memory notifier recording every send, for tests.
#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<(String, NotificationPayload)>>,
    fail: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every send fails.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent(&self) -> Vec<(String, NotificationPayload)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, recipient: &str, payload: NotificationPayload) -> NotificationResult {
        if self.fail {
            return NotificationResult::Failed("mock notifier configured to fail".to_string());
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), payload));
        NotificationResult::Sent
    }
}
