//! User profile domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::{self, RawDocument};

/// Placeholder shown when a profile has no photo of its own.
pub const DEFAULT_AVATAR: &str = "/images/avatar-placeholder.png";

/// A user account as the rest of the system consumes it.
///
/// Display name and photo resolve through fallback chains
/// (`displayName` ← legacy `name` ← computed default,
/// `photoURL` ← legacy `imageUrl` ← placeholder) so documents written before
/// the schema rename keep working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub display_name: String,
    #[serde(rename = "photoURL")]
    pub photo_url: String,
    pub following: Vec<String>,
    pub followers: Vec<String>,
    pub banned_events: Vec<String>,
    pub notify_event_reminders: bool,
    pub notify_chat_activity: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn from_document(uid: &str, doc: &RawDocument) -> Self {
        Self {
            uid: uid.to_string(),
            display_name: document::str_field(
                doc,
                &["displayName", "name"],
                &default_display_name(uid),
            ),
            photo_url: document::str_field(doc, &["photoURL", "imageUrl"], DEFAULT_AVATAR),
            following: document::str_vec_field(doc, "following"),
            followers: document::str_vec_field(doc, "followers"),
            banned_events: document::str_vec_field(doc, "bannedEvents"),
            notify_event_reminders: document::bool_field(doc, "notifyEventReminders", true),
            notify_chat_activity: document::bool_field(doc, "notifyChatActivity", true),
            created_at: document::datetime_field(doc, &["createdAt"]),
        }
    }

    pub fn follower_count(&self) -> u32 {
        self.followers.len() as u32
    }

    pub fn is_following(&self, uid: &str) -> bool {
        self.following.iter().any(|followed| followed == uid)
    }

    pub fn is_banned_from(&self, event_id: &str) -> bool {
        self.banned_events.iter().any(|banned| banned == event_id)
    }
}

/// Computed default for accounts that never set a display name.
fn default_display_name(uid: &str) -> String {
    let short: String = uid.chars().take(6).collect();
    format!("Guest {short}")
}
