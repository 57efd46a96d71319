//! Event domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{self, RawDocument};

/// Multi-week recurrence descriptor: the event repeats weekly for `weeks`
/// consecutive weeks starting at its date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    pub weeks: u32,
}

/// A pop-up event as the rest of the system consumes it.
///
/// `rating`, `review_count`, and `attendees_count` are cached derived values:
/// the first two are maintained by the rating recompute, the last is kept for
/// older documents only and is never written back (live counts come from
/// reservation queries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub price: f64,
    pub images: Vec<String>,
    pub date: Option<DateTime<Utc>>,
    /// 24h wall-clock start time, `HH:MM`.
    pub time: Option<String>,
    pub recurrence: Option<Recurrence>,
    pub city: String,
    pub address: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// The one owning host.
    pub host_id: String,
    /// Deprecated display cache, kept while older documents migrate.
    pub host_name: Option<String>,
    pub is_draft: bool,
    pub is_public: bool,
    pub allow_chat: bool,
    pub allow_rsvp: bool,
    pub rating: f64,
    pub review_count: u32,
    pub attendees_count: u32,
    pub is_popera_owned: bool,
    pub is_demo: bool,
    pub is_official_launch: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Event {
    /// Fields that must be present before an event write is attempted.
    pub const REQUIRED_FIELDS: &'static [&'static str] = &["title", "city", "hostId"];

    /// Maps a raw persisted document into a complete event.
    ///
    /// Never fails: absent fields take their documented defaults, and the
    /// `hostId` ← `host` rename is absorbed here.
    pub fn from_document(id: &str, doc: &RawDocument) -> Self {
        Self {
            id: id.to_string(),
            title: document::str_field(doc, &["title"], ""),
            description: document::str_field(doc, &["description"], ""),
            category: document::opt_str_field(doc, &["category"]),
            tags: document::str_vec_field(doc, "tags"),
            price: document::f64_field(doc, "price", 0.0),
            images: document::str_vec_field(doc, "images"),
            date: document::datetime_field(doc, &["date"]),
            time: document::opt_str_field(doc, &["time"]),
            recurrence: recurrence_from(doc),
            city: document::str_field(doc, &["city"], ""),
            address: document::opt_str_field(doc, &["address"]),
            lat: document::opt_f64_field(doc, "lat"),
            lng: document::opt_f64_field(doc, "lng"),
            host_id: document::str_field(doc, &["hostId", "host"], ""),
            host_name: document::opt_str_field(doc, &["hostName"]),
            is_draft: document::bool_field(doc, "isDraft", false),
            is_public: document::bool_field(doc, "isPublic", true),
            allow_chat: document::bool_field(doc, "allowChat", true),
            allow_rsvp: document::bool_field(doc, "allowRsvp", true),
            rating: document::f64_field(doc, "rating", 0.0),
            review_count: document::u32_field(doc, "reviewCount", 0),
            attendees_count: document::u32_field(doc, "attendeesCount", 0),
            is_popera_owned: document::bool_field(doc, "isPoperaOwned", false),
            is_demo: document::bool_field(doc, "isDemo", false),
            is_official_launch: document::bool_field(doc, "isOfficialLaunch", false),
            created_at: document::datetime_field(doc, &["createdAt"]),
        }
    }

    /// Whether the event shows up in public feeds.
    pub fn is_listed(&self) -> bool {
        self.is_public && !self.is_draft
    }

    pub fn is_free(&self) -> bool {
        self.price == 0.0
    }
}

fn recurrence_from(doc: &RawDocument) -> Option<Recurrence> {
    let weeks = document::u32_field(doc, "recurrenceWeeks", 0);
    (weeks >= 2).then_some(Recurrence { weeks })
}

/// Draft payload for creating an event.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub price: f64,
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_weeks: Option<u32>,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    pub host_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    pub is_draft: bool,
    pub is_public: bool,
    pub allow_chat: bool,
    pub allow_rsvp: bool,
    pub is_popera_owned: bool,
    pub is_demo: bool,
    pub is_official_launch: bool,
}

impl EventDraft {
    /// A draft with the visibility flags an ordinary listing starts with.
    pub fn new(
        title: impl Into<String>,
        city: impl Into<String>,
        host_id: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            city: city.into(),
            host_id: host_id.into(),
            is_public: true,
            allow_chat: true,
            allow_rsvp: true,
            ..Self::default()
        }
    }

    /// Serializes the draft into a wire document for the sanitizer.
    pub fn into_document(self) -> RawDocument {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => RawDocument::new(),
        }
    }
}
