//! Review domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::document::{self, RawDocument};
use shared::validation::clamp_rating;

/// Moderation status of a review. Documents written before moderation
/// existed carry no status field; absence reads as `accepted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Accepted,
    Pending,
    Contested,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Accepted => "accepted",
            ReviewStatus::Pending => "pending",
            ReviewStatus::Contested => "contested",
        }
    }
}

impl FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(ReviewStatus::Accepted),
            "pending" => Ok(ReviewStatus::Pending),
            "contested" => Ok(ReviewStatus::Contested),
            _ => Err(format!("Invalid review status: {s}")),
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A rating and comment left by an attendee for an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    /// Integer rating in [1, 5], clamped on both read and write.
    pub rating: u8,
    pub status: ReviewStatus,
    pub comment: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Review {
    pub const REQUIRED_FIELDS: &'static [&'static str] = &["userId", "rating"];

    pub fn from_document(id: &str, doc: &RawDocument) -> Self {
        let status = document::str_field(doc, &["status"], "accepted")
            .parse()
            .unwrap_or(ReviewStatus::Accepted);
        Self {
            id: id.to_string(),
            user_id: document::str_field(doc, &["userId"], ""),
            event_id: document::str_field(doc, &["eventId"], ""),
            rating: clamp_rating(document::i64_field(doc, "rating", 1)),
            status,
            comment: document::str_field(doc, &["comment"], ""),
            created_at: document::datetime_field(doc, &["createdAt"]),
        }
    }

    /// Only accepted reviews feed the cached rating.
    pub fn is_accepted(&self) -> bool {
        self.status == ReviewStatus::Accepted
    }
}
