//! Reservation domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::document::{self, RawDocument};

/// Reservation lifecycle status. Transitions move forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Reserved,
    CheckedIn,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Reserved => "reserved",
            ReservationStatus::CheckedIn => "checked_in",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    /// Whether this reservation counts toward attendance and RSVP membership.
    ///
    /// Cancelled and checked-in reservations never contribute to the active
    /// count; only `reserved` does.
    pub fn is_active(&self) -> bool {
        matches!(self, ReservationStatus::Reserved)
    }

    /// Valid forward transitions: `reserved → checked_in` and
    /// `reserved → cancelled`. Nothing moves backward.
    pub fn can_transition(&self, next: ReservationStatus) -> bool {
        matches!(
            (self, next),
            (ReservationStatus::Reserved, ReservationStatus::CheckedIn)
                | (ReservationStatus::Reserved, ReservationStatus::Cancelled)
        )
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reserved" => Ok(ReservationStatus::Reserved),
            "checked_in" => Ok(ReservationStatus::CheckedIn),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            _ => Err(format!("Invalid reservation status: {s}")),
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Optional payment metadata attached at reservation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub provider: String,
    pub reference: String,
}

/// Links one user to one event with a party size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub status: ReservationStatus,
    /// Party size. Attendance sums this field across reservation documents
    /// rather than counting documents.
    pub attendee_count: u32,
    pub payment: Option<PaymentInfo>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Reservation {
    pub const REQUIRED_FIELDS: &'static [&'static str] = &["userId", "eventId", "status"];

    /// Maps a raw persisted document into a reservation. Absent
    /// `attendeeCount` means a party of one; an unknown status reads as
    /// `reserved`.
    pub fn from_document(id: &str, doc: &RawDocument) -> Self {
        let status = document::str_field(doc, &["status"], "reserved")
            .parse()
            .unwrap_or(ReservationStatus::Reserved);
        Self {
            id: id.to_string(),
            user_id: document::str_field(doc, &["userId"], ""),
            event_id: document::str_field(doc, &["eventId"], ""),
            status,
            attendee_count: document::u32_field(doc, "attendeeCount", 1).max(1),
            payment: payment_from(doc),
            created_at: document::datetime_field(doc, &["createdAt"]),
        }
    }
}

fn payment_from(doc: &RawDocument) -> Option<PaymentInfo> {
    let payment = doc.get("payment")?.as_object()?;
    Some(PaymentInfo {
        provider: document::str_field(payment, &["provider"], ""),
        reference: document::str_field(payment, &["reference"], ""),
    })
}
