//! Chat message domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::document::{self, RawDocument};

/// Kind of entry in an event's chat transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Message,
    Announcement,
    Poll,
    System,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Message => "message",
            MessageType::Announcement => "announcement",
            MessageType::Poll => "poll",
            MessageType::System => "system",
        }
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(MessageType::Message),
            "announcement" => Ok(MessageType::Announcement),
            "poll" => Ok(MessageType::Poll),
            "system" => Ok(MessageType::System),
            _ => Err(format!("Invalid message type: {s}")),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One append-only entry in an event's chat. No edit or delete is modeled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    /// Canonical author reference; writes keep the legacy `userId` alias in
    /// sync for access-rule compatibility.
    pub sender_id: String,
    pub body: String,
    pub message_type: MessageType,
    pub is_host: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub const REQUIRED_FIELDS: &'static [&'static str] = &["senderId", "body"];

    pub fn from_document(id: &str, doc: &RawDocument) -> Self {
        Self {
            id: id.to_string(),
            sender_id: document::str_field(doc, &["senderId", "userId"], ""),
            body: document::str_field(doc, &["body"], ""),
            message_type: document::str_field(doc, &["type"], "message")
                .parse()
                .unwrap_or(MessageType::Message),
            is_host: document::bool_field(doc, "isHost", false),
            created_at: document::datetime_field(doc, &["createdAt"])
                .unwrap_or(DateTime::UNIX_EPOCH),
        }
    }
}

/// Orders a transcript strictly by creation time ascending, ties broken by
/// document id (stable, not semantically meaningful).
pub fn sort_transcript(messages: &mut [ChatMessage]) {
    messages.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
