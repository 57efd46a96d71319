//! Chat repository. Transcripts are append-only.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use domain::models::{chat, ChatMessage, MessageType};
use shared::sanitize::sanitize_with_limit;

use crate::paths;
use crate::store::{Document, DocumentStore, Query};

use super::{log_read_error, write_with_timeout, RepoError, RepoOptions};

/// Repository for per-event chat subcollections.
#[derive(Clone)]
pub struct ChatRepository {
    store: Arc<dyn DocumentStore>,
    options: RepoOptions,
}

impl ChatRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_options(store, RepoOptions::default())
    }

    pub fn with_options(store: Arc<dyn DocumentStore>, options: RepoOptions) -> Self {
        Self { store, options }
    }

    /// Query matching an event's transcript in delivery order. Also the
    /// shape watched by chat subscriptions.
    pub fn transcript_query(event_id: &str) -> Query {
        Query::collection(paths::messages(event_id)).order_by("createdAt")
    }

    /// Appends a message. `senderId` is canonical; the legacy `userId`
    /// alias is written alongside for access-rule compatibility.
    pub async fn append(
        &self,
        event_id: &str,
        sender_id: &str,
        body: &str,
        message_type: MessageType,
        is_host: bool,
    ) -> Result<ChatMessage, RepoError> {
        let mut doc = Document::new();
        doc.insert("senderId".to_string(), json!(sender_id));
        doc.insert("userId".to_string(), json!(sender_id));
        doc.insert("body".to_string(), json!(body));
        doc.insert("type".to_string(), json!(message_type.as_str()));
        doc.insert("isHost".to_string(), json!(is_host));
        doc.insert("createdAt".to_string(), json!(Utc::now()));

        let doc = sanitize_with_limit(
            doc,
            ChatMessage::REQUIRED_FIELDS,
            self.options.max_document_bytes,
        )?;
        let id = write_with_timeout(
            self.options.write_timeout,
            self.store.create(&paths::messages(event_id), doc.clone()),
        )
        .await?;
        Ok(ChatMessage::from_document(&id, &doc))
    }

    /// The full transcript, ordered by creation time with the document id as
    /// tiebreaker; empty on store failure.
    pub async fn transcript(&self, event_id: &str) -> Vec<ChatMessage> {
        match self.store.query(&Self::transcript_query(event_id)).await {
            Ok(docs) => {
                let mut messages: Vec<ChatMessage> = docs
                    .iter()
                    .map(|(id, doc)| ChatMessage::from_document(id, doc))
                    .collect();
                chat::sort_transcript(&mut messages);
                messages
            }
            Err(err) => {
                log_read_error("chat.transcript", &err);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn repo() -> (ChatRepository, MemoryStore) {
        let store = MemoryStore::new();
        (ChatRepository::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_append_writes_both_sender_aliases() {
        let (repo, store) = repo();
        let message = repo
            .append("ev-1", "u-1", "hello", MessageType::Message, false)
            .await
            .unwrap();
        assert_eq!(message.sender_id, "u-1");

        let (_, doc) = store
            .query(&Query::collection(paths::messages("ev-1")))
            .await
            .unwrap()
            .remove(0);
        assert_eq!(doc.get("senderId"), Some(&json!("u-1")));
        assert_eq!(doc.get("userId"), Some(&json!("u-1")));
    }

    #[tokio::test]
    async fn test_transcript_orders_ties_by_document_id() {
        let (repo, store) = repo();
        let created_at = json!("2026-05-01T12:00:00Z");
        for id in ["m-b", "m-a", "m-c"] {
            let mut doc = Document::new();
            doc.insert("senderId".to_string(), json!("u-1"));
            doc.insert("body".to_string(), json!(id));
            doc.insert("createdAt".to_string(), created_at.clone());
            store
                .set(&paths::messages("ev-1"), id, doc)
                .await
                .unwrap();
        }
        let transcript = repo.transcript("ev-1").await;
        let ids: Vec<&str> = transcript.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m-a", "m-b", "m-c"]);
    }

    #[tokio::test]
    async fn test_empty_body_is_rejected_before_write() {
        let (repo, store) = repo();
        assert!(repo
            .append("ev-1", "u-1", "", MessageType::Message, false)
            .await
            .is_err());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_transcript_degrades_to_empty_on_denial() {
        let (repo, store) = repo();
        repo.append("ev-1", "u-1", "hi", MessageType::Message, false)
            .await
            .unwrap();
        store.deny(paths::messages("ev-1"));
        assert!(repo.transcript("ev-1").await.is_empty());
    }
}
